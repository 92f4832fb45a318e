//! A Sea-of-Nodes-style SSA intermediate representation, with reverse-postorder,
//! dominator-tree and loop analyses, plus a peephole/constant-folding pass and a
//! dominance-based redundant check-elimination pass.
//!
//! This crate is the middle-end core of an optimizing compiler: it owns the IR
//! data model ([`ir`]), the flow analyses that compute facts over it
//! ([`analysis`]), and the local optimizations that rewrite it in place
//! ([`opt`]). Front ends build functions through [`ir::IrBuilder`]; nothing in
//! this crate parses or emits a textual IR format.
//!
//! Every entry point documents the preconditions it assumes. A malformed graph
//! — one that violates an invariant documented on [`ir::Instruction`],
//! [`ir::BasicBlock`], or [`ir::Graph`] — causes a panic rather than a
//! recoverable error: there is no way to "handle" an inconsistent IR short of
//! fixing the front end or the pass that produced it.

#![deny(missing_docs)]
#![warn(unused_import_braces)]

pub mod analysis;
pub mod ir;
pub mod marker;
pub mod opt;
pub mod pipeline;

pub use ir::{BasicBlock, Graph, Inst, IrBuilder};
pub use pipeline::{run_default_pipeline, PipelineConfig, PipelineReport};
