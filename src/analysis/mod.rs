//! Flow analyses over a [`crate::ir::Graph`]: reverse postorder, the
//! dominator tree, and natural-loop classification.
//!
//! Each analysis is invoked through the matching [`crate::ir::Graph`] method
//! ([`crate::ir::Graph::run_rpo`], [`crate::ir::Graph::build_dominator_tree`],
//! [`crate::ir::Graph::run_loop_analysis`]); the modules here hold the
//! algorithms themselves.

pub(crate) mod dominator_tree;
pub(crate) mod loop_analysis;
pub(crate) mod rpo;
