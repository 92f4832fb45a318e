//! The IR data model: opcodes, typed instructions, basic blocks, and the
//! graph that owns them.

mod block;
mod builder;
mod dump;
mod graph;
mod instruction;
mod loop_data;
mod opcode;
mod types;

pub use block::BasicBlock;
pub use builder::IrBuilder;
pub use graph::Graph;
pub use instruction::{ConstantValue, Instruction, InstructionData, PhiInput};
pub use loop_data::{Loop, LoopData};
pub use opcode::Opcode;
pub use types::PrimitiveType;

use cranelift_entity::entity_impl;

/// An opaque reference to a [`BasicBlock`] owned by a [`Graph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Block(u32);
entity_impl!(Block, "bb");

/// An opaque reference to an [`Instruction`] owned by a [`Graph`].
///
/// In this IR an instruction doubles as the SSA value it produces: there is
/// no separate `Value` entity. An instruction that appears as another
/// instruction's input is a use of the def instruction's result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Inst(u32);
entity_impl!(Inst, "v");

/// An opaque reference into a [`Graph`]'s use-list arena.
///
/// Each input edge owns exactly one `UseId`, which is also the handle that
/// lets the input side remove itself from the def's user list in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct UseId(u32);
entity_impl!(UseId, "use");
