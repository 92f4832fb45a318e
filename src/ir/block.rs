//! Basic blocks: an intrusive instruction list plus CFG edges and per-block
//! analysis state.

use smallvec::SmallVec;

use super::{Block, Inst, Loop};
use crate::marker::{Marker, MarkerSlots};

/// An ordered sequence of instructions with at most one unconditional or
/// conditional terminator at its tail, plus the CFG edges and analysis state
/// attached to it.
///
/// A block never outlives its [`super::Graph`]; all references here are
/// entity handles, not pointers.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    /// Blocks that branch or jump to this one.
    predecessors: SmallVec<[Block; 4]>,
    /// Blocks this one branches or jumps to. At most two per the CFG model
    /// (`Jmp` has one, `Beq`/`Bne`/`Bgt` have two, `Ret` has none).
    successors: SmallVec<[Block; 2]>,

    first_insn: Option<Inst>,
    last_insn: Option<Inst>,

    marker_slots: MarkerSlots,

    idom: Option<Block>,
    /// Blocks strictly dominated by this one, populated by the dominator-tree
    /// builder. `None` before the dominator tree has been built.
    dominated_blocks: Option<Vec<Block>>,

    owning_loop: Option<Loop>,
}

impl Default for BasicBlock {
    fn default() -> Self {
        BasicBlock {
            predecessors: SmallVec::new(),
            successors: SmallVec::new(),
            first_insn: None,
            last_insn: None,
            marker_slots: [0; crate::marker::NUM_COLORS],
            idom: None,
            dominated_blocks: None,
            owning_loop: None,
        }
    }
}

impl BasicBlock {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// The first instruction in this block's list, or `None` if empty.
    pub fn first_insn(&self) -> Option<Inst> {
        self.first_insn
    }

    /// The last instruction in this block's list, or `None` if empty.
    pub fn last_insn(&self) -> Option<Inst> {
        self.last_insn
    }

    pub(super) fn set_first_insn(&mut self, inst: Option<Inst>) {
        self.first_insn = inst;
    }

    pub(super) fn set_last_insn(&mut self, inst: Option<Inst>) {
        self.last_insn = inst;
    }

    /// True if this block has no instructions.
    pub fn is_empty(&self) -> bool {
        self.first_insn.is_none()
    }

    /// Blocks that branch or jump to this one.
    pub fn predecessors(&self) -> &[Block] {
        &self.predecessors
    }

    /// Blocks this one branches or jumps to, in successor order (the order
    /// peephole/check-elimination passes and RPO rely on: first successor
    /// first).
    pub fn successors(&self) -> &[Block] {
        &self.successors
    }

    pub(super) fn push_predecessor(&mut self, pred: Block) {
        self.predecessors.push(pred);
    }

    pub(super) fn push_successor(&mut self, succ: Block) {
        assert!(
            self.successors.len() < 2,
            "a basic block may have at most two successors"
        );
        self.successors.push(succ);
    }

    /// The immediate dominator of this block, or `None` for the entry block
    /// or an unreachable block (before/without a dominator tree).
    pub fn idom(&self) -> Option<Block> {
        self.idom
    }

    pub(super) fn set_idom(&mut self, idom: Option<Block>) {
        self.idom = idom;
    }

    /// Blocks strictly dominated by this one.
    ///
    /// # Panics
    ///
    /// Panics if the dominator tree has not been built yet.
    pub fn dominated_blocks(&self) -> &[Block] {
        self.dominated_blocks
            .as_deref()
            .expect("dominated_blocks: dominator tree has not been built")
    }

    pub(super) fn set_dominated_blocks(&mut self, blocks: Vec<Block>) {
        self.dominated_blocks = Some(blocks);
    }

    pub(super) fn clear_dominated_blocks(&mut self) {
        self.dominated_blocks = None;
    }

    /// True if `other` is this block or is strictly dominated by it.
    ///
    /// # Panics
    ///
    /// Panics if the dominator tree has not been built yet.
    pub fn dominates_over(&self, this: Block, other: Block) -> bool {
        this == other || self.dominated_blocks().contains(&other)
    }

    /// The loop this block belongs to, populated by the loop analyzer.
    pub fn owning_loop(&self) -> Option<Loop> {
        self.owning_loop
    }

    pub(super) fn set_owning_loop(&mut self, l: Loop) {
        self.owning_loop = Some(l);
    }

    /// Test whether `marker` currently marks this block.
    pub fn is_marked(&self, marker: Marker) -> bool {
        self.marker_slots[marker.color()] == marker.generation()
    }

    /// Mark this block with `marker`.
    pub fn mark(&mut self, marker: Marker) {
        self.marker_slots[marker.color()] = marker.generation();
    }

    /// Unmark this block's slot for `marker`'s color, independent of which
    /// generation was stored there.
    pub fn unmark(&mut self, marker: Marker) {
        self.marker_slots[marker.color()] = 0;
    }

    /// Reset every marker slot to unmarked.
    pub fn clear_all_markers(&mut self) {
        self.marker_slots = [0; crate::marker::NUM_COLORS];
    }
}
