//! Natural-loop records produced by the loop analyzer and owned by
//! the [`super::Graph`].

use cranelift_entity::entity_impl;

use super::Block;

/// An opaque reference to a [`LoopData`] owned by a [`super::Graph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Loop(u32);
entity_impl!(Loop, "loop");

/// One node of the loop tree: either a natural loop or the graph's single
/// root loop (the catch-all for blocks not nested in any real loop).
#[derive(Clone, Debug)]
pub struct LoopData {
    header: Option<Block>,
    latches: Vec<Block>,
    members: Vec<Block>,
    inner_loops: Vec<Loop>,
    outer_loop: Option<Loop>,
    is_reducible: bool,
    is_root: bool,
}

impl LoopData {
    pub(super) fn new_root() -> Self {
        LoopData {
            header: None,
            latches: Vec::new(),
            members: Vec::new(),
            inner_loops: Vec::new(),
            outer_loop: None,
            // The root loop is never subject to the reducibility check; it
            // has no header or back edges of its own.
            is_reducible: true,
            is_root: true,
        }
    }

    pub(super) fn new_natural(header: Block) -> Self {
        LoopData {
            header: Some(header),
            latches: Vec::new(),
            members: Vec::new(),
            inner_loops: Vec::new(),
            outer_loop: None,
            is_reducible: true,
            is_root: false,
        }
    }

    /// The loop's header block, or `None` iff this is the root loop.
    pub fn header(&self) -> Option<Block> {
        self.header
    }

    /// Source blocks of the back edges into this loop's header.
    pub fn latches(&self) -> &[Block] {
        &self.latches
    }

    pub(super) fn push_latch(&mut self, latch: Block) {
        self.latches.push(latch);
    }

    /// Blocks that belong to this loop (not counting blocks of nested inner
    /// loops).
    pub fn members(&self) -> &[Block] {
        &self.members
    }

    pub(super) fn push_member(&mut self, block: Block) {
        self.members.push(block);
    }

    /// Loops nested directly inside this one.
    pub fn inner_loops(&self) -> &[Loop] {
        &self.inner_loops
    }

    pub(super) fn push_inner_loop(&mut self, inner: Loop) {
        self.inner_loops.push(inner);
    }

    /// The loop this one is nested directly inside, or `None` before the
    /// loop-tree assembly phase has run (or for the root loop, always).
    pub fn outer_loop(&self) -> Option<Loop> {
        self.outer_loop
    }

    pub(super) fn set_outer_loop(&mut self, outer: Loop) {
        self.outer_loop = Some(outer);
    }

    /// True iff this loop's header dominates every one of its latches.
    /// Always `true` for the root loop.
    pub fn is_reducible(&self) -> bool {
        self.is_reducible
    }

    pub(super) fn set_reducible(&mut self, reducible: bool) {
        self.is_reducible = reducible;
    }

    /// True iff this is the graph's single root/catch-all loop.
    pub fn is_root(&self) -> bool {
        self.is_root
    }
}
