//! Local optimizations over a [`crate::ir::Graph`]: peephole
//! constant-folding and dominance-based redundant check elimination.

pub(crate) mod check_elimination;
pub(crate) mod peephole;

/// Per-pass instruction-rewrite/removal counters, folded into a
/// [`crate::pipeline::PipelineReport`].
#[derive(Clone, Copy, Default, Debug)]
pub struct PassStats {
    /// Instructions rewritten (folded, normalized, or replaced) in place.
    pub rewrites: usize,
    /// Instructions removed from their block.
    pub removed: usize,
}
