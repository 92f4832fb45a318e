//! The default analysis-then-optimize pipeline: wires the flow
//! analyses and local optimizations into the order a front end actually
//! wants to run them in, and reports what each stage did.

use crate::ir::Graph;
use crate::opt::{check_elimination, peephole, PassStats};

/// Which optional stages [`run_default_pipeline`] runs, and how hard the
/// peephole pass is allowed to iterate.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// Run the peephole constant-folding/strength-reduction pass.
    pub run_peephole: bool,
    /// Run dominance-based redundant check elimination.
    pub run_check_elimination: bool,
    /// Upper bound on peephole fixpoint iterations.
    pub max_peephole_iterations: usize,
}

impl Default for PipelineConfig {
    /// Both optimizations enabled; peephole runs a single pass. Callers opt
    /// into fixpoint iteration explicitly by raising
    /// `max_peephole_iterations`.
    fn default() -> Self {
        PipelineConfig {
            run_peephole: true,
            run_check_elimination: true,
            max_peephole_iterations: 1,
        }
    }
}

/// Per-stage rewrite/removal counts from one [`run_default_pipeline`] call.
/// The analysis stages (RPO, dominator tree, loop analysis) don't rewrite
/// the graph, so only the optimization stages are represented here.
#[derive(Clone, Copy, Default, Debug)]
pub struct PipelineReport {
    /// [`crate::opt::peephole`]'s counters, or the default if skipped.
    pub peephole: PassStats,
    /// [`crate::opt::check_elimination`]'s counters, or the default if
    /// skipped.
    pub check_elimination: PassStats,
}

/// Run RPO, build the dominator tree, run loop analysis, then (per
/// `config`) peephole to a fixpoint and check elimination, in that order.
///
/// Check elimination runs after peephole so that constant-folded/merged
/// checks (e.g. a redundant `Ashr` collapsing a null-checked reference's
/// other user count) are visible to it; peephole never needs the dominator
/// tree or loop analysis, but both run unconditionally since every
/// analysis is required before check elimination can run and front ends
/// generally want them cached regardless.
///
/// # Panics
///
/// Panics if `graph` has no start block.
pub fn run_default_pipeline(graph: &mut Graph, config: PipelineConfig) -> PipelineReport {
    log::info!("pipeline: start");

    graph.run_rpo();
    graph.build_dominator_tree();
    graph.run_loop_analysis();

    let mut report = PipelineReport::default();

    if config.run_peephole {
        log::debug!("pipeline: running peephole (max {} iterations)", config.max_peephole_iterations);
        report.peephole = peephole::run_to_fixpoint(graph, config.max_peephole_iterations);
        log::info!(
            "pipeline: peephole done ({} rewrites, {} removed)",
            report.peephole.rewrites,
            report.peephole.removed
        );
        // Peephole can introduce new instructions (e.g. the merged `Ashr`
        // constant) after blocks were already visited by RPO; it never adds
        // or removes edges between blocks, so the cached order is still
        // valid and doesn't need recomputing.
    }

    if config.run_check_elimination {
        log::debug!("pipeline: running check elimination");
        report.check_elimination = check_elimination::run(graph);
        log::info!(
            "pipeline: check elimination done ({} rewrites, {} removed)",
            report.check_elimination.rewrites,
            report.check_elimination.removed
        );
    }

    log::info!("pipeline: done");
    report
}
