//! Dominance-based redundant check elimination: for every reference a
//! `NewArr` or `Ref`-typed `Parameter` produces, collapse later `NullCheck`s
//! and matching `BoundsCheck`s that a dominating earlier check already
//! subsumes.

use crate::ir::{Graph, Inst, Opcode, PrimitiveType};
use crate::opt::PassStats;

/// Run once over every block in RPO order.
///
/// # Panics
///
/// Panics if RPO has not been computed or the dominator tree has not been
/// built.
pub(crate) fn run(graph: &mut Graph) -> PassStats {
    let mut stats = PassStats::default();
    let rpo = graph
        .cached_rpo()
        .expect("check_elimination::run: RPO has not been computed")
        .to_vec();
    for block in rpo {
        let mut cur = graph.block(block).first_insn();
        while let Some(inst) = cur {
            let next = graph.next_inst(inst);
            if is_reference_producer(graph, inst) {
                eliminate_redundant_checks(graph, inst, &mut stats);
            }
            cur = next;
        }
    }
    stats
}

fn is_reference_producer(graph: &Graph, inst: Inst) -> bool {
    match graph.inst(inst).opcode() {
        Opcode::NewArr => true,
        Opcode::Parameter => graph.inst(inst).ty() == PrimitiveType::Ref,
        _ => false,
    }
}

/// Walk `reference`'s users with the save-next cursor (the list is mutated
/// mid-traversal as redundant checks are removed), keeping the first
/// `NullCheck` and the first `BoundsCheck` per distinct `(idx, max)` operand
/// pair as the instance every later, dominated duplicate folds into.
fn eliminate_redundant_checks(graph: &mut Graph, reference: Inst, stats: &mut PassStats) {
    let mut null_keep: Option<Inst> = None;
    // (idx, max, check-to-remain).
    let mut bounds_keep: Vec<(Inst, Inst, Inst)> = Vec::new();

    let mut cur = graph.first_user(reference);
    while let Some(use_id) = cur {
        let next = graph.next_user(use_id);
        let user = graph.user_inst(use_id);

        match graph.inst(user).opcode() {
            Opcode::NullCheck => match null_keep {
                None => null_keep = Some(user),
                Some(keep) => fold_into(graph, keep, user, stats),
            },
            Opcode::BoundsCheck => {
                let inputs = graph.inst(user).inputs();
                let (idx, max) = (inputs[1], inputs[2]);
                match bounds_keep.iter().find(|&&(i, m, _)| i == idx && m == max) {
                    None => bounds_keep.push((idx, max, user)),
                    Some(&(_, _, keep)) => fold_into(graph, keep, user, stats),
                }
            }
            _ => {}
        }

        cur = next;
    }
}

/// If `keep` strictly dominates `user` (and isn't `user` itself), redirect
/// `user`'s users to `keep` and remove `user`.
fn fold_into(graph: &mut Graph, keep: Inst, user: Inst, stats: &mut PassStats) {
    if keep == user || !graph.inst_dominates(keep, user) {
        return;
    }
    graph.replace_inputs_for_users(user, keep);
    graph.remove_instruction(user);
    stats.rewrites += 1;
    stats.removed += 1;
}
