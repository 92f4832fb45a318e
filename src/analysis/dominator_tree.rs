//! Dominator-tree builder: a reachability formulation rather than the
//! classical iterative or Lengauer-Tarjan algorithm.

use rustc_hash::FxHashMap;

use crate::ir::{Block, Graph};
use crate::marker::Marker;

/// Mark every block reachable from `start`, treating already-marked blocks
/// (in particular the one block `build` hid before calling this) as walls.
fn mark_reachable(graph: &mut Graph, start: Block, marker: Marker) {
    if graph.block(start).is_marked(marker) {
        return;
    }
    graph.blocks_mut()[start].mark(marker);
    let mut stack = vec![start];
    while let Some(block) = stack.pop() {
        for succ in graph.block(block).successors().to_vec() {
            if !graph.block(succ).is_marked(marker) {
                graph.blocks_mut()[succ].mark(marker);
                stack.push(succ);
            }
        }
    }
}

/// Build (or rebuild) the dominator tree for every block in the cached RPO.
///
/// # Panics
///
/// Panics if [`Graph::run_rpo`] has not been called.
pub(crate) fn build(graph: &mut Graph) {
    let rpo: Vec<Block> = graph
        .cached_rpo()
        .expect("dominator_tree::build: RPO has not been computed")
        .to_vec();
    let entry = rpo[0];

    for &b in &rpo {
        graph.clear_block_dominated(b);
    }

    // dominators_of[X]: non-entry blocks that dominate X.
    let mut dominators_of: FxHashMap<Block, Vec<Block>> =
        rpo.iter().map(|&b| (b, Vec::new())).collect();

    for &b in rpo.iter().skip(1) {
        let marker = graph.marker_manager_mut().create();
        graph.blocks_mut()[b].mark(marker);
        mark_reachable(graph, entry, marker);
        for &y in &rpo {
            if y != b && !graph.block(y).is_marked(marker) {
                dominators_of.get_mut(&y).unwrap().push(b);
            }
        }
        graph.marker_manager_mut().erase(marker);
    }

    // Invert into each block's dominated set; the entry dominates everything
    // reachable, by definition, and isn't itself recorded as anyone's
    // "non-entry dominator" above.
    let mut dominated: FxHashMap<Block, Vec<Block>> =
        rpo.iter().map(|&b| (b, Vec::new())).collect();
    for &y in &rpo {
        for &b in &dominators_of[&y] {
            dominated.get_mut(&b).unwrap().push(y);
        }
    }
    dominated.insert(entry, rpo.iter().copied().filter(|&b| b != entry).collect());

    for &b in &rpo {
        graph.set_block_dominated(b, dominated.remove(&b).unwrap());
    }

    for &x in &rpo {
        if x == entry {
            graph.set_block_idom(x, None);
            continue;
        }
        let doms = &dominators_of[&x];
        let idom = if doms.is_empty() {
            entry
        } else {
            *doms
                .iter()
                .find(|&&d| {
                    doms.iter()
                        .all(|&e| e == d || graph.block_dominates(e, d))
                })
                .expect("dominator_tree::build: no unique immediate dominator")
        };
        graph.set_block_idom(x, Some(idom));
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::{IrBuilder, PrimitiveType};
    use crate::ir::Graph;

    /// Diamond: A -> {B, C} -> D. Expected idoms: B:A, C:A, D:A.
    #[test]
    fn diamond_idoms() {
        let mut graph = Graph::new();
        let (a, b, c, d) = {
            let mut bld = IrBuilder::new(&mut graph);
            let a = bld.create_block();
            let b = bld.create_block();
            let c = bld.create_block();
            let d = bld.create_block();
            bld.set_current_block(a);
            let p = bld.create_parameter(PrimitiveType::I32, 0);
            let zero = bld.create_constant_i64(PrimitiveType::I32, 0);
            bld.create_beq(p, zero, b, c);
            bld.set_current_block(b);
            bld.create_jmp(d);
            bld.set_current_block(c);
            bld.create_jmp(d);
            bld.set_current_block(d);
            bld.create_ret_void();
            (a, b, c, d)
        };
        graph.build_dominator_tree();
        assert_eq!(graph.block(a).idom(), None);
        assert_eq!(graph.block(b).idom(), Some(a));
        assert_eq!(graph.block(c).idom(), Some(a));
        assert_eq!(graph.block(d).idom(), Some(a));
    }

    /// A -> B -> {C, D}; C -> F; D -> F; F -> {G, E}; G -> F (back edge).
    /// Every path to E passes through F, so E's idom is F rather than the
    /// nearer common ancestor B — exercises the case where "closest
    /// dominator" isn't just the immediate branch point.
    #[test]
    fn merge_through_loop_header_dominators() {
        let mut graph = Graph::new();
        let blocks: Vec<_> = {
            let mut bld = IrBuilder::new(&mut graph);
            let a = bld.create_block();
            let b = bld.create_block();
            let c = bld.create_block();
            let d = bld.create_block();
            let e = bld.create_block();
            let f = bld.create_block();
            let g = bld.create_block();

            bld.set_current_block(a);
            bld.create_jmp(b);

            bld.set_current_block(b);
            let p = bld.create_parameter(PrimitiveType::I32, 0);
            let zero = bld.create_constant_i64(PrimitiveType::I32, 0);
            bld.create_beq(p, zero, c, d);

            bld.set_current_block(c);
            bld.create_jmp(f);

            bld.set_current_block(d);
            bld.create_jmp(f);

            bld.set_current_block(f);
            let q = bld.create_parameter(PrimitiveType::I32, 1);
            let one = bld.create_constant_i64(PrimitiveType::I32, 1);
            bld.create_beq(q, one, g, e);

            bld.set_current_block(g);
            bld.create_jmp(f);

            bld.set_current_block(e);
            bld.create_ret_void();

            vec![a, b, c, d, e, f, g]
        };
        graph.build_dominator_tree();
        let (a, b, c, d, e, f, g) = (
            blocks[0], blocks[1], blocks[2], blocks[3], blocks[4], blocks[5], blocks[6],
        );
        assert_eq!(graph.block(a).idom(), None);
        assert_eq!(graph.block(b).idom(), Some(a));
        assert_eq!(graph.block(c).idom(), Some(b));
        assert_eq!(graph.block(d).idom(), Some(b));
        assert_eq!(graph.block(e).idom(), Some(b));
        assert_eq!(graph.block(f).idom(), Some(b));
        assert_eq!(graph.block(g).idom(), Some(f));
    }
}
