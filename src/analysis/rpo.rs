//! Reverse-postorder traversal.

use crate::ir::{Block, Graph};
use crate::marker::Marker;

/// Depth-first search from `start`, marking each block on entry with
/// `marker`, and returning blocks in reverse postorder.
///
/// Equivalent to the counting-down-from-block-count formulation in the
/// design: collecting the postorder sequence and reversing it lands every
/// block at the same index a decrementing counter would have.
pub(crate) fn compute(graph: &mut Graph, start: Block, marker: Marker) -> Vec<Block> {
    let mut postorder = Vec::new();
    let mut stack: Vec<(Block, usize)> = Vec::new();

    graph.blocks_mut()[start].mark(marker);
    stack.push((start, 0));

    while let Some(&(block, idx)) = stack.last() {
        let successors = graph.block(block).successors().to_vec();
        if idx < successors.len() {
            stack.last_mut().unwrap().1 += 1;
            let succ = successors[idx];
            if !graph.block(succ).is_marked(marker) {
                graph.blocks_mut()[succ].mark(marker);
                stack.push((succ, 0));
            }
        } else {
            postorder.push(block);
            stack.pop();
        }
    }

    postorder.reverse();
    postorder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrBuilder;
    use crate::ir::PrimitiveType;

    #[test]
    fn linear_chain_is_its_own_rpo() {
        let mut graph = Graph::new();
        let (a, b, c) = {
            let mut b0 = IrBuilder::new(&mut graph);
            let a = b0.create_block();
            let b = b0.create_block();
            let c = b0.create_block();
            b0.set_current_block(a);
            b0.create_jmp(b);
            b0.set_current_block(b);
            b0.create_jmp(c);
            b0.set_current_block(c);
            b0.create_ret_void();
            (a, b, c)
        };
        let order = graph.run_rpo();
        assert_eq!(order, &[a, b, c]);
    }

    #[test]
    fn diamond_visits_both_arms_before_merge() {
        let mut graph = Graph::new();
        let (a, merge) = {
            let mut bld = IrBuilder::new(&mut graph);
            let a = bld.create_block();
            let t = bld.create_block();
            let e = bld.create_block();
            let merge = bld.create_block();
            bld.set_current_block(a);
            let p = bld.create_parameter(PrimitiveType::I32, 0);
            let zero = bld.create_constant_i64(PrimitiveType::I32, 0);
            bld.create_beq(p, zero, t, e);
            bld.set_current_block(t);
            bld.create_jmp(merge);
            bld.set_current_block(e);
            bld.create_jmp(merge);
            bld.set_current_block(merge);
            bld.create_ret_void();
            (a, merge)
        };
        let order = graph.run_rpo();
        assert_eq!(order[0], a);
        assert_eq!(*order.last().unwrap(), merge);
        assert_eq!(order.len(), 4);
    }
}
