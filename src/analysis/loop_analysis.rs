//! Four-phase natural-loop analyzer: root loop, back-edge collection,
//! reducible-loop population, and loop-tree assembly.

use rustc_hash::FxHashMap;

use crate::ir::{Block, Graph, Loop};
use crate::marker::Marker;

/// Run all four phases. Requires the dominator tree (back-edge collection
/// consults dominance to classify reducibility; population walks blocks in
/// RPO order).
///
/// # Panics
///
/// Panics if the graph has no start block.
pub(crate) fn analyze(graph: &mut Graph) {
    let root = graph.create_loop(None);
    graph.set_root_loop(root);

    let start = graph
        .start_block()
        .expect("loop_analysis::analyze: graph has no start block");

    let gray = graph.marker_manager_mut().create();
    let black = graph.marker_manager_mut().create();
    let mut header_loop: FxHashMap<Block, Loop> = FxHashMap::default();
    collect_latches(graph, start, gray, black, &mut header_loop);
    graph.marker_manager_mut().erase(gray);
    graph.marker_manager_mut().erase(black);

    let rpo: Vec<Block> = graph
        .cached_rpo()
        .expect("loop_analysis::analyze: RPO has not been computed")
        .to_vec();

    for &header in rpo.iter().rev() {
        if let Some(&l) = header_loop.get(&header) {
            populate_loop(graph, l, header);
        }
    }

    for &b in &rpo {
        if graph.block(b).owning_loop().is_none() {
            graph.set_block_owning_loop(b, root);
            graph.loop_push_member(root, b);
        }
    }
    let all_loops: Vec<Loop> = graph.loops().collect();
    for l in all_loops {
        if l != root && graph.loop_data(l).outer_loop().is_none() {
            graph.loop_set_outer(l, root);
            graph.loop_push_inner(root, l);
        }
    }
}

/// Back-edge collection: single DFS from the entry using gray (on-stack)/
/// black (finished) markers, creating a loop the first time a back edge
/// into a given header is seen and accumulating every latch that reaches it.
fn collect_latches(
    graph: &mut Graph,
    start: Block,
    gray: Marker,
    black: Marker,
    header_loop: &mut FxHashMap<Block, Loop>,
) {
    let mut stack: Vec<(Block, usize)> = vec![(start, 0)];
    graph.blocks_mut()[start].mark(gray);

    while let Some(&(block, idx)) = stack.last() {
        let successors = graph.block(block).successors().to_vec();
        if idx < successors.len() {
            stack.last_mut().unwrap().1 += 1;
            let succ = successors[idx];
            if graph.block(succ).is_marked(gray) {
                let l = match header_loop.get(&succ) {
                    Some(&l) => l,
                    None => {
                        let l = graph.create_loop(Some(succ));
                        graph.set_block_owning_loop(succ, l);
                        graph.loop_push_member(l, succ);
                        header_loop.insert(succ, l);
                        l
                    }
                };
                graph.loop_push_latch(l, block);
                let header_dominates_latch = graph.block_dominates(succ, block);
                let reducible = graph.loop_data(l).is_reducible() && header_dominates_latch;
                graph.loop_set_reducible(l, reducible);
            } else if !graph.block(succ).is_marked(black) {
                graph.blocks_mut()[succ].mark(gray);
                stack.push((succ, 0));
            }
        } else {
            graph.blocks_mut()[block].unmark(gray);
            graph.blocks_mut()[block].mark(black);
            stack.pop();
        }
    }
}

/// Membership population for a single loop. `header` is already a member and
/// owner of `l` (set when `l` was created): reducible loops additionally get
/// a backwards-reachability walk from their latches (stopping at the
/// header), irreducible loops just claim each latch not already owned by
/// `l` itself.
fn populate_loop(graph: &mut Graph, l: Loop, header: Block) {
    if !graph.loop_data(l).is_reducible() {
        let latches = graph.loop_data(l).latches().to_vec();
        for latch in latches {
            if graph.block(latch).owning_loop() != Some(l) {
                graph.set_block_owning_loop(latch, l);
                graph.loop_push_member(l, latch);
            }
        }
        return;
    }

    let marker = graph.marker_manager_mut().create();
    graph.blocks_mut()[header].mark(marker);

    let latches = graph.loop_data(l).latches().to_vec();
    let mut stack: Vec<Block> = Vec::new();
    for latch in latches {
        if !graph.block(latch).is_marked(marker) {
            graph.blocks_mut()[latch].mark(marker);
            classify(graph, l, latch);
            stack.push(latch);
        }
    }
    while let Some(block) = stack.pop() {
        for pred in graph.block(block).predecessors().to_vec() {
            if !graph.block(pred).is_marked(marker) {
                graph.blocks_mut()[pred].mark(marker);
                classify(graph, l, pred);
                stack.push(pred);
            }
        }
    }

    graph.marker_manager_mut().erase(marker);
}

fn classify(graph: &mut Graph, l: Loop, block: Block) {
    match graph.block(block).owning_loop() {
        None => {
            graph.set_block_owning_loop(block, l);
            graph.loop_push_member(l, block);
        }
        Some(existing) if existing != l && graph.loop_data(existing).outer_loop().is_none() => {
            graph.loop_set_outer(existing, l);
            graph.loop_push_inner(l, existing);
        }
        _ => {}
    }
}
