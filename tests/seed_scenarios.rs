//! The six end-to-end seed scenarios: small graphs built purely through the
//! public `IrBuilder`/`Graph` surface, each checked against its documented
//! expected output.

use cranelift_entity::EntityRef;
use graphir::ir::{Graph, IrBuilder, Opcode, PrimitiveType};
use graphir::{run_default_pipeline, PipelineConfig};

/// `A→B, B→C, B→F, C→D, F→E, F→G, G→D, E→D`. Expected RPO:
/// `[A, B, F, G, E, C, D]`.
#[test]
fn rpo_diamond_with_sink() {
    let mut graph = Graph::new();
    let (a, b, c, d, e, f, g) = {
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
        bld.create_beq(p, zero, c, f);

        bld.set_current_block(c);
        bld.create_jmp(d);

        bld.set_current_block(f);
        let q = bld.create_parameter(PrimitiveType::I32, 1);
        let zero2 = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(q, zero2, e, g);

        bld.set_current_block(g);
        bld.create_jmp(d);

        bld.set_current_block(e);
        bld.create_jmp(d);

        bld.set_current_block(d);
        bld.create_ret_void();

        (a, b, c, d, e, f, g)
    };

    let rpo = graph.run_rpo();
    assert_eq!(rpo, &[a, b, f, g, e, c, d]);
}

/// Same graph as above. Expected immediate dominators:
/// `A:none, B:A, C:B, D:B, E:F, F:B, G:F`.
#[test]
fn dominator_tree_diamond() {
    let mut graph = Graph::new();
    let (a, b, c, d, e, f, g) = {
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
        bld.create_beq(p, zero, c, f);

        bld.set_current_block(c);
        bld.create_jmp(d);

        bld.set_current_block(f);
        let q = bld.create_parameter(PrimitiveType::I32, 1);
        let zero2 = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(q, zero2, e, g);

        bld.set_current_block(g);
        bld.create_jmp(d);

        bld.set_current_block(e);
        bld.create_jmp(d);

        bld.set_current_block(d);
        bld.create_ret_void();

        (a, b, c, d, e, f, g)
    };

    graph.build_dominator_tree();

    assert_eq!(graph.block(a).idom(), None);
    assert_eq!(graph.block(b).idom(), Some(a));
    assert_eq!(graph.block(c).idom(), Some(b));
    assert_eq!(graph.block(d).idom(), Some(b));
    assert_eq!(graph.block(e).idom(), Some(f));
    assert_eq!(graph.block(f).idom(), Some(b));
    assert_eq!(graph.block(g).idom(), Some(f));
}

/// `A→B, B→C, B→D, D→E, E→A`. Expected: root loop contains `{C}`; one
/// inner loop headed at `A` with latch `E`, members `{A, B, D, E}`.
#[test]
fn single_reducible_loop() {
    let mut graph = Graph::new();
    let (a, b, c, d, e) = {
        let mut bld = IrBuilder::new(&mut graph);
        let a = bld.create_block();
        let b = bld.create_block();
        let c = bld.create_block();
        let d = bld.create_block();
        let e = bld.create_block();

        bld.set_current_block(a);
        bld.create_jmp(b);

        bld.set_current_block(b);
        let p = bld.create_parameter(PrimitiveType::I32, 0);
        let zero = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(p, zero, c, d);

        bld.set_current_block(c);
        bld.create_ret_void();

        bld.set_current_block(d);
        bld.create_jmp(e);

        bld.set_current_block(e);
        bld.create_jmp(a);

        (a, b, c, d, e)
    };

    graph.build_dominator_tree();
    graph.run_loop_analysis();

    let root = graph.root_loop().expect("root loop");
    assert_eq!(graph.loop_data(root).members(), &[c]);
    assert_eq!(graph.loop_data(root).inner_loops().len(), 1);

    let inner = graph.loop_data(root).inner_loops()[0];
    assert_eq!(graph.loop_data(inner).header(), Some(a));
    assert_eq!(graph.loop_data(inner).latches(), &[e]);
    assert!(graph.loop_data(inner).is_reducible());

    let mut members = graph.loop_data(inner).members().to_vec();
    members.sort_by_key(|blk| blk.index());
    let mut expected = vec![a, b, d, e];
    expected.sort_by_key(|blk| blk.index());
    assert_eq!(members, expected);
}

/// Constants `v0=2, v1=12`, `v2 = Add(v0,v1)`, `v3 = Mul(v2, v0)`,
/// `v4 = Sub(v3, v0)`. After the pass: `v3` has been replaced by a new
/// `Add(v2, v2)`; users of the old `v3` (here just `v4`) see the new add.
#[test]
fn peephole_mul_by_two() {
    let mut graph = Graph::new();
    let (v2, v4) = {
        let mut bld = IrBuilder::new(&mut graph);
        let entry = bld.create_block();
        bld.set_current_block(entry);
        let v0 = bld.create_constant_i64(PrimitiveType::I32, 2);
        let v1 = bld.create_constant_i64(PrimitiveType::I32, 12);
        let v2 = bld.create_add(PrimitiveType::I32, v0, v1);
        let v3 = bld.create_mul(PrimitiveType::I32, v2, v0);
        let v4 = bld.create_sub(PrimitiveType::I32, v3, v0);
        bld.create_ret(PrimitiveType::I32, v4);
        (v2, v4)
    };

    let report = run_default_pipeline(&mut graph, PipelineConfig::default());
    assert!(report.peephole.rewrites >= 1);

    let new_add = graph.inst(v4).inputs()[0];
    assert_eq!(graph.inst(new_add).opcode(), Opcode::Add);
    assert_eq!(graph.inst(new_add).inputs(), &[v2, v2]);
}

/// A diamond whose merge block holds
/// `v10 = Phi([v3@bbT], [v6@bbF])` where `v3 = Mul(v0, Const(2))` in `bbT`
/// and `v6 = Mul(v0, Const(3))` in `bbF`. After the pass: in `bbT`, `v3` is
/// replaced by `Add(v0, v0)`; `v10`'s input set is `{new-add, v6}` with
/// per-input blocks preserved.
#[test]
fn peephole_mul_by_two_into_phi_user() {
    let mut graph = Graph::new();
    let (bb_t, bb_f, v6, v10) = {
        let mut bld = IrBuilder::new(&mut graph);
        let entry = bld.create_block();
        let bb_t = bld.create_block();
        let bb_f = bld.create_block();
        let merge = bld.create_block();

        bld.set_current_block(entry);
        let v0 = bld.create_parameter(PrimitiveType::I32, 0);
        let cond = bld.create_parameter(PrimitiveType::I32, 1);
        let zero = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(cond, zero, bb_t, bb_f);

        bld.set_current_block(bb_t);
        let two = bld.create_constant_i64(PrimitiveType::I32, 2);
        let v3 = bld.create_mul(PrimitiveType::I32, v0, two);
        bld.create_jmp(merge);

        bld.set_current_block(bb_f);
        let three = bld.create_constant_i64(PrimitiveType::I32, 3);
        let v6 = bld.create_mul(PrimitiveType::I32, v0, three);
        bld.create_jmp(merge);

        bld.set_current_block(merge);
        let v10 = bld.create_phi(PrimitiveType::I32);
        bld.graph_mut().append_phi_input(v10, v3, bb_t);
        bld.graph_mut().append_phi_input(v10, v6, bb_f);
        bld.create_ret(PrimitiveType::I32, v10);

        (bb_t, bb_f, v6, v10)
    };

    let report = run_default_pipeline(&mut graph, PipelineConfig::default());
    assert!(report.peephole.rewrites >= 1);

    let phi_inputs: Vec<_> = graph.inst(v10).phi_inputs().collect();
    assert_eq!(phi_inputs.len(), 2);

    let from_t = phi_inputs.iter().find(|p| p.pred == bb_t).expect("bbT edge");
    assert_eq!(graph.inst(from_t.value).opcode(), Opcode::Add);
    assert_eq!(graph.inst(from_t.value).inputs().len(), 2);
    assert_eq!(graph.inst(from_t.value).inputs()[0], graph.inst(from_t.value).inputs()[1]);

    let from_f = phi_inputs.iter().find(|p| p.pred == bb_f).expect("bbF edge");
    assert_eq!(from_f.value, v6);
}

/// `v0:Ref` parameter, constant `v1=12`, `v2 = NullCheck(v0)`,
/// `v3 = LoadArray(v2, v1)`, `v4 = NullCheck(v0)`,
/// `v5 = StoreArray(v4, v1, v3)`. After the pass: `v4` is removed, `v5`'s
/// first input is `v2`, `v4.users` is empty.
#[test]
fn check_elimination_dominated_null_check() {
    let mut graph = Graph::new();
    let (v2, v4, v5) = {
        let mut bld = IrBuilder::new(&mut graph);
        let entry = bld.create_block();
        bld.set_current_block(entry);
        let v0 = bld.create_parameter(PrimitiveType::Ref, 0);
        let v1 = bld.create_constant_i64(PrimitiveType::I32, 12);
        let v2 = bld.create_null_check(PrimitiveType::Ref, v0);
        let v3 = bld.create_load_array(PrimitiveType::I32, v2, v1);
        let v4 = bld.create_null_check(PrimitiveType::Ref, v0);
        let v5 = bld.create_store_array(v4, v1, v3);
        bld.create_ret_void();
        (v2, v4, v5)
    };

    let report = run_default_pipeline(&mut graph, PipelineConfig::default());
    assert_eq!(report.check_elimination.removed, 1);

    assert!(graph.inst(v4).parent_block().is_none());
    assert_eq!(graph.inst(v5).inputs()[0], v2);
    assert_eq!(graph.users(v4).count(), 0);
}

/// `A→B, B→C, B→E, C→D, D→G, E→F, E→D, F→H, F→B, G→C, G→I, H→G, H→I`. `B`
/// heads a reducible loop with latch `F` (every path to `F` passes through
/// `B`'s successor `E`). `C` heads an irreducible loop with latch `G`: `G`
/// is also reachable via `B→E→F→H→G`, a path that never passes through `C`,
/// so `C` does not dominate its own latch. Expected: `cLoop` is irreducible
/// with members `{C, G}` (the header included, not swept into the root
/// loop); `bLoop` is reducible with members `{B, E, F}`; the root loop's
/// members are `{A, D, H, I}`.
#[test]
fn irreducible_loop_header_is_a_member_of_its_own_loop() {
    let mut graph = Graph::new();
    let (a, b, c, d, e, f, g, h, i) = {
        let mut bld = IrBuilder::new(&mut graph);
        let a = bld.create_block();
        let b = bld.create_block();
        let c = bld.create_block();
        let d = bld.create_block();
        let e = bld.create_block();
        let f = bld.create_block();
        let g = bld.create_block();
        let h = bld.create_block();
        let i = bld.create_block();

        bld.set_current_block(a);
        bld.create_jmp(b);

        bld.set_current_block(b);
        let p = bld.create_parameter(PrimitiveType::I32, 0);
        let zero = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(p, zero, c, e);

        bld.set_current_block(c);
        bld.create_jmp(d);

        bld.set_current_block(d);
        bld.create_jmp(g);

        bld.set_current_block(e);
        let q = bld.create_parameter(PrimitiveType::I32, 1);
        let zero2 = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(q, zero2, f, d);

        bld.set_current_block(f);
        let r = bld.create_parameter(PrimitiveType::I32, 2);
        let zero3 = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(r, zero3, h, b);

        bld.set_current_block(g);
        let s = bld.create_parameter(PrimitiveType::I32, 3);
        let zero4 = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(s, zero4, c, i);

        bld.set_current_block(h);
        let t = bld.create_parameter(PrimitiveType::I32, 4);
        let zero5 = bld.create_constant_i64(PrimitiveType::I32, 0);
        bld.create_beq(t, zero5, g, i);

        bld.set_current_block(i);
        bld.create_ret_void();

        (a, b, c, d, e, f, g, h, i)
    };

    graph.build_dominator_tree();
    graph.run_loop_analysis();

    let b_loop = graph.block(b).owning_loop().expect("b heads a loop");
    let c_loop = graph.block(c).owning_loop().expect("c heads a loop");
    assert_ne!(b_loop, c_loop);

    assert!(graph.loop_data(b_loop).is_reducible());
    assert!(!graph.loop_data(c_loop).is_reducible());

    assert_eq!(graph.loop_data(c_loop).latches(), &[g]);
    let mut c_members = graph.loop_data(c_loop).members().to_vec();
    c_members.sort_by_key(|blk| blk.index());
    let mut expected_c = vec![c, g];
    expected_c.sort_by_key(|blk| blk.index());
    assert_eq!(c_members, expected_c, "irreducible loop header must be a member of its own loop");

    assert_eq!(graph.loop_data(b_loop).latches(), &[f]);
    let mut b_members = graph.loop_data(b_loop).members().to_vec();
    b_members.sort_by_key(|blk| blk.index());
    let mut expected_b = vec![b, e, f];
    expected_b.sort_by_key(|blk| blk.index());
    assert_eq!(b_members, expected_b);

    let root = graph.root_loop().expect("root loop");
    let mut root_members = graph.loop_data(root).members().to_vec();
    root_members.sort_by_key(|blk| blk.index());
    let mut expected_root = vec![a, d, h, i];
    expected_root.sort_by_key(|blk| blk.index());
    assert_eq!(root_members, expected_root);

    assert_eq!(graph.loop_data(b_loop).outer_loop(), Some(root));
    assert_eq!(graph.loop_data(c_loop).outer_loop(), Some(root));
}
