//! Constant-folding and strength-reduction peephole pass.
//!
//! Dispatch is a single `match` over every [`Opcode`] variant — one arm per
//! opcode, almost all of them no-ops — rather than a dynamic lookup table, so
//! the compiler checks at build time that every opcode is accounted for.

use crate::ir::{ConstantValue, Graph, Inst, InstructionData, Opcode, PrimitiveType};
use crate::opt::PassStats;

/// Run the pass once over every instruction in RPO order, then keep
/// re-running until an iteration rewrites nothing or `max_iterations` is
/// reached.
///
/// # Panics
///
/// Panics if RPO has not been computed.
pub(crate) fn run_to_fixpoint(graph: &mut Graph, max_iterations: usize) -> PassStats {
    let mut total = PassStats::default();
    for iteration in 0..max_iterations {
        let stats = run_once(graph);
        log::trace!("peephole iteration {iteration}: {} rewrites", stats.rewrites);
        total.rewrites += stats.rewrites;
        total.removed += stats.removed;
        if stats.rewrites == 0 {
            break;
        }
    }
    total
}

fn run_once(graph: &mut Graph) -> PassStats {
    let mut stats = PassStats::default();
    let rpo = graph
        .cached_rpo()
        .expect("peephole::run_once: RPO has not been computed")
        .to_vec();
    for block in rpo {
        let mut cur = graph.block(block).first_insn();
        while let Some(inst) = cur {
            let next = graph.next_inst(inst);
            dispatch(graph, inst, &mut stats);
            cur = next;
        }
    }
    stats
}

fn dispatch(graph: &mut Graph, inst: Inst, stats: &mut PassStats) -> bool {
    match graph.inst(inst).opcode() {
        Opcode::Mul => handle_mul(graph, inst, stats),
        Opcode::Ashr => handle_ashr(graph, inst, stats),
        Opcode::Or => handle_or(graph, inst, stats),
        Opcode::Undefined
        | Opcode::Add
        | Opcode::Sub
        | Opcode::Div
        | Opcode::Rem
        | Opcode::And
        | Opcode::Xor
        | Opcode::Shr
        | Opcode::Shl
        | Opcode::LoadArray
        | Opcode::StoreArray
        | Opcode::NewArr
        | Opcode::Jmp
        | Opcode::Beq
        | Opcode::Bne
        | Opcode::Bgt
        | Opcode::Ret
        | Opcode::Constant
        | Opcode::Parameter
        | Opcode::Phi
        | Opcode::CallStatic
        | Opcode::NullCheck
        | Opcode::BoundsCheck => false,
    }
}

fn is_constant(graph: &Graph, inst: Inst) -> bool {
    graph.inst(inst).opcode() == Opcode::Constant
}

fn input_pair(graph: &Graph, inst: Inst) -> (Inst, Inst) {
    let inputs = graph.inst(inst).inputs();
    (inputs[0], inputs[1])
}

fn fold_constant(graph: &mut Graph, inst: Inst, ty: PrimitiveType, value: ConstantValue) {
    let new = graph.create_instruction(Opcode::Constant, ty, InstructionData::Constant(value));
    graph.replace_instruction(inst, new);
}

fn fold_mul(graph: &Graph, ty: PrimitiveType, a: Inst, b: Inst) -> ConstantValue {
    if ty.is_float() {
        if ty == PrimitiveType::F32 {
            ConstantValue::from_f32(graph.inst(a).get_as_f32() * graph.inst(b).get_as_f32())
        } else {
            ConstantValue::from_f64(graph.inst(a).get_as_f64() * graph.inst(b).get_as_f64())
        }
    } else {
        let av = graph.inst(a).get_as_i64();
        let bv = graph.inst(b).get_as_i64();
        ConstantValue::from_i64(av.wrapping_mul(bv))
    }
}

/// Mul(a, b): fold both-constant; normalize a single constant into `b`;
/// `b == 1` replaces uses with `a`; `b == 2` replaces with `Add(a, a)`.
fn handle_mul(graph: &mut Graph, inst: Inst, stats: &mut PassStats) -> bool {
    let ty = graph.inst(inst).ty();
    let (mut a, mut b) = input_pair(graph, inst);

    if is_constant(graph, a) && is_constant(graph, b) {
        let folded = fold_mul(graph, ty, a, b);
        fold_constant(graph, inst, ty, folded);
        stats.rewrites += 1;
        return true;
    }

    if is_constant(graph, a) && !is_constant(graph, b) {
        graph.swap_inputs(inst);
        core::mem::swap(&mut a, &mut b);
        stats.rewrites += 1;
    }

    if is_constant(graph, b) {
        if graph.inst(b).is_equal_to(1) {
            graph.replace_inputs_for_users(inst, a);
            stats.rewrites += 1;
            return true;
        }
        if graph.inst(b).is_equal_to(2) {
            let add = graph.create_instruction(Opcode::Add, ty, InstructionData::Plain);
            graph.init_inputs(add, &[a, a]);
            graph.replace_instruction(inst, add);
            stats.rewrites += 1;
            return true;
        }
    }

    false
}

fn fold_ashr(graph: &Graph, ty: PrimitiveType, a: Inst, b: Inst) -> ConstantValue {
    let shift = graph.inst(b).get_as_i64();
    if ty.is_32_bit() {
        let av = graph.inst(a).get_as_i64() as i32;
        let amt = (shift as u32) & 0x1f;
        ConstantValue::from_i64((av >> amt) as i64)
    } else {
        let av = graph.inst(a).get_as_i64();
        let amt = (shift as u64) & 0x3f;
        ConstantValue::from_i64(av >> amt)
    }
}

/// Ashr(a, b): fold both-constant; `b == 0` replaces with `a` (and removes
/// this instruction, since it has no further use once rewired); if `a`
/// itself is an `Ashr` by a same-typed constant, merge the two shifts.
fn handle_ashr(graph: &mut Graph, inst: Inst, stats: &mut PassStats) -> bool {
    let ty = graph.inst(inst).ty();
    let (a, b) = input_pair(graph, inst);

    if is_constant(graph, a) && is_constant(graph, b) {
        let folded = fold_ashr(graph, ty, a, b);
        fold_constant(graph, inst, ty, folded);
        stats.rewrites += 1;
        return true;
    }

    if is_constant(graph, b) && graph.inst(b).is_equal_to(0) {
        graph.replace_inputs_for_users(inst, a);
        graph.remove_instruction(inst);
        stats.rewrites += 1;
        stats.removed += 1;
        return true;
    }

    if graph.inst(a).opcode() == Opcode::Ashr {
        let (a_lhs, a_rhs) = input_pair(graph, a);
        if is_constant(graph, a_rhs)
            && is_constant(graph, b)
            && graph.inst(a_rhs).ty() == graph.inst(b).ty()
        {
            let sum = graph
                .inst(a_rhs)
                .get_as_i64()
                .wrapping_add(graph.inst(b).get_as_i64());
            let const_ty = graph.inst(b).ty();
            let new_const = graph.create_instruction(
                Opcode::Constant,
                const_ty,
                InstructionData::Constant(ConstantValue::from_i64(sum)),
            );
            let block = graph
                .inst(inst)
                .parent_block()
                .expect("handle_ashr: instruction has no parent block");
            graph.insert_instruction_before(block, inst, new_const);
            let new_ashr = graph.create_instruction(Opcode::Ashr, ty, InstructionData::Plain);
            graph.init_inputs(new_ashr, &[a_lhs, new_const]);
            graph.replace_instruction(inst, new_ashr);
            stats.rewrites += 1;
            return true;
        }
    }

    false
}

fn fold_or(graph: &Graph, a: Inst, b: Inst) -> ConstantValue {
    ConstantValue::from_u64(graph.inst(a).get_as_u64() | graph.inst(b).get_as_u64())
}

/// Or(a, b): `a == b` replaces with `a` (and removes this instruction); fold
/// both-constant; normalize a single constant into `b`; `b == 0` replaces
/// with `a` (and removes this instruction).
fn handle_or(graph: &mut Graph, inst: Inst, stats: &mut PassStats) -> bool {
    let ty = graph.inst(inst).ty();
    let (mut a, mut b) = input_pair(graph, inst);

    if a == b {
        graph.replace_inputs_for_users(inst, a);
        graph.remove_instruction(inst);
        stats.rewrites += 1;
        stats.removed += 1;
        return true;
    }

    if is_constant(graph, a) && is_constant(graph, b) {
        let folded = fold_or(graph, a, b);
        fold_constant(graph, inst, ty, folded);
        stats.rewrites += 1;
        return true;
    }

    if is_constant(graph, a) && !is_constant(graph, b) {
        graph.swap_inputs(inst);
        core::mem::swap(&mut a, &mut b);
        stats.rewrites += 1;
    }

    if is_constant(graph, b) && graph.inst(b).is_equal_to(0) {
        graph.replace_inputs_for_users(inst, a);
        graph.remove_instruction(inst);
        stats.rewrites += 1;
        stats.removed += 1;
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::run_to_fixpoint;
    use crate::ir::{Graph, IrBuilder, Opcode, PrimitiveType};

    /// `v2 = Mul(v0, Constant(2))` rewrites to `Add(v0, v0)`.
    #[test]
    fn mul_by_two_becomes_add() {
        let mut graph = Graph::new();
        let (mul, ret) = {
            let mut bld = IrBuilder::new(&mut graph);
            let entry = bld.create_block();
            bld.set_current_block(entry);
            let v0 = bld.create_parameter(PrimitiveType::I32, 0);
            let two = bld.create_constant_i64(PrimitiveType::I32, 2);
            let mul = bld.create_mul(PrimitiveType::I32, v0, two);
            let ret = bld.create_ret(PrimitiveType::I32, mul);
            (mul, ret)
        };
        graph.run_rpo();
        run_to_fixpoint(&mut graph, 8);

        let ret_input = graph.inst(ret).inputs()[0];
        assert_ne!(ret_input, mul);
        assert_eq!(graph.inst(ret_input).opcode(), Opcode::Add);
        let add_inputs = graph.inst(ret_input).inputs();
        assert_eq!(add_inputs[0], add_inputs[1]);
    }

    /// `v3 = Mul(v0, Constant(2))` feeding a `Phi` rewrites to `Add(v0, v0)`
    /// and the phi's input slot follows the rewrite.
    #[test]
    fn mul_by_two_rewrites_phi_user() {
        let mut graph = Graph::new();
        let (phi, then_block) = {
            let mut bld = IrBuilder::new(&mut graph);
            let entry = bld.create_block();
            let then_block = bld.create_block();
            let join = bld.create_block();

            bld.set_current_block(entry);
            let p = bld.create_parameter(PrimitiveType::I32, 0);
            let zero = bld.create_constant_i64(PrimitiveType::I32, 0);
            bld.create_beq(p, zero, then_block, join);

            bld.set_current_block(then_block);
            let v0 = bld.create_parameter(PrimitiveType::I32, 1);
            let two = bld.create_constant_i64(PrimitiveType::I32, 2);
            let mul = bld.create_mul(PrimitiveType::I32, v0, two);
            bld.create_jmp(join);

            bld.set_current_block(join);
            let phi = bld.create_phi(PrimitiveType::I32);
            bld.graph_mut().append_phi_input(phi, p, entry);
            bld.graph_mut().append_phi_input(phi, mul, then_block);
            bld.create_ret(PrimitiveType::I32, phi);

            (phi, then_block)
        };
        graph.run_rpo();
        run_to_fixpoint(&mut graph, 8);

        let then_edge = graph
            .inst(phi)
            .phi_inputs()
            .find(|e| e.pred == then_block)
            .unwrap();
        assert_eq!(graph.inst(then_edge.value).opcode(), Opcode::Add);
    }

    /// `v0 >> 2 >> 3` (both shift amounts constant) merges into a single
    /// `Ashr(v0, Constant(5))`.
    #[test]
    fn nested_ashr_by_constants_merges() {
        let mut graph = Graph::new();
        let ret = {
            let mut bld = IrBuilder::new(&mut graph);
            let entry = bld.create_block();
            bld.set_current_block(entry);
            let v0 = bld.create_parameter(PrimitiveType::I32, 0);
            let two = bld.create_constant_i64(PrimitiveType::I32, 2);
            let three = bld.create_constant_i64(PrimitiveType::I32, 3);
            let inner = bld.create_ashr(PrimitiveType::I32, v0, two);
            let outer = bld.create_ashr(PrimitiveType::I32, inner, three);
            bld.create_ret(PrimitiveType::I32, outer)
        };
        graph.run_rpo();
        run_to_fixpoint(&mut graph, 8);

        let ret_input = graph.inst(ret).inputs()[0];
        assert_eq!(graph.inst(ret_input).opcode(), Opcode::Ashr);
        let rhs = graph.inst(ret_input).inputs()[1];
        assert!(graph.inst(rhs).is_equal_to(5));
    }
}
