//! A thin, typed façade over [`Graph`]'s bare factories: one method per
//! opcode shape, a current-block cursor, and automatic CFG-edge
//! registration whenever a jump or branch is appended.

use smallvec::SmallVec;

use super::{Block, ConstantValue, Graph, Inst, InstructionData, Opcode, PrimitiveType};

/// Builds instructions into a [`Graph`] one block at a time.
///
/// The builder owns no state the graph doesn't already have except which
/// block new instructions append to; callers still create blocks and fix up
/// the cursor themselves (this is not a structured control-flow builder —
/// the caller decides block order and which predecessor edges exist, same
/// as the IR it targets).
pub struct IrBuilder<'g> {
    graph: &'g mut Graph,
    current_block: Option<Block>,
}

impl<'g> IrBuilder<'g> {
    /// Build into `graph`, with no current block set yet.
    pub fn new(graph: &'g mut Graph) -> Self {
        IrBuilder {
            graph,
            current_block: None,
        }
    }

    /// Borrow the underlying graph.
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Mutably borrow the underlying graph, e.g. to run an analysis.
    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }

    /// Create a new block without switching to it.
    pub fn create_block(&mut self) -> Block {
        self.graph.create_block()
    }

    /// The block new instructions are currently appended to.
    pub fn current_block(&self) -> Option<Block> {
        self.current_block
    }

    /// Switch the cursor to `block`. Subsequent `create_*` calls append
    /// there until the cursor moves again.
    pub fn set_current_block(&mut self, block: Block) {
        self.current_block = Some(block);
    }

    fn current_block_or_panic(&self) -> Block {
        self.current_block
            .expect("IrBuilder: no current block set")
    }

    fn emit(&mut self, opcode: Opcode, ty: PrimitiveType, data: InstructionData) -> Inst {
        let block = self.current_block_or_panic();
        let inst = self.graph.create_instruction(opcode, ty, data);
        self.graph.push_instruction(block, inst);
        inst
    }

    fn register_edge(&mut self, successor: Block) {
        let from = self.current_block_or_panic();
        self.graph.blocks_mut()[from].push_successor(successor);
        self.graph.blocks_mut()[successor].push_predecessor(from);
    }

    // ---- leaves -----------------------------------------------------------

    /// A signed-integer-typed constant.
    pub fn create_constant_i64(&mut self, ty: PrimitiveType, value: i64) -> Inst {
        debug_assert!(ty.is_integer());
        self.emit(
            Opcode::Constant,
            ty,
            InstructionData::Constant(ConstantValue::from_i64(value)),
        )
    }

    /// An unsigned-integer-typed constant.
    pub fn create_constant_u64(&mut self, ty: PrimitiveType, value: u64) -> Inst {
        debug_assert!(ty.is_integer());
        self.emit(
            Opcode::Constant,
            ty,
            InstructionData::Constant(ConstantValue::from_u64(value)),
        )
    }

    /// An `f32` constant.
    pub fn create_constant_f32(&mut self, value: f32) -> Inst {
        self.emit(
            Opcode::Constant,
            PrimitiveType::F32,
            InstructionData::Constant(ConstantValue::from_f32(value)),
        )
    }

    /// An `f64` constant.
    pub fn create_constant_f64(&mut self, value: f64) -> Inst {
        self.emit(
            Opcode::Constant,
            PrimitiveType::F64,
            InstructionData::Constant(ConstantValue::from_f64(value)),
        )
    }

    /// A formal parameter reference.
    pub fn create_parameter(&mut self, ty: PrimitiveType, index: u32) -> Inst {
        let is_ref = ty == PrimitiveType::Ref;
        self.emit(Opcode::Parameter, ty, InstructionData::Parameter { index, is_ref })
    }

    // ---- arithmetic / bitwise / shift -------------------------------------

    fn create_binary(&mut self, opcode: Opcode, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        let inst = self.emit(opcode, ty, InstructionData::Plain);
        self.graph.init_inputs(inst, &[a, b]);
        inst
    }

    /// `a + b`.
    pub fn create_add(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Add, ty, a, b)
    }

    /// `a - b`.
    pub fn create_sub(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Sub, ty, a, b)
    }

    /// `a * b`.
    pub fn create_mul(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Mul, ty, a, b)
    }

    /// `a / b`.
    pub fn create_div(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Div, ty, a, b)
    }

    /// `a % b`.
    pub fn create_rem(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Rem, ty, a, b)
    }

    /// `a & b`.
    pub fn create_and(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::And, ty, a, b)
    }

    /// `a | b`.
    pub fn create_or(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Or, ty, a, b)
    }

    /// `a ^ b`.
    pub fn create_xor(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Xor, ty, a, b)
    }

    /// Logical right shift.
    pub fn create_shr(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Shr, ty, a, b)
    }

    /// Left shift.
    pub fn create_shl(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Shl, ty, a, b)
    }

    /// Arithmetic (sign-extending) right shift.
    pub fn create_ashr(&mut self, ty: PrimitiveType, a: Inst, b: Inst) -> Inst {
        self.create_binary(Opcode::Ashr, ty, a, b)
    }

    // ---- arrays -------------------------------------------------------------

    /// Load `arr[idx]`.
    pub fn create_load_array(&mut self, ty: PrimitiveType, arr: Inst, idx: Inst) -> Inst {
        let inst = self.emit(Opcode::LoadArray, ty, InstructionData::Plain);
        self.graph.init_inputs(inst, &[arr, idx]);
        inst
    }

    /// Store `value` into `arr[idx]`.
    pub fn create_store_array(&mut self, arr: Inst, idx: Inst, value: Inst) -> Inst {
        let inst = self.emit(Opcode::StoreArray, PrimitiveType::Void, InstructionData::Plain);
        self.graph.init_inputs(inst, &[arr, idx, value]);
        inst
    }

    /// Allocate a new array of `elem_type` with `length` elements.
    pub fn create_new_arr(&mut self, elem_type: PrimitiveType, length: Inst) -> Inst {
        let inst = self.emit(
            Opcode::NewArr,
            PrimitiveType::Ref,
            InstructionData::NewArr { elem_type },
        );
        self.graph.init_inputs(inst, &[length]);
        inst
    }

    // ---- checks ---------------------------------------------------------

    /// Trap unless `reference` is non-null; yields `reference` through.
    pub fn create_null_check(&mut self, ty: PrimitiveType, reference: Inst) -> Inst {
        let inst = self.emit(Opcode::NullCheck, ty, InstructionData::Plain);
        self.graph.init_inputs(inst, &[reference]);
        inst
    }

    /// Trap unless `0 <= idx < max`; yields `idx` through. `reference` is the
    /// array `idx`/`max` were derived from, consulted by check elimination to
    /// find other bounds checks guarding the same reference.
    pub fn create_bounds_check(&mut self, ty: PrimitiveType, reference: Inst, idx: Inst, max: Inst) -> Inst {
        let inst = self.emit(Opcode::BoundsCheck, ty, InstructionData::Plain);
        self.graph.init_inputs(inst, &[reference, idx, max]);
        inst
    }

    // ---- merges / calls ---------------------------------------------------

    /// An empty `Phi`; inputs are attached one per predecessor with
    /// [`Graph::append_phi_input`].
    pub fn create_phi(&mut self, ty: PrimitiveType) -> Inst {
        self.emit(
            Opcode::Phi,
            ty,
            InstructionData::Phi {
                pred_blocks: SmallVec::new(),
            },
        )
    }

    /// A direct call to `method_id` with `args`, whose declared types are
    /// `arg_types`.
    pub fn create_call_static(
        &mut self,
        ty: PrimitiveType,
        method_id: u32,
        args: &[Inst],
        arg_types: &[PrimitiveType],
    ) -> Inst {
        debug_assert_eq!(args.len(), arg_types.len());
        let inst = self.emit(
            Opcode::CallStatic,
            ty,
            InstructionData::CallStatic {
                method_id,
                arg_types: arg_types.iter().copied().collect(),
            },
        );
        self.graph.init_inputs(inst, args);
        inst
    }

    // ---- control flow -------------------------------------------------------

    /// Unconditional jump to `target`. Registers the CFG edge.
    pub fn create_jmp(&mut self, target: Block) -> Inst {
        let inst = self.emit(Opcode::Jmp, PrimitiveType::Void, InstructionData::Jmp { target });
        self.register_edge(target);
        inst
    }

    fn create_branch(
        &mut self,
        opcode: Opcode,
        a: Inst,
        b: Inst,
        then_block: Block,
        else_block: Block,
    ) -> Inst {
        let inst = self.emit(
            opcode,
            PrimitiveType::Void,
            InstructionData::Branch {
                then_block,
                else_block,
            },
        );
        self.graph.init_inputs(inst, &[a, b]);
        self.register_edge(then_block);
        self.register_edge(else_block);
        inst
    }

    /// Branch to `then_block` if `a == b`, else `else_block`.
    pub fn create_beq(&mut self, a: Inst, b: Inst, then_block: Block, else_block: Block) -> Inst {
        self.create_branch(Opcode::Beq, a, b, then_block, else_block)
    }

    /// Branch to `then_block` if `a != b`, else `else_block`.
    pub fn create_bne(&mut self, a: Inst, b: Inst, then_block: Block, else_block: Block) -> Inst {
        self.create_branch(Opcode::Bne, a, b, then_block, else_block)
    }

    /// Branch to `then_block` if `a > b`, else `else_block`.
    pub fn create_bgt(&mut self, a: Inst, b: Inst, then_block: Block, else_block: Block) -> Inst {
        self.create_branch(Opcode::Bgt, a, b, then_block, else_block)
    }

    /// Return `value`.
    pub fn create_ret(&mut self, ty: PrimitiveType, value: Inst) -> Inst {
        let inst = self.emit(Opcode::Ret, ty, InstructionData::Plain);
        self.graph.init_inputs(inst, &[value]);
        inst
    }

    /// Return with no value.
    pub fn create_ret_void(&mut self) -> Inst {
        self.emit(Opcode::Ret, PrimitiveType::Void, InstructionData::Plain)
    }
}
