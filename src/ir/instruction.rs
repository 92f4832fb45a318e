//! The typed-instruction model: opcode, result type,
//! inputs, users, and opcode-specific payload.

use smallvec::SmallVec;

use super::{Block, Inst, Opcode, PrimitiveType, UseId};

/// The opcode-specific payload that doesn't fit in the uniform
/// opcode/type/inputs shape every instruction already has.
///
/// Plain arithmetic, memory, and check opcodes need nothing beyond their
/// inputs and are represented by [`InstructionData::Plain`].
#[derive(Clone, Debug)]
pub enum InstructionData {
    /// Covers `Undefined`, `Add/Sub/Mul/Div/Rem/And/Or/Xor/Shr/Shl/Ashr`,
    /// `LoadArray`, `StoreArray`, `NullCheck`, `BoundsCheck`, and `Ret`: the
    /// opcode plus `inputs` fully describes the instruction.
    Plain,
    /// `Constant`'s literal value, stored as raw bits reinterpreted
    /// according to the instruction's declared [`PrimitiveType`].
    Constant(ConstantValue),
    /// `Parameter`'s declared index in the function signature and whether it
    /// was declared with a `Ref` type (consulted by check elimination).
    Parameter {
        /// Zero-based parameter index.
        index: u32,
        /// Whether the parameter's declared type is `Ref`.
        is_ref: bool,
    },
    /// `Phi`'s per-input predecessor block, parallel to `inputs`.
    Phi {
        /// `pred_blocks[i]` is the block `inputs[i]` flows in from.
        pred_blocks: SmallVec<[Block; 2]>,
    },
    /// `Jmp`'s single successor.
    Jmp {
        /// The unconditional jump target.
        target: Block,
    },
    /// `Beq`/`Bne`/`Bgt`'s two successors. `inputs[0]`/`inputs[1]` are the
    /// compared operands.
    Branch {
        /// Successor taken when the condition holds.
        then_block: Block,
        /// Successor taken otherwise.
        else_block: Block,
    },
    /// `NewArr`'s declared element type. `inputs[0]` is the length operand.
    NewArr {
        /// Element type of the allocated array.
        elem_type: PrimitiveType,
    },
    /// `CallStatic`'s callee identity and declared argument types.
    /// `inputs` holds the argument instructions themselves.
    CallStatic {
        /// Opaque identifier of the statically-resolved callee.
        method_id: u32,
        /// Declared type of each argument, parallel to `inputs`.
        arg_types: SmallVec<[PrimitiveType; 4]>,
    },
}

/// A compile-time constant's bits, reinterpreted by the owning instruction's
/// declared [`PrimitiveType`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ConstantValue {
    bits: u64,
}

impl ConstantValue {
    /// Store a signed integer's two's-complement bits.
    pub fn from_i64(v: i64) -> Self {
        ConstantValue { bits: v as u64 }
    }

    /// Store an unsigned integer's bits.
    pub fn from_u64(v: u64) -> Self {
        ConstantValue { bits: v }
    }

    /// Store an `f32`'s bit pattern, zero-extended into the 64-bit slot.
    pub fn from_f32(v: f32) -> Self {
        ConstantValue {
            bits: u64::from(v.to_bits()),
        }
    }

    /// Store an `f64`'s bit pattern.
    pub fn from_f64(v: f64) -> Self {
        ConstantValue { bits: v.to_bits() }
    }

    /// The raw 64-bit slot, uninterpreted.
    pub fn raw_bits(self) -> u64 {
        self.bits
    }
}

/// A resolved `(value, predecessor)` pair of a [`Opcode::Phi`] instruction,
/// yielded by [`Instruction::phi_inputs`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PhiInput {
    /// The instruction producing the value coming in along this edge.
    pub value: Inst,
    /// The predecessor block this edge comes from.
    pub pred: Block,
}

/// One instruction in a [`super::Graph`].
///
/// Every mutator here that can break one of this type's invariants is either
/// infallible by construction or documents the precondition it assumes.
#[derive(Clone, Debug)]
pub struct Instruction {
    opcode: Opcode,
    ty: PrimitiveType,
    data: InstructionData,

    /// Def → use edges. A single growable container for every opcode shape,
    /// with arity enforced at the call site rather than in the type: a fixed
    /// pair for binary/branch-comparison shapes, an appendable sequence for
    /// `Phi`/`CallStatic`.
    inputs: SmallVec<[Inst; 2]>,
    /// Parallel to `inputs`: the use-list node representing each edge in the
    /// referenced def's user list. May repeat across slots when two inputs
    /// of a binary instruction refer to the same def.
    input_uses: SmallVec<[UseId; 2]>,

    /// Head/tail of this instruction's own user list (edges where this
    /// instruction is the def).
    pub(super) users_head: Option<UseId>,
    pub(super) users_tail: Option<UseId>,

    /// Intrusive instruction-list links within the parent block.
    pub(super) prev: Option<Inst>,
    pub(super) next: Option<Inst>,
    /// The block this instruction currently resides in.
    pub(super) parent: Option<Block>,
}

impl Instruction {
    pub(super) fn new(opcode: Opcode, ty: PrimitiveType, data: InstructionData) -> Self {
        Instruction {
            opcode,
            ty,
            data,
            inputs: SmallVec::new(),
            input_uses: SmallVec::new(),
            users_head: None,
            users_tail: None,
            prev: None,
            next: None,
            parent: None,
        }
    }

    /// This instruction's opcode.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// This instruction's declared result type.
    pub fn ty(&self) -> PrimitiveType {
        self.ty
    }

    /// The opcode-specific payload.
    pub fn data(&self) -> &InstructionData {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut InstructionData {
        &mut self.data
    }

    /// The block this instruction currently resides in, or `None` if it has
    /// been removed from its block.
    pub fn parent_block(&self) -> Option<Block> {
        self.parent
    }

    /// The ordered def → use inputs.
    pub fn inputs(&self) -> &[Inst] {
        &self.inputs
    }

    pub(super) fn inputs_mut(&mut self) -> &mut SmallVec<[Inst; 2]> {
        &mut self.inputs
    }

    pub(super) fn input_uses(&self) -> &[UseId] {
        &self.input_uses
    }

    pub(super) fn input_uses_mut(&mut self) -> &mut SmallVec<[UseId; 2]> {
        &mut self.input_uses
    }

    pub(super) fn push_input_raw(&mut self, def: Inst, use_id: UseId) {
        self.inputs.push(def);
        self.input_uses.push(use_id);
    }

    /// Swap `inputs[0]` and `inputs[1]`.
    ///
    /// Used by commutative-normalization peepholes to put a constant operand
    /// in the `b` position.
    ///
    /// # Panics
    ///
    /// Panics if this instruction does not have exactly two inputs.
    pub(super) fn swap_inputs_raw(&mut self) {
        assert!(
            self.inputs.len() == 2,
            "swap_inputs requires a binary instruction, got {} inputs",
            self.inputs.len()
        );
        self.inputs.swap(0, 1);
        self.input_uses.swap(0, 1);
        if let InstructionData::Phi { pred_blocks } = &mut self.data {
            pred_blocks.swap(0, 1);
        }
    }

    /// Per-input `(value, predecessor)` pairs of a `Phi` instruction.
    ///
    /// # Panics
    ///
    /// Panics if `self.opcode() != Opcode::Phi`.
    pub fn phi_inputs(&self) -> impl Iterator<Item = PhiInput> + '_ {
        let InstructionData::Phi { pred_blocks } = &self.data else {
            panic!("phi_inputs: not a Phi instruction");
        };
        self.inputs
            .iter()
            .zip(pred_blocks.iter())
            .map(|(&value, &pred)| PhiInput { value, pred })
    }

    /// Narrowing accessor for this instruction's literal value.
    ///
    /// # Panics
    ///
    /// Panics if `self.opcode() != Opcode::Constant`.
    pub fn as_constant(&self) -> ConstantValue {
        match self.data {
            InstructionData::Constant(c) => c,
            _ => panic!("as_constant: opcode is {:?}, not Constant", self.opcode),
        }
    }

    /// True if this constant's declared type is a signed integer width.
    pub fn is_signed_int(&self) -> bool {
        debug_assert_eq!(self.opcode, Opcode::Constant);
        self.ty.is_signed_integer()
    }

    /// This constant's value as `i64`, two's-complement-extended from its
    /// declared width.
    pub fn get_as_i64(&self) -> i64 {
        let bits = self.as_constant().raw_bits();
        match self.ty {
            PrimitiveType::I8 => bits as u8 as i8 as i64,
            PrimitiveType::I16 => bits as u16 as i16 as i64,
            PrimitiveType::I32 => bits as u32 as i32 as i64,
            _ => bits as i64,
        }
    }

    /// This constant's value as `u64`, zero-extended from its declared width.
    pub fn get_as_u64(&self) -> u64 {
        let bits = self.as_constant().raw_bits();
        match self.ty {
            PrimitiveType::U8 => bits as u8 as u64,
            PrimitiveType::U16 => bits as u16 as u64,
            PrimitiveType::U32 => bits as u32 as u64,
            _ => bits,
        }
    }

    /// This constant's value as `f32`, reinterpreting the low 32 bits.
    pub fn get_as_f32(&self) -> f32 {
        f32::from_bits(self.as_constant().raw_bits() as u32)
    }

    /// This constant's value as `f64`, reinterpreting all 64 bits.
    pub fn get_as_f64(&self) -> f64 {
        f64::from_bits(self.as_constant().raw_bits())
    }

    /// Value equality against another constant's raw representation, with
    /// NaN considered equal to NaN (unlike IEEE-754 `==`).
    pub fn is_equal(&self, other: ConstantValue) -> bool {
        debug_assert_eq!(self.opcode, Opcode::Constant);
        match self.ty {
            PrimitiveType::F32 => {
                let a = f32::from_bits(self.as_constant().raw_bits() as u32);
                let b = f32::from_bits(other.raw_bits() as u32);
                a == b || (a.is_nan() && b.is_nan())
            }
            PrimitiveType::F64 => {
                let a = f64::from_bits(self.as_constant().raw_bits());
                let b = f64::from_bits(other.raw_bits());
                a == b || (a.is_nan() && b.is_nan())
            }
            _ => self.as_constant().raw_bits() == other.raw_bits(),
        }
    }

    /// True if this constant equals `v`, checked both as an integer and as
    /// the exact `f32`/`f64` representation of `v` (so `Constant::f32(2.0)`
    /// matches `is_equal_to(2)`).
    pub fn is_equal_to(&self, v: i64) -> bool {
        debug_assert_eq!(self.opcode, Opcode::Constant);
        match self.ty {
            PrimitiveType::F32 => (self.get_as_f32() - v as f32).abs() == 0.0,
            PrimitiveType::F64 => (self.get_as_f64() - v as f64).abs() == 0.0,
            _ if self.is_signed_int() => self.get_as_i64() == v,
            _ => v >= 0 && self.get_as_u64() == v as u64,
        }
    }
}
