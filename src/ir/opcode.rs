//! The closed set of operations this IR can express.

use core::fmt;

/// A closed enumeration of every operation an [`Instruction`](super::Instruction)
/// can perform.
///
/// New opcodes are never added by a front end at runtime: every pass in this
/// crate (in particular [`crate::opt::peephole`]'s dispatch table) is written
/// against this exact, exhaustive list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    /// Placeholder opcode for a just-constructed, not-yet-specialized instruction.
    Undefined,
    /// Integer or float addition.
    Add,
    /// Integer or float subtraction.
    Sub,
    /// Integer or float multiplication.
    Mul,
    /// Integer or float division.
    Div,
    /// Integer remainder.
    Rem,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Logical (unsigned) right shift.
    Shr,
    /// Left shift.
    Shl,
    /// Arithmetic (sign-extending) right shift.
    Ashr,
    /// Load an element out of an array reference.
    LoadArray,
    /// Store an element into an array reference.
    StoreArray,
    /// Allocate a new array of a given element type and length.
    NewArr,
    /// Unconditional jump to a single successor.
    Jmp,
    /// Branch to one of two successors if two values compare equal.
    Beq,
    /// Branch to one of two successors if two values compare not-equal.
    Bne,
    /// Branch to one of two successors if the first value is greater than the second.
    Bgt,
    /// Return from the function, optionally with a value.
    Ret,
    /// A compile-time constant value.
    Constant,
    /// A formal parameter of the enclosing function.
    Parameter,
    /// An SSA merge point: one input per predecessor block.
    Phi,
    /// A direct call to a statically-known method.
    CallStatic,
    /// Traps unless the reference input is non-null.
    NullCheck,
    /// Traps unless `0 <= idx < max`.
    BoundsCheck,
}

impl Opcode {
    /// True for [`Opcode::Jmp`], [`Opcode::Beq`], [`Opcode::Bne`], [`Opcode::Bgt`]:
    /// instructions that must be the last instruction of their block and that
    /// register CFG edges when created through [`crate::ir::IrBuilder`].
    pub fn is_branch_or_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jmp | Opcode::Beq | Opcode::Bne | Opcode::Bgt
        )
    }

    /// True for [`Opcode::Ret`]: also a block terminator, but never a CFG edge source.
    pub fn is_terminator(self) -> bool {
        self.is_branch_or_jump() || matches!(self, Opcode::Ret)
    }

    /// True for opcodes whose inputs grow by appending ([`Opcode::Phi`],
    /// [`Opcode::CallStatic`]) rather than a fixed pair.
    pub fn has_variadic_inputs(self) -> bool {
        matches!(self, Opcode::Phi | Opcode::CallStatic)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Undefined => "undefined",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Rem => "rem",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shr => "shr",
            Opcode::Shl => "shl",
            Opcode::Ashr => "ashr",
            Opcode::LoadArray => "load_array",
            Opcode::StoreArray => "store_array",
            Opcode::NewArr => "new_arr",
            Opcode::Jmp => "jmp",
            Opcode::Beq => "beq",
            Opcode::Bne => "bne",
            Opcode::Bgt => "bgt",
            Opcode::Ret => "ret",
            Opcode::Constant => "constant",
            Opcode::Parameter => "parameter",
            Opcode::Phi => "phi",
            Opcode::CallStatic => "call_static",
            Opcode::NullCheck => "null_check",
            Opcode::BoundsCheck => "bounds_check",
        };
        f.write_str(s)
    }
}
