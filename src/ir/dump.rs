//! Textual rendering of a graph for logs and test failure output.
//!
//! Read-only: there is no parser back. Blocks are emitted in id
//! (construction) order, not RPO, so this is meaningful even before any
//! analysis has run.

use core::fmt::{self, Write};

use cranelift_entity::EntityRef;

use super::{Block, Graph, Inst, InstructionData, Opcode};

fn block_label(b: Block) -> String {
    format!("BB_{}", b.index())
}

impl Graph {
    /// Write one line per block header (`BB_<id>:`) followed by indented
    /// instruction lines (`<id>.<type> <opcode> <operands>`).
    pub fn dump<W: Write>(&self, w: &mut W) -> fmt::Result {
        for block in self.blocks() {
            writeln!(w, "{}:", block_label(block))?;
            let mut cur = self.block(block).first_insn();
            while let Some(inst) = cur {
                write!(w, "  {inst}.{} {}", self.inst(inst).ty(), self.inst(inst).opcode())?;
                self.dump_operands(w, inst)?;
                writeln!(w)?;
                cur = self.next_inst(inst);
            }
        }
        Ok(())
    }

    fn dump_operands<W: Write>(&self, w: &mut W, inst: Inst) -> fmt::Result {
        let data = self.inst(inst).data();
        match (self.inst(inst).opcode(), data) {
            (Opcode::Constant, _) => self.dump_constant(w, inst),
            (Opcode::Parameter, InstructionData::Parameter { index, .. }) => {
                write!(w, " #{index}")
            }
            (Opcode::Jmp, InstructionData::Jmp { target }) => {
                write!(w, " {}", block_label(*target))
            }
            (Opcode::Beq, InstructionData::Branch { then_block, else_block })
            | (Opcode::Bne, InstructionData::Branch { then_block, else_block })
            | (Opcode::Bgt, InstructionData::Branch { then_block, else_block }) => {
                for input in self.inst(inst).inputs() {
                    write!(w, " {input}")?;
                }
                write!(w, " {} {}", block_label(*then_block), block_label(*else_block))
            }
            (Opcode::Phi, _) => {
                let mut first = true;
                for pi in self.inst(inst).phi_inputs() {
                    if !first {
                        write!(w, ",")?;
                    }
                    write!(w, " {}:{}", pi.value, block_label(pi.pred))?;
                    first = false;
                }
                Ok(())
            }
            (Opcode::CallStatic, InstructionData::CallStatic { method_id, .. }) => {
                write!(w, " #{method_id}")?;
                for input in self.inst(inst).inputs() {
                    write!(w, " {input}")?;
                }
                Ok(())
            }
            (Opcode::NewArr, InstructionData::NewArr { elem_type }) => {
                write!(w, " {elem_type}")?;
                for input in self.inst(inst).inputs() {
                    write!(w, " {input}")?;
                }
                Ok(())
            }
            _ => {
                for input in self.inst(inst).inputs() {
                    write!(w, " {input}")?;
                }
                Ok(())
            }
        }
    }

    fn dump_constant<W: Write>(&self, w: &mut W, inst: Inst) -> fmt::Result {
        let insn = self.inst(inst);
        let ty = insn.ty();
        if ty.is_float() {
            if ty == super::PrimitiveType::F32 {
                write!(w, " {}", insn.get_as_f32())
            } else {
                write!(w, " {}", insn.get_as_f64())
            }
        } else if insn.is_signed_int() {
            write!(w, " {}", insn.get_as_i64())
        } else {
            write!(w, " {}", insn.get_as_u64())
        }
    }
}
