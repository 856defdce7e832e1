//! Arithmetic and relational operators

use super::InstructionSelector;
use tacc_codegen::{AsmInst, CallingConvention, Reg};
use tacc_common::CodegenError;
use tacc_ir::{OpCode, Quad};

impl InstructionSelector<'_> {
    /// Load both sources and find the destination, in that order
    fn binary_operands(&mut self, quad: &Quad) -> Result<(Reg, Reg, super::Dest, String), CodegenError> {
        let lhs = self.required(&quad.a1, "left operand")?;
        let rhs = self.required(&quad.a2, "right operand")?;
        let dst = self.dst_of(quad)?.to_string();

        let l = self.use_value(lhs, CallingConvention::SCRATCH_LHS)?;
        let r = self.use_value(rhs, CallingConvention::SCRATCH_RHS)?;
        let dest = self.def_name(&dst)?;
        Ok((l, r, dest, dst))
    }

    pub(super) fn select_arith(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let (l, r, dest, dst) = self.binary_operands(quad)?;
        let d = dest.reg;
        match quad.op {
            OpCode::Add => self.emit(AsmInst::Addu(d, l, r)),
            OpCode::Sub => self.emit(AsmInst::Subu(d, l, r)),
            OpCode::Mul => self.emit(AsmInst::Mul(d, l, r)),
            OpCode::Div => {
                self.emit(AsmInst::Div(l, r));
                self.emit(AsmInst::Mflo(d));
            }
            OpCode::Mod => {
                self.emit(AsmInst::Div(l, r));
                self.emit(AsmInst::Mfhi(d));
            }
            op => return Err(CodegenError::unsupported(self.pos(), op.as_str())),
        }
        self.finish_def(dest);
        self.mark_string(&dst, false);
        Ok(())
    }

    /// Relational operators produce 0 or 1
    pub(super) fn select_relational(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let (l, r, dest, dst) = self.binary_operands(quad)?;
        let d = dest.reg;
        match quad.op {
            OpCode::Lt => self.emit(AsmInst::Slt(d, l, r)),
            OpCode::Gt => self.emit(AsmInst::Slt(d, r, l)),
            OpCode::Le => {
                self.emit(AsmInst::Slt(d, r, l));
                self.emit(AsmInst::Xori(d, d, 1));
            }
            OpCode::Ge => {
                self.emit(AsmInst::Slt(d, l, r));
                self.emit(AsmInst::Xori(d, d, 1));
            }
            OpCode::Eq => {
                self.emit(AsmInst::Subu(d, l, r));
                self.emit(AsmInst::Sltiu(d, d, 1));
            }
            OpCode::Ne => {
                self.emit(AsmInst::Subu(d, l, r));
                self.emit(AsmInst::Sltu(d, Reg::Zero, d));
            }
            op => return Err(CodegenError::unsupported(self.pos(), op.as_str())),
        }
        self.finish_def(dest);
        self.mark_string(&dst, false);
        Ok(())
    }
}
