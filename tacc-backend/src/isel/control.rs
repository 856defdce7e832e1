//! Labels, jumps and returns

use super::InstructionSelector;
use tacc_codegen::{AsmInst, CallingConvention, Reg};
use tacc_common::CodegenError;
use tacc_ir::{Const, Operand, Quad};

impl InstructionSelector<'_> {
    fn target_of(&self, quad: &Quad) -> Result<String, CodegenError> {
        quad.target()
            .map(str::to_string)
            .ok_or_else(|| self.malformed(format!("{} requires a label", quad.op.as_str())))
    }

    pub(super) fn select_label(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let label = self.target_of(quad)?;
        // Values falling through into the label must sit where jumps put them
        self.flush_block()?;
        self.out.label(&label);
        Ok(())
    }

    pub(super) fn select_goto(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let label = self.target_of(quad)?;
        self.flush_block()?;
        self.emit(AsmInst::J(label));
        Ok(())
    }

    pub(super) fn select_if_goto(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let label = self.target_of(quad)?;
        let cond = self.required(&quad.a1, "branch condition")?;

        if let Operand::Const(c) = cond {
            // Decided statically: either an unconditional jump or nothing
            if c.is_truthy() {
                self.flush_block()?;
                self.emit(AsmInst::J(label));
            }
            return Ok(());
        }

        let reg = self.use_value(cond, CallingConvention::SCRATCH_LHS)?;
        self.flush_block()?;
        self.emit(AsmInst::Bne(reg, Reg::Zero, label));
        Ok(())
    }

    pub(super) fn select_ret(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let rv = CallingConvention::RETURN_VALUE;
        match &quad.a1 {
            None | Some(Operand::Const(Const::Null)) => {}
            Some(Operand::Const(Const::Str(s))) => {
                let label = self.strings.intern(s);
                self.emit(AsmInst::La(rv, label));
            }
            Some(Operand::Const(c)) => {
                let value = c
                    .as_int()
                    .ok_or_else(|| self.malformed(format!("cannot return {c}")))?;
                self.emit(AsmInst::Li(rv, value));
            }
            Some(value) => {
                let reg = self.use_value(value, CallingConvention::SCRATCH_LHS)?;
                self.emit(AsmInst::Move(rv, reg));
            }
        }

        // The epilogue directly follows the last quad
        if !self.is_last() {
            let epilogue = self.epilogue.clone();
            self.emit(AsmInst::J(epilogue));
        }
        Ok(())
    }
}
