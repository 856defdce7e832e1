use super::InstructionSelector;
use tacc_codegen::{AsmInst, CallingConvention, Syscall};
use tacc_common::CodegenError;
use tacc_ir::{Const, Operand, Quad};

impl InstructionSelector<'_> {
    /// `print v`: string literals and names holding one use the
    /// print-string service, everything else prints as an integer
    pub(super) fn select_print(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let value = self.required(&quad.a1, "value")?;
        let arg = CallingConvention::SYSCALL_ARG;

        let service = match value {
            Operand::Const(Const::Str(s)) => {
                let label = self.strings.intern(s);
                self.emit(AsmInst::La(arg, label));
                Syscall::PrintString
            }
            Operand::Const(c) => {
                let n = c
                    .as_int()
                    .ok_or_else(|| self.malformed(format!("cannot print {c}")))?;
                self.emit(AsmInst::Li(arg, n));
                Syscall::PrintInt
            }
            Operand::Name(name) => {
                let reg = self.use_name(name, CallingConvention::SCRATCH_LHS)?;
                self.emit(AsmInst::Move(arg, reg));
                if self.string_values.contains(name) {
                    Syscall::PrintString
                } else {
                    Syscall::PrintInt
                }
            }
            other => return Err(self.malformed(format!("cannot print {other}"))),
        };
        self.out.emit_all(service.invoke());
        Ok(())
    }
}
