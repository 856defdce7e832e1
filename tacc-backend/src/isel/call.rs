//! Calls
//!
//! `param` quads only queue their operand. The matching `call` reserves one
//! stack word per argument, stores the queued values in declaration order,
//! spills caller-saved registers and jumps. The callee sees argument *i* at
//! `[fp + 2 + i]`.

use super::{symbol, InstructionSelector};
use log::debug;
use tacc_codegen::{AsmInst, CallingConvention, WORD_SIZE};
use tacc_common::CodegenError;
use tacc_ir::{Const, Operand, Quad};

impl InstructionSelector<'_> {
    pub(super) fn select_param(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let value = self.required(&quad.a1, "argument")?.clone();
        self.pending_params.push(value);
        Ok(())
    }

    /// Map a call target onto a known function: exact name, then the part
    /// after the last `.`, then the only function whose qualified name ends
    /// in `.target`
    fn resolve_callee(&self, target: &str) -> Result<String, CodegenError> {
        let functions = self.ctx.functions;
        if functions.contains(target) {
            return Ok(target.to_string());
        }
        if let Some((_, method)) = target.rsplit_once('.') {
            if functions.contains(method) {
                return Ok(method.to_string());
            }
        }
        let suffix = format!(".{target}");
        let mut candidates = functions.iter().filter(|f| f.ends_with(&suffix));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Ok(only.clone()),
            _ => Err(CodegenError::unresolved(self.pos(), target)),
        }
    }

    pub(super) fn select_call(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let target = match &quad.a1 {
            Some(Operand::Label(l)) => l.as_str(),
            _ => return Err(self.malformed("call needs a callee label")),
        };
        let nargs = match &quad.a2 {
            Some(Operand::Const(Const::Int(n))) if *n >= 0 => *n as usize,
            _ => return Err(self.malformed("call needs an argument count")),
        };
        if nargs != self.pending_params.len() {
            return Err(self.malformed(format!(
                "call to '{target}' declares {nargs} argument(s) but {} were passed",
                self.pending_params.len()
            )));
        }
        let callee = self.resolve_callee(target)?;
        debug!("  call '{target}' -> '{callee}' with {nargs} argument(s)");

        let sp = CallingConvention::STACK_PTR;
        let bytes = nargs as i32 * WORD_SIZE;
        let params = std::mem::take(&mut self.pending_params);
        if nargs > 0 {
            self.emit(AsmInst::Addiu(sp, sp, -bytes));
            for (i, param) in params.iter().enumerate() {
                let reg = self.use_value(param, CallingConvention::SCRATCH_LHS)?;
                self.emit(AsmInst::Sw(reg, i as i32 * WORD_SIZE, sp));
                self.alloc.unpin_all();
            }
        }

        // Nothing but values needed afterwards is worth saving
        if self.ctx.options.release_dead_values {
            self.alloc.release_dead(self.liveness.live_out(self.pc));
        }
        let saves = self.alloc.on_call().map_err(|e| self.exhausted(e))?;
        for (reg, offset) in saves {
            self.emit(AsmInst::Sw(reg, offset * WORD_SIZE, CallingConvention::FRAME_PTR));
        }

        self.emit(AsmInst::Jal(symbol(&callee)));
        if nargs > 0 {
            self.emit(AsmInst::Addiu(sp, sp, bytes));
        }

        if let Some(dst) = quad.dst_name() {
            let dest = self.def_name(dst)?;
            self.emit(AsmInst::Move(dest.reg, CallingConvention::RETURN_VALUE));
            self.finish_def(dest);
            self.mark_string(dst, false);
        }
        Ok(())
    }
}
