//! Copies, frame and heap memory access, address arithmetic and allocation

use super::InstructionSelector;
use tacc_codegen::{AsmInst, CallingConvention, Syscall};
use tacc_common::CodegenError;
use tacc_ir::{Const, OpCode, Operand, Quad};

impl InstructionSelector<'_> {
    pub(super) fn select_assign(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let src = self.required(&quad.a1, "source")?;
        let dst = self.dst_of(quad)?;

        match src {
            Operand::Const(Const::Str(s)) => {
                let label = self.strings.intern(s);
                let dest = self.def_name(dst)?;
                self.emit(AsmInst::La(dest.reg, label));
                self.finish_def(dest);
                self.mark_string(dst, true);
            }
            Operand::Const(c) => {
                let value = c
                    .as_int()
                    .ok_or_else(|| self.malformed(format!("cannot assign {c}")))?;
                let dest = self.def_name(dst)?;
                self.emit(AsmInst::Li(dest.reg, value));
                self.finish_def(dest);
                self.mark_string(dst, false);
            }
            Operand::Name(name) => {
                let reg = self.use_name(name, CallingConvention::SCRATCH_LHS)?;
                let is_string = self.string_values.contains(name);
                let dest = self.def_name(dst)?;
                if dest.reg != reg {
                    self.emit(AsmInst::Move(dest.reg, reg));
                }
                self.finish_def(dest);
                self.mark_string(dst, is_string);
            }
            // Reading a frame slot is a load
            Operand::FrameAddr { .. } => {
                let offset = self.frame_offset(src)?;
                let dest = self.def_name(dst)?;
                self.emit(AsmInst::Lw(dest.reg, offset, CallingConvention::FRAME_PTR));
                self.finish_def(dest);
                self.mark_string(dst, false);
            }
            Operand::Label(l) => return Err(self.malformed(format!("cannot assign label '{l}'"))),
        }
        Ok(())
    }

    pub(super) fn select_load(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let addr = self.required(&quad.a1, "address")?;
        let dst = self.dst_of(quad)?;

        if addr.is_frame_addr() {
            let offset = self.frame_offset(addr)?;
            let dest = self.def_name(dst)?;
            self.emit(AsmInst::Lw(dest.reg, offset, CallingConvention::FRAME_PTR));
            self.finish_def(dest);
        } else {
            let base = self.use_value(addr, CallingConvention::SCRATCH_LHS)?;
            let dest = self.def_name(dst)?;
            self.emit(AsmInst::Lw(dest.reg, 0, base));
            self.finish_def(dest);
        }
        self.mark_string(dst, false);
        Ok(())
    }

    pub(super) fn select_store(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let value = self.required(&quad.a1, "value")?;
        let addr = self.required(&quad.a2, "address")?;

        let reg = self.use_value(value, CallingConvention::SCRATCH_LHS)?;
        if addr.is_frame_addr() {
            let offset = self.frame_offset(addr)?;
            self.emit(AsmInst::Sw(reg, offset, CallingConvention::FRAME_PTR));
        } else {
            let base = self.use_value(addr, CallingConvention::SCRATCH_RHS)?;
            self.emit(AsmInst::Sw(reg, 0, base));
        }
        Ok(())
    }

    /// `addr_field base, k -> d` and `addr_index base, i -> d`
    pub(super) fn select_address(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let base_op = self.required(&quad.a1, "base address")?;
        let offset_op = self.required(&quad.a2, "offset")?;
        let dst = self.dst_of(quad)?;

        let base = self.use_value(base_op, CallingConvention::SCRATCH_LHS)?;
        match offset_op {
            Operand::Const(Const::Int(k)) => {
                let bytes = self.scaled(*k, "field offset")?;
                if i16::try_from(bytes).is_ok() {
                    let dest = self.def_name(dst)?;
                    self.emit(AsmInst::Addiu(dest.reg, base, bytes));
                    self.finish_def(dest);
                } else {
                    let wide = CallingConvention::SCRATCH_RHS;
                    self.emit(AsmInst::Li(wide, bytes));
                    let dest = self.def_name(dst)?;
                    self.emit(AsmInst::Addu(dest.reg, base, wide));
                    self.finish_def(dest);
                }
            }
            Operand::Name(_) if quad.op == OpCode::AddrIndex => {
                let index = self.use_value(offset_op, CallingConvention::SCRATCH_RHS)?;
                let scaled = CallingConvention::SCRATCH_RHS;
                self.emit(AsmInst::Sll(scaled, index, 2));
                let dest = self.def_name(dst)?;
                self.emit(AsmInst::Addu(dest.reg, base, scaled));
                self.finish_def(dest);
            }
            other => {
                return Err(self.malformed(format!(
                    "{} expects a word offset, found {other}",
                    quad.op.as_str()
                )));
            }
        }
        self.mark_string(dst, false);
        Ok(())
    }

    /// `alloc T -> d` and `alloc_array n -> d`, both served by `sbrk`
    pub(super) fn select_alloc(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        let size = self.required(&quad.a1, "size")?;
        let dst = self.dst_of(quad)?;
        let arg = CallingConvention::SYSCALL_ARG;

        match (quad.op, size) {
            (OpCode::Alloc, Operand::Label(type_name)) => {
                let words = self.ctx.layouts.get(type_name).copied().ok_or_else(|| {
                    self.malformed(format!("no layout known for type '{type_name}'"))
                })?;
                let words = i32::try_from(words).map_err(|_| {
                    CodegenError::exhausted(self.pos(), format!("layout '{type_name}' of {words} word(s) is out of range"))
                })?;
                let bytes = self.scaled(words, "allocation")?;
                self.emit(AsmInst::Li(arg, bytes));
            }
            (_, Operand::Const(Const::Int(words))) if *words >= 0 => {
                let bytes = self.scaled(*words, "allocation")?;
                self.emit(AsmInst::Li(arg, bytes));
            }
            (OpCode::AllocArray, Operand::Name(_)) => {
                let count = self.use_value(size, CallingConvention::SCRATCH_LHS)?;
                self.emit(AsmInst::Sll(arg, count, 2));
            }
            (op, other) => {
                return Err(self.malformed(format!("{} cannot size {other}", op.as_str())));
            }
        }
        self.out.emit_all(Syscall::Sbrk.invoke());

        let dest = self.def_name(dst)?;
        self.emit(AsmInst::Move(dest.reg, CallingConvention::RETURN_VALUE));
        self.finish_def(dest);
        self.mark_string(dst, false);
        Ok(())
    }
}
