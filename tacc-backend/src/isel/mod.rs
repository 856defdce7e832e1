//! Instruction selection
//!
//! Walks one function's normalized quads in order and emits MIPS for each,
//! asking the register allocator for a home for every name it touches.
//! Values that live in memory are staged through the scratch registers
//! (`$a1`/`$a2` for sources, `$a3` for destinations).

mod arith;
mod call;
mod control;
mod io;
mod memory;

use crate::liveness::Liveness;
use crate::regmgmt::{Eviction, RegisterAllocator};
use crate::segment::FunctionUnit;
use crate::strings::StringPool;
use crate::CodegenOptions;
use log::trace;
use std::collections::{BTreeMap, BTreeSet};
use tacc_codegen::abi::HEADER_WORDS;
use tacc_codegen::{AsmInst, AsmWriter, CallingConvention, Frame, FrameError, Reg, WORD_SIZE};
use tacc_common::{CodegenError, QuadPos};
use tacc_ir::{Const, OpCode, Operand, Quad};

/// Program-wide facts shared by every function's selector
pub(crate) struct ProgramContext<'a> {
    /// Names of all function units
    pub functions: &'a BTreeSet<String>,
    /// Object layouts for `alloc`, in words
    pub layouts: &'a BTreeMap<String, u32>,
    pub options: &'a CodegenOptions,
}

/// Where a computed value has to end up
#[derive(Debug, Clone, Copy)]
struct Dest {
    reg: Reg,
    /// Memory-resident destination: `reg` is the scratch register and the
    /// value is stored here afterwards
    slot: Option<i32>,
}

pub(crate) struct InstructionSelector<'a> {
    unit: &'a FunctionUnit,
    liveness: &'a Liveness,
    ctx: &'a ProgramContext<'a>,
    strings: &'a mut StringPool,
    alloc: RegisterAllocator,
    out: AsmWriter,

    /// Arguments of the call being assembled, in declaration order
    pending_params: Vec<Operand>,

    /// Names currently holding a string literal's address, printed with
    /// the print-string service
    string_values: BTreeSet<String>,

    /// Names whose value is needed after some call
    crossing: BTreeSet<String>,

    epilogue: String,
    pc: usize,
}

/// Assembly symbol for a function name
pub(crate) fn symbol(function: &str) -> String {
    function.replace('.', "_")
}

pub(crate) fn epilogue_label(function: &str) -> String {
    format!("{}_epilogue", symbol(function))
}

impl<'a> InstructionSelector<'a> {
    pub(crate) fn new(
        unit: &'a FunctionUnit,
        liveness: &'a Liveness,
        ctx: &'a ProgramContext<'a>,
        strings: &'a mut StringPool,
        frame: Frame,
    ) -> Self {
        let crossing = liveness.live_across_calls(&unit.quads);
        Self {
            unit,
            liveness,
            ctx,
            strings,
            alloc: RegisterAllocator::new(frame, ctx.options.saved_registers),
            out: AsmWriter::new(),
            pending_params: Vec::new(),
            string_values: BTreeSet::new(),
            crossing,
            epilogue: epilogue_label(&unit.name),
            pc: 0,
        }
    }

    /// Select the whole function body. Returns the body and the final frame.
    pub(crate) fn run(mut self) -> Result<(AsmWriter, Frame), CodegenError> {
        let unit = self.unit;
        for (pc, quad) in unit.quads.iter().enumerate() {
            self.pc = pc;
            trace!("{}#{pc}: {quad}", unit.name);
            self.select(quad)?;

            self.alloc.unpin_all();
            if self.ctx.options.release_dead_values {
                self.alloc.release_dead(self.liveness.live_out(pc));
            }
        }

        if !self.pending_params.is_empty() {
            return Err(CodegenError::malformed(
                unit.pos(unit.quads.len().saturating_sub(1)),
                format!("{} param(s) not consumed by a call", self.pending_params.len()),
            ));
        }

        let pos = self.pos();
        let frame = self
            .alloc
            .into_frame()
            .map_err(|e| CodegenError::exhausted(pos, e.to_string()))?;
        Ok((self.out, frame))
    }

    fn select(&mut self, quad: &Quad) -> Result<(), CodegenError> {
        match quad.op {
            OpCode::Label => self.select_label(quad),
            OpCode::Goto => self.select_goto(quad),
            OpCode::IfGoto => self.select_if_goto(quad),
            OpCode::Ret => self.select_ret(quad),
            OpCode::Assign => self.select_assign(quad),
            OpCode::Load => self.select_load(quad),
            OpCode::Store => self.select_store(quad),
            OpCode::AddrField | OpCode::AddrIndex => self.select_address(quad),
            OpCode::Alloc | OpCode::AllocArray => self.select_alloc(quad),
            OpCode::Param => self.select_param(quad),
            OpCode::Call => self.select_call(quad),
            OpCode::Print => self.select_print(quad),
            op if op.is_arithmetic() => self.select_arith(quad),
            op if op.is_relational() => self.select_relational(quad),
            op => Err(CodegenError::unsupported(self.pos(), op.as_str())),
        }
    }

    fn pos(&self) -> QuadPos {
        self.unit.pos(self.pc)
    }

    fn malformed(&self, message: impl Into<String>) -> CodegenError {
        CodegenError::malformed(self.pos(), message)
    }

    fn exhausted(&self, err: FrameError) -> CodegenError {
        CodegenError::exhausted(self.pos(), err.to_string())
    }

    /// `words * WORD_SIZE`, or an error naming `what` when it overflows
    fn scaled(&self, words: i32, what: &str) -> Result<i32, CodegenError> {
        words.checked_mul(WORD_SIZE).ok_or_else(|| {
            CodegenError::exhausted(self.pos(), format!("{what} of {words} word(s) is out of range"))
        })
    }

    fn is_last(&self) -> bool {
        self.pc + 1 == self.unit.quads.len()
    }

    fn emit(&mut self, inst: AsmInst) {
        self.out.emit(inst);
    }

    fn survives_call(&self, name: &str) -> bool {
        self.ctx.options.saved_registers && self.crossing.contains(name)
    }

    fn save_evicted(&mut self, evicted: Option<Eviction>) {
        if let Some(ev) = evicted {
            self.emit(AsmInst::Sw(ev.reg, ev.offset * WORD_SIZE, CallingConvention::FRAME_PTR));
        }
    }

    /// Register holding the current value of `name`, reloading it from its
    /// slot if needed. Memory-resident names are loaded into `scratch`.
    fn use_name(&mut self, name: &str, scratch: Reg) -> Result<Reg, CodegenError> {
        self.alloc.pin(name);
        let survives = self.survives_call(name);
        let placement = self
            .alloc
            .acquire(name, survives)
            .map_err(|e| self.exhausted(e))?;
        self.save_evicted(placement.evicted);

        match (placement.reg, placement.spill_offset) {
            (Some(reg), Some(offset)) => {
                self.emit(AsmInst::Lw(reg, offset * WORD_SIZE, CallingConvention::FRAME_PTR));
                Ok(reg)
            }
            (Some(reg), None) => Ok(reg),
            (None, Some(offset)) => {
                self.emit(AsmInst::Lw(scratch, offset * WORD_SIZE, CallingConvention::FRAME_PTR));
                Ok(scratch)
            }
            (None, None) => Err(self.malformed(format!("no home for '{name}'"))),
        }
    }

    /// Register holding a literal or a name's value
    fn use_value(&mut self, operand: &Operand, scratch: Reg) -> Result<Reg, CodegenError> {
        match operand {
            Operand::Name(name) => self.use_name(name, scratch),
            Operand::Const(Const::Str(s)) => {
                let label = self.strings.intern(s);
                self.emit(AsmInst::La(scratch, label));
                Ok(scratch)
            }
            Operand::Const(c) => match c.as_int() {
                Some(0) => Ok(Reg::Zero),
                Some(n) => {
                    self.emit(AsmInst::Li(scratch, n));
                    Ok(scratch)
                }
                None => Err(self.malformed(format!("literal {c} has no integer value"))),
            },
            other => Err(self.malformed(format!("expected a value, found {other}"))),
        }
    }

    fn required<'q>(&self, operand: &'q Option<Operand>, what: &str) -> Result<&'q Operand, CodegenError> {
        operand
            .as_ref()
            .ok_or_else(|| self.malformed(format!("missing {what}")))
    }

    fn dst_of<'q>(&self, quad: &'q Quad) -> Result<&'q str, CodegenError> {
        quad.dst_name()
            .ok_or_else(|| self.malformed(format!("{} needs a destination name", quad.op.as_str())))
    }

    /// Home for a value about to be written to `name`
    fn def_name(&mut self, name: &str) -> Result<Dest, CodegenError> {
        self.alloc.pin(name);
        let survives = self.survives_call(name);
        let placement = self
            .alloc
            .acquire(name, survives)
            .map_err(|e| self.exhausted(e))?;
        self.save_evicted(placement.evicted);

        match (placement.reg, placement.spill_offset) {
            (Some(reg), _) => Ok(Dest { reg, slot: None }),
            (None, Some(offset)) => Ok(Dest { reg: CallingConvention::SCRATCH_DST, slot: Some(offset) }),
            (None, None) => Err(self.malformed(format!("no home for '{name}'"))),
        }
    }

    /// Write back a memory-resident destination
    fn finish_def(&mut self, dest: Dest) {
        if let Some(offset) = dest.slot {
            self.emit(AsmInst::Sw(dest.reg, offset * WORD_SIZE, CallingConvention::FRAME_PTR));
        }
    }

    /// Byte offset from `$fp` of a `[fp±k]` operand
    fn frame_offset(&mut self, operand: &Operand) -> Result<i32, CodegenError> {
        match operand {
            Operand::FrameAddr { base, offset } if base == "fp" => {
                let word = if *offset >= HEADER_WORDS {
                    let index = (*offset - HEADER_WORDS) as usize;
                    self.alloc.frame_mut().offset_of_param(index).map_err(|e| self.exhausted(e))?
                } else {
                    *offset
                };
                self.scaled(word, "frame offset")
            }
            other => Err(self.malformed(format!("expected a frame address, found {other}"))),
        }
    }

    /// Store every live register-resident name and drop all bindings, so
    /// each block starts with its values in their slots
    fn flush_block(&mut self) -> Result<(), CodegenError> {
        let keep_dead = !self.ctx.options.release_dead_values;
        let liveness = self.liveness;
        let live = liveness.live_out(self.pc);
        let stores = self.alloc.flush(live, keep_dead).map_err(|e| self.exhausted(e))?;
        for (reg, offset) in stores {
            self.emit(AsmInst::Sw(reg, offset * WORD_SIZE, CallingConvention::FRAME_PTR));
        }
        Ok(())
    }

    fn mark_string(&mut self, name: &str, is_string: bool) {
        if is_string {
            self.string_values.insert(name.to_string());
        } else {
            self.string_values.remove(name);
        }
    }
}
