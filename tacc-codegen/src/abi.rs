//! MIPS ABI Implementation
//! 
//! Calling convention, syscalls and the activation record, including
//! function prologue/epilogue generation.

use crate::asm::{AsmInst, Reg};
use log::trace;
use std::collections::BTreeMap;
use thiserror::Error;

/// Bytes per word
pub const WORD_SIZE: i32 = 4;

/// Stack alignment in bytes
pub const STACK_ALIGN: u32 = 8;

/// Words below the first parameter: saved `$fp` at word 0, saved `$ra` at word 1
pub const HEADER_WORDS: i32 = 2;

/// Deepest negative word offset whose byte displacement (and the resulting
/// frame size) still fits a 16-bit immediate
pub const MAX_FRAME_SLOTS: i32 = 8188;

/// Highest parameter index whose `$fp` displacement fits a 16-bit immediate
pub const MAX_PARAM_INDEX: usize = (i16::MAX as i32 / WORD_SIZE - HEADER_WORDS) as usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame slot {0} is out of range for function '{1}'")]
    OffsetOutOfRange(i32, String),

    #[error("Parameter {0} is out of range for function '{1}'")]
    ParamOutOfRange(usize, String),
}

/// MIPS calling convention as used by the generated code
/// 
/// Register Usage:
/// - $t0-$t9: Allocatable temporaries (caller-saved)
/// - $s0-$s7: Optional allocatable pool for values live across calls (callee-saved)
/// - $v0: Return value and syscall number
/// - $a0: Syscall argument
/// - $a1-$a2: Scratch for memory-resident source operands
/// - $a3: Scratch for memory-resident destinations
/// - $sp, $fp, $ra: Stack pointer, frame pointer, return address
/// 
/// Arguments are passed on the stack: the caller reserves one word per
/// argument and stores argument *i* at `4*i($sp)`, so the callee finds it at
/// `[fp + HEADER_WORDS + i]`.
pub struct CallingConvention;

impl CallingConvention {
    /// Allocation pool in scan order
    pub const TEMPORARIES: [Reg; 10] = [
        Reg::T0, Reg::T1, Reg::T2, Reg::T3, Reg::T4,
        Reg::T5, Reg::T6, Reg::T7, Reg::T8, Reg::T9,
    ];

    /// Callee-saved pool
    pub const SAVED: [Reg; 8] = [
        Reg::S0, Reg::S1, Reg::S2, Reg::S3, Reg::S4, Reg::S5, Reg::S6, Reg::S7,
    ];

    pub const RETURN_VALUE: Reg = Reg::V0;
    pub const SYSCALL_NUMBER: Reg = Reg::V0;
    pub const SYSCALL_ARG: Reg = Reg::A0;
    pub const SCRATCH_LHS: Reg = Reg::A1;
    pub const SCRATCH_RHS: Reg = Reg::A2;
    pub const SCRATCH_DST: Reg = Reg::A3;
    pub const STACK_PTR: Reg = Reg::Sp;
    pub const FRAME_PTR: Reg = Reg::Fp;
}

/// Syscall service numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    PrintInt = 1,
    PrintString = 4,
    Sbrk = 9,
    Exit = 10,
}

impl Syscall {
    /// `li $v0, code; syscall`
    pub fn invoke(self) -> Vec<AsmInst> {
        vec![
            AsmInst::Li(CallingConvention::SYSCALL_NUMBER, self as i32),
            AsmInst::Syscall,
        ]
    }
}

/// Stack Frame Layout (activation record)
/// 
/// Offsets are in words relative to `$fp`:
/// 
/// ```text
///   fp + 2 + i  -> parameter i (pushed by the caller)
///   fp + 1      -> saved $ra
///   fp + 0      -> saved old $fp
///   fp - 1 ...  -> locals, spill slots and saved $s registers
/// ```
/// 
/// Negative slots are handed out monotonically on first use and are never
/// reused within the function.
#[derive(Debug, Clone)]
pub struct Frame {
    function: String,

    /// Highest parameter index referenced + 1
    params: usize,

    locals: u32,
    spills: u32,

    /// Named slots (locals and front-end frame references)
    slot_offsets: BTreeMap<String, i32>,

    /// Next unused negative word offset
    next_offset: i32,

    /// Callee-saved registers preserved by the prologue, with their slots
    saved_regs: Vec<(Reg, i32)>,
}

impl Frame {
    pub fn new(function: &str) -> Self {
        Self {
            function: function.to_string(),
            params: 0,
            locals: 0,
            spills: 0,
            slot_offsets: BTreeMap::new(),
            next_offset: -1,
            saved_regs: Vec::new(),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    fn take_slot(&mut self) -> Result<i32, FrameError> {
        let offset = self.next_offset;
        if -offset > MAX_FRAME_SLOTS {
            return Err(FrameError::OffsetOutOfRange(offset, self.function.clone()));
        }
        self.next_offset -= 1;
        Ok(offset)
    }

    /// Slot for a named local; the same name always gets the same slot
    pub fn allocate_local(&mut self, name: &str) -> Result<i32, FrameError> {
        if let Some(&offset) = self.slot_offsets.get(name) {
            return Ok(offset);
        }
        let offset = self.take_slot()?;
        self.locals += 1;
        self.slot_offsets.insert(name.to_string(), offset);
        trace!("Frame '{}': local '{name}' at [fp{offset}]", self.function);
        Ok(offset)
    }

    /// Anonymous slot for the register allocator
    pub fn allocate_spill(&mut self) -> Result<i32, FrameError> {
        let offset = self.take_slot()?;
        self.spills += 1;
        trace!("Frame '{}': spill slot at [fp{offset}]", self.function);
        Ok(offset)
    }

    /// Reserve a slot in which the prologue preserves a callee-saved register
    pub fn preserve_register(&mut self, reg: Reg) -> Result<i32, FrameError> {
        if let Some(&(_, offset)) = self.saved_regs.iter().find(|(r, _)| *r == reg) {
            return Ok(offset);
        }
        let offset = self.allocate_spill()?;
        self.saved_regs.push((reg, offset));
        Ok(offset)
    }

    pub fn offset_of_local(&self, name: &str) -> Option<i32> {
        self.slot_offsets.get(name).copied()
    }

    /// Word offset of parameter `index`, which is recorded as referenced
    pub fn offset_of_param(&mut self, index: usize) -> Result<i32, FrameError> {
        if index > MAX_PARAM_INDEX {
            return Err(FrameError::ParamOutOfRange(index, self.function.clone()));
        }
        self.params = self.params.max(index + 1);
        Ok(HEADER_WORDS + index as i32)
    }

    pub fn param_count(&self) -> usize {
        self.params
    }

    pub fn locals(&self) -> u32 {
        self.locals
    }

    pub fn spills(&self) -> u32 {
        self.spills
    }

    pub fn saved_regs(&self) -> &[(Reg, i32)] {
        &self.saved_regs
    }

    /// Total frame size in bytes: header plus every slot handed out,
    /// rounded up to the stack alignment
    pub fn size(&self) -> u32 {
        let words = HEADER_WORDS as u32 + self.locals + self.spills;
        let bytes = words * WORD_SIZE as u32;
        bytes.div_ceil(STACK_ALIGN) * STACK_ALIGN
    }

    /// Generate function prologue
    /// 
    /// 1. Allocates the frame
    /// 2. Saves return address and old frame pointer
    /// 3. Points `$fp` at the saved frame pointer
    /// 4. Saves used callee-saved registers
    pub fn gen_prologue(&self) -> Vec<AsmInst> {
        let size = self.size() as i32;
        let mut code = vec![
            AsmInst::Addiu(Reg::Sp, Reg::Sp, -size),
            AsmInst::Sw(Reg::Ra, size - WORD_SIZE, Reg::Sp),
            AsmInst::Sw(Reg::Fp, size - 2 * WORD_SIZE, Reg::Sp),
            AsmInst::Addiu(Reg::Fp, Reg::Sp, size - 2 * WORD_SIZE),
        ];
        for &(reg, offset) in &self.saved_regs {
            code.push(AsmInst::Sw(reg, offset * WORD_SIZE, Reg::Fp));
        }
        code
    }

    /// Generate function epilogue
    /// 
    /// Restores callee-saved registers, `$ra`, `$sp` and the caller's `$fp`,
    /// then returns.
    pub fn gen_epilogue(&self) -> Vec<AsmInst> {
        let mut code = Vec::new();
        for &(reg, offset) in self.saved_regs.iter().rev() {
            code.push(AsmInst::Lw(reg, offset * WORD_SIZE, Reg::Fp));
        }
        code.push(AsmInst::Lw(Reg::Ra, WORD_SIZE, Reg::Fp));
        code.push(AsmInst::Addiu(Reg::Sp, Reg::Fp, HEADER_WORDS * WORD_SIZE));
        code.push(AsmInst::Lw(Reg::Fp, 0, Reg::Fp));
        code.push(AsmInst::Jr(Reg::Ra));
        code
    }

    /// Program termination used instead of a return by the top-level unit
    pub fn gen_exit(&self) -> Vec<AsmInst> {
        Syscall::Exit.invoke()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_frame_is_header_only() {
        let frame = Frame::new("f");
        assert_eq!(frame.size(), 8);
    }

    #[test]
    fn test_slots_are_monotonic() {
        let mut frame = Frame::new("f");
        assert_eq!(frame.allocate_local("x").unwrap(), -1);
        assert_eq!(frame.allocate_spill().unwrap(), -2);
        assert_eq!(frame.allocate_local("y").unwrap(), -3);
        // Same name, same slot
        assert_eq!(frame.allocate_local("x").unwrap(), -1);
        assert_eq!(frame.offset_of_local("y"), Some(-3));
        assert_eq!(frame.locals(), 2);
        assert_eq!(frame.spills(), 1);
    }

    #[test]
    fn test_size_alignment() {
        let mut frame = Frame::new("f");
        for expected in [16, 16, 24, 24, 32] {
            frame.allocate_spill().unwrap();
            assert_eq!(frame.size(), expected);
            assert_eq!(frame.size() % STACK_ALIGN, 0);
        }
    }

    #[test]
    fn test_param_offsets() {
        let mut frame = Frame::new("f");
        assert_eq!(frame.offset_of_param(3).unwrap(), 5);
        assert_eq!(frame.offset_of_param(0).unwrap(), 2);
        assert_eq!(frame.param_count(), 4);
        // Parameters live above the header and never grow the frame
        assert_eq!(frame.size(), 8);
    }

    #[test]
    fn test_out_of_range_param() {
        let mut frame = Frame::new("f");
        let last = frame.offset_of_param(MAX_PARAM_INDEX).unwrap();
        assert!(last * WORD_SIZE <= i16::MAX as i32);
        assert_eq!(
            frame.offset_of_param(MAX_PARAM_INDEX + 1),
            Err(FrameError::ParamOutOfRange(MAX_PARAM_INDEX + 1, "f".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_slot() {
        let mut frame = Frame::new("big");
        for _ in 0..MAX_FRAME_SLOTS {
            frame.allocate_spill().unwrap();
        }
        assert!(matches!(frame.allocate_spill(), Err(FrameError::OffsetOutOfRange(_, _))));
        assert!(frame.size() <= 32767);
    }

    #[test]
    fn test_prologue_and_epilogue() {
        let mut frame = Frame::new("f");
        frame.allocate_spill().unwrap();
        let saved = frame.preserve_register(Reg::S0).unwrap();
        assert_eq!(saved, -2);

        let prologue = frame.gen_prologue();
        assert_eq!(
            prologue,
            vec![
                AsmInst::Addiu(Reg::Sp, Reg::Sp, -16),
                AsmInst::Sw(Reg::Ra, 12, Reg::Sp),
                AsmInst::Sw(Reg::Fp, 8, Reg::Sp),
                AsmInst::Addiu(Reg::Fp, Reg::Sp, 8),
                AsmInst::Sw(Reg::S0, -8, Reg::Fp),
            ]
        );

        let epilogue = frame.gen_epilogue();
        assert_eq!(epilogue.first(), Some(&AsmInst::Lw(Reg::S0, -8, Reg::Fp)));
        assert_eq!(epilogue.last(), Some(&AsmInst::Jr(Reg::Ra)));
    }

    #[test]
    fn test_exit_sequence() {
        let frame = Frame::new("main");
        assert_eq!(frame.gen_exit(), vec![AsmInst::Li(Reg::V0, 10), AsmInst::Syscall]);
    }
}
