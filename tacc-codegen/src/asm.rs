//! MIPS Assembly Instruction Definitions
//! 
//! This module defines the register model and the subset of the MIPS
//! instruction set (including assembler pseudo-instructions) the backend emits.

use std::fmt;

/// MIPS general-purpose registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reg {
    Zero,
    At,
    // Return values
    V0, V1,
    // Arguments
    A0, A1, A2, A3,
    // Temporaries (caller-saved)
    T0, T1, T2, T3, T4, T5, T6, T7, T8, T9,
    // Saved (callee-saved)
    S0, S1, S2, S3, S4, S5, S6, S7,
    K0, K1,
    Gp,
    Sp,
    Fp,
    Ra,
}

impl Reg {
    pub fn name(&self) -> &'static str {
        match self {
            Reg::Zero => "$zero",
            Reg::At => "$at",
            Reg::V0 => "$v0",
            Reg::V1 => "$v1",
            Reg::A0 => "$a0",
            Reg::A1 => "$a1",
            Reg::A2 => "$a2",
            Reg::A3 => "$a3",
            Reg::T0 => "$t0",
            Reg::T1 => "$t1",
            Reg::T2 => "$t2",
            Reg::T3 => "$t3",
            Reg::T4 => "$t4",
            Reg::T5 => "$t5",
            Reg::T6 => "$t6",
            Reg::T7 => "$t7",
            Reg::T8 => "$t8",
            Reg::T9 => "$t9",
            Reg::S0 => "$s0",
            Reg::S1 => "$s1",
            Reg::S2 => "$s2",
            Reg::S3 => "$s3",
            Reg::S4 => "$s4",
            Reg::S5 => "$s5",
            Reg::S6 => "$s6",
            Reg::S7 => "$s7",
            Reg::K0 => "$k0",
            Reg::K1 => "$k1",
            Reg::Gp => "$gp",
            Reg::Sp => "$sp",
            Reg::Fp => "$fp",
            Reg::Ra => "$ra",
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Reg::T0 | Reg::T1 | Reg::T2 | Reg::T3 | Reg::T4 | Reg::T5 | Reg::T6 | Reg::T7 | Reg::T8 | Reg::T9
        )
    }

    pub fn is_saved(&self) -> bool {
        matches!(
            self,
            Reg::S0 | Reg::S1 | Reg::S2 | Reg::S3 | Reg::S4 | Reg::S5 | Reg::S6 | Reg::S7
        )
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MIPS Assembly Instructions
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    // Arithmetic
    Addu(Reg, Reg, Reg),          // rd = rs + rt
    Subu(Reg, Reg, Reg),          // rd = rs - rt
    Mul(Reg, Reg, Reg),           // rd = rs * rt
    Div(Reg, Reg),                // lo = rs / rt, hi = rs % rt
    Mflo(Reg),
    Mfhi(Reg),
    Addiu(Reg, Reg, i32),         // rd = rs + imm

    // Logical / comparison
    Slt(Reg, Reg, Reg),           // rd = (rs < rt) ? 1 : 0
    Sltu(Reg, Reg, Reg),          // unsigned
    Sltiu(Reg, Reg, i32),         // rd = (rs < imm) ? 1 : 0 (unsigned)
    Xori(Reg, Reg, u16),
    Sll(Reg, Reg, u8),

    // Memory
    Lw(Reg, i32, Reg),            // rt = mem[base + offset]
    Sw(Reg, i32, Reg),            // mem[base + offset] = rt
    Li(Reg, i32),
    La(Reg, String),
    Move(Reg, Reg),

    // Control flow
    J(String),
    Jal(String),
    Jr(Reg),
    Bne(Reg, Reg, String),
    Syscall,

    // Assembly pseudo-instructions
    Label(String),
    Comment(String),
}

impl AsmInst {
    pub fn is_label(&self) -> bool {
        matches!(self, AsmInst::Label(_))
    }
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::Addu(rd, rs, rt) => write!(f, "addu {rd}, {rs}, {rt}"),
            AsmInst::Subu(rd, rs, rt) => write!(f, "subu {rd}, {rs}, {rt}"),
            AsmInst::Mul(rd, rs, rt) => write!(f, "mul {rd}, {rs}, {rt}"),
            AsmInst::Div(rs, rt) => write!(f, "div {rs}, {rt}"),
            AsmInst::Mflo(rd) => write!(f, "mflo {rd}"),
            AsmInst::Mfhi(rd) => write!(f, "mfhi {rd}"),
            AsmInst::Addiu(rd, rs, imm) => write!(f, "addiu {rd}, {rs}, {imm}"),

            AsmInst::Slt(rd, rs, rt) => write!(f, "slt {rd}, {rs}, {rt}"),
            AsmInst::Sltu(rd, rs, rt) => write!(f, "sltu {rd}, {rs}, {rt}"),
            AsmInst::Sltiu(rd, rs, imm) => write!(f, "sltiu {rd}, {rs}, {imm}"),
            AsmInst::Xori(rd, rs, imm) => write!(f, "xori {rd}, {rs}, {imm}"),
            AsmInst::Sll(rd, rs, shamt) => write!(f, "sll {rd}, {rs}, {shamt}"),

            AsmInst::Lw(rt, offset, base) => write!(f, "lw {rt}, {offset}({base})"),
            AsmInst::Sw(rt, offset, base) => write!(f, "sw {rt}, {offset}({base})"),
            AsmInst::Li(rd, imm) => write!(f, "li {rd}, {imm}"),
            AsmInst::La(rd, label) => write!(f, "la {rd}, {label}"),
            AsmInst::Move(rd, rs) => write!(f, "move {rd}, {rs}"),

            AsmInst::J(label) => write!(f, "j {label}"),
            AsmInst::Jal(label) => write!(f, "jal {label}"),
            AsmInst::Jr(rs) => write!(f, "jr {rs}"),
            AsmInst::Bne(rs, rt, label) => write!(f, "bne {rs}, {rt}, {label}"),
            AsmInst::Syscall => write!(f, "syscall"),

            AsmInst::Label(label) => write!(f, "{label}:"),
            AsmInst::Comment(text) => write!(f, "# {text}"),
        }
    }
}
