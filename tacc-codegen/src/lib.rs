//! TAC Compiler - Code Generation Target
//! 
//! This crate models the MIPS target the backend emits for:
//! 
//! - Register set and assembly instructions
//! - ABI: calling convention, syscalls and the activation record (`Frame`)
//! - The assembly writer that tracks the current output section

pub mod asm;
pub mod abi;
pub mod writer;

pub use asm::{AsmInst, Reg};
pub use abi::{CallingConvention, Frame, FrameError, Syscall, WORD_SIZE};
pub use writer::{AsmWriter, Section};
