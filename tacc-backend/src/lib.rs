//! TAC Compiler - Backend
//! 
//! This crate lowers a three-address-code program to MIPS assembly text:
//! segmentation into functions, quad normalization, liveness analysis,
//! register allocation with spilling, and instruction selection.

pub mod normalize;
pub mod segment;
pub mod liveness;
pub mod strings;
pub mod regmgmt;
mod isel;
mod lower;

use serde::{Deserialize, Serialize};
use tacc_common::CodegenError;
use tacc_ir::TacProgram;

pub use liveness::Liveness;
pub use segment::{split_functions, FunctionUnit};
pub use strings::StringPool;

/// Options for code generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenOptions {
    /// Give names that are live across a call a callee-saved `$s` register
    /// (or a frame slot once those run out) instead of a `$t` register
    pub saved_registers: bool,

    /// Return a name's register to the pool as soon as liveness says the
    /// name is no longer needed
    pub release_dead_values: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            saved_registers: false,
            release_dead_values: true,
        }
    }
}

/// Lower a TAC program to assembly text with default options
pub fn generate(program: &TacProgram) -> Result<String, CodegenError> {
    generate_with_options(program, &CodegenOptions::default())
}

/// Lower a TAC program to assembly text
pub fn generate_with_options(
    program: &TacProgram,
    options: &CodegenOptions,
) -> Result<String, CodegenError> {
    lower::module::lower_program(program, options)
}

#[cfg(test)]
mod tests;
