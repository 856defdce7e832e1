//! Program Lowering - Handles lowering of a whole TAC program
//! 
//! Functions are lowered one at a time, each with a fresh frame and
//! register allocator. String literals are pooled across the program and
//! emitted once, after all code.

use crate::isel::ProgramContext;
use crate::segment::{split_functions, ENTRY_FUNCTION};
use crate::strings::StringPool;
use crate::CodegenOptions;
use log::info;
use std::collections::BTreeSet;
use tacc_codegen::AsmWriter;
use tacc_common::CodegenError;
use tacc_ir::TacProgram;
use super::function::lower_function;

/// Lower a program to assembly text
pub fn lower_program(program: &TacProgram, options: &CodegenOptions) -> Result<String, CodegenError> {
    info!("Lowering TAC program with {} quad(s)", program.len());
    let units = split_functions(program)?;
    let functions: BTreeSet<String> = units.iter().map(|u| u.name.clone()).collect();

    let ctx = ProgramContext {
        functions: &functions,
        layouts: &program.layouts,
        options,
    };
    let mut strings = StringPool::new();

    let mut out = AsmWriter::new();
    out.text();
    if functions.contains(ENTRY_FUNCTION) {
        out.emit_raw(".globl main");
    }

    for unit in &units {
        let code = lower_function(unit, &ctx, &mut strings)?;
        out.append(code);
    }

    if !strings.is_empty() {
        info!("Emitting {} string literal(s)", strings.len());
    }
    strings.emit(&mut out);

    info!(
        "Lowered {} function(s) to {} instruction(s)",
        units.len(),
        out.instruction_count()
    );
    Ok(out.finish())
}
