mod integration_tests;

use crate::{generate, generate_with_options, CodegenOptions};
use tacc_common::CodegenError;
use tacc_ir::TacProgram;

fn parse(text: &str) -> TacProgram {
    text.parse().unwrap()
}

fn compile(text: &str) -> String {
    generate(&parse(text)).unwrap()
}

fn compile_with(text: &str, options: CodegenOptions) -> String {
    generate_with_options(&parse(text), &options).unwrap()
}

fn compile_err(text: &str) -> CodegenError {
    generate(&parse(text)).unwrap_err()
}

/// Assert that `expected` appears as consecutive lines of `asm`
fn assert_sequence(asm: &str, expected: &[&str]) {
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let found = lines.windows(expected.len()).any(|w| w == expected);
    assert!(found, "sequence {expected:#?} not found in:\n{asm}");
}

/// Frame size reserved by the prologue of `function`
fn frame_size(asm: &str, function: &str) -> i32 {
    let mut lines = asm.lines().map(str::trim);
    let header = format!("{function}:");
    lines.find(|l| *l == header).unwrap();
    let alloc = lines.next().unwrap();
    let size = alloc.strip_prefix("addiu $sp, $sp, -").unwrap();
    size.parse().unwrap()
}
