//! Function segmentation
//!
//! A TAC program is one flat quad list. Functions are delimited by the label
//! pair `func_<name>_entry` / `func_<name>_end`; every quad outside such a
//! pair belongs to the synthetic top-level unit `main`, which is emitted
//! first and terminates the program instead of returning.

use crate::normalize::normalize;
use log::debug;
use tacc_common::{CodegenError, QuadPos};
use tacc_ir::{OpCode, Quad, TacProgram};

/// Name of the synthetic unit holding top-level code
pub const ENTRY_FUNCTION: &str = "main";

/// One function's normalized quads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionUnit {
    pub name: String,
    pub quads: Vec<Quad>,
    /// The synthetic top-level unit, which exits instead of returning
    pub is_entry: bool,
}

impl FunctionUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), quads: Vec::new(), is_entry: false }
    }

    pub fn pos(&self, index: usize) -> QuadPos {
        QuadPos::new(&self.name, index)
    }
}

/// `func_<name>_entry` -> `<name>`
pub fn entry_name(label: &str) -> Option<&str> {
    label
        .strip_prefix("func_")?
        .strip_suffix("_entry")
        .filter(|name| !name.is_empty())
}

/// `func_<name>_end` -> `<name>`
pub fn end_name(label: &str) -> Option<&str> {
    label
        .strip_prefix("func_")?
        .strip_suffix("_end")
        .filter(|name| !name.is_empty())
}

/// Split a program into function units, top-level unit first
pub fn split_functions(program: &TacProgram) -> Result<Vec<FunctionUnit>, CodegenError> {
    let mut functions: Vec<FunctionUnit> = Vec::new();
    let mut toplevel = FunctionUnit::new(ENTRY_FUNCTION);
    toplevel.is_entry = true;
    let mut current: Option<FunctionUnit> = None;

    for (index, raw) in program.iter().enumerate() {
        let quad = normalize(raw);
        let label = match quad.op {
            OpCode::Label => quad.target(),
            _ => None,
        };

        if let Some(name) = label.and_then(entry_name) {
            if let Some(open) = &current {
                return Err(CodegenError::malformed(
                    open.pos(open.quads.len()),
                    format!("function '{name}' starts inside function '{}' (quad {index})", open.name),
                ));
            }
            current = Some(FunctionUnit::new(name));
            continue;
        }

        if let Some(name) = label.and_then(end_name) {
            match current.take() {
                Some(open) if open.name == name => functions.push(open),
                Some(open) => {
                    return Err(CodegenError::malformed(
                        open.pos(open.quads.len()),
                        format!("'func_{name}_end' closes function '{}'", open.name),
                    ));
                }
                None => {
                    return Err(CodegenError::malformed(
                        toplevel.pos(toplevel.quads.len()),
                        format!("'func_{name}_end' without a matching entry label"),
                    ));
                }
            }
            continue;
        }

        match current.as_mut() {
            Some(open) => open.quads.push(quad),
            None => toplevel.quads.push(quad),
        }
    }

    // An unterminated function runs to the end of the program
    if let Some(open) = current {
        functions.push(open);
    }

    if !toplevel.quads.is_empty() {
        if functions.iter().any(|f| f.name == ENTRY_FUNCTION) {
            return Err(CodegenError::malformed(
                toplevel.pos(0),
                "top-level code conflicts with a user function named 'main'",
            ));
        }
        functions.insert(0, toplevel);
    }

    for (i, f) in functions.iter().enumerate() {
        if functions[..i].iter().any(|g| g.name == f.name) {
            return Err(CodegenError::malformed(
                f.pos(0),
                format!("function '{}' is defined twice", f.name),
            ));
        }
    }

    debug!(
        "Split program into {} function(s): {:?}",
        functions.len(),
        functions.iter().map(|f| f.name.as_str()).collect::<Vec<_>>()
    );
    Ok(functions)
}
