//! Lowering - Drives code generation for a whole program
//! 
//! `module` splits the program and concatenates per-function output with
//! the string pool; `function` runs the per-function pipeline (validation,
//! liveness, frame setup, selection, prologue/epilogue).

pub mod module;
mod function;
