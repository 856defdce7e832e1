//! TAC Compiler - Common Types and Utilities
//! 
//! This crate contains the error taxonomy and instruction positions shared by
//! the IR, code generation and backend crates.

pub mod error;
pub mod position;

pub use error::{CodegenError, ParseError};
pub use position::QuadPos;
