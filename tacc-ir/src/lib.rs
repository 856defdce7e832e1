//! TAC Compiler - Intermediate Representation
//! 
//! The quadruple model handed over by the front end: operands, opcodes,
//! quadruples and whole programs, plus the canonical textual form
//! (`t0 := 5`, `+ t0, t1 -> t2`, `store t1, [fp-1]`, ...).

pub mod operand;
pub mod quad;
pub mod program;
pub mod parser;

pub use operand::{Const, Operand};
pub use quad::{OpCode, Quad};
pub use program::TacProgram;
pub use parser::{parse_operand, parse_quad};
