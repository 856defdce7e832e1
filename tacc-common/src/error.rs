//! Error handling for the TAC compiler
//! 
//! Every code generation failure aborts the enclosing function with the
//! position of the quadruple that caused it. Nothing is emitted as a
//! placeholder comment.

use crate::position::QuadPos;
use thiserror::Error;

/// Code generation error taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Unsupported operation '{op}' at {pos}")]
    UnsupportedOperation {
        pos: QuadPos,
        op: String,
    },

    #[error("Malformed instruction at {pos}: {message}")]
    MalformedInstruction {
        pos: QuadPos,
        message: String,
    },

    #[error("Unresolved label '{label}' at {pos}")]
    UnresolvedLabel {
        pos: QuadPos,
        label: String,
    },

    #[error("Allocator exhausted at {pos}: {message}")]
    AllocatorExhausted {
        pos: QuadPos,
        message: String,
    },
}

impl CodegenError {
    pub fn unsupported(pos: QuadPos, op: impl Into<String>) -> Self {
        CodegenError::UnsupportedOperation { pos, op: op.into() }
    }

    pub fn malformed(pos: QuadPos, message: impl Into<String>) -> Self {
        CodegenError::MalformedInstruction { pos, message: message.into() }
    }

    pub fn unresolved(pos: QuadPos, label: impl Into<String>) -> Self {
        CodegenError::UnresolvedLabel { pos, label: label.into() }
    }

    pub fn exhausted(pos: QuadPos, message: impl Into<String>) -> Self {
        CodegenError::AllocatorExhausted { pos, message: message.into() }
    }

    /// Position of the offending quadruple
    pub fn pos(&self) -> &QuadPos {
        match self {
            CodegenError::UnsupportedOperation { pos, .. }
            | CodegenError::MalformedInstruction { pos, .. }
            | CodegenError::UnresolvedLabel { pos, .. }
            | CodegenError::AllocatorExhausted { pos, .. } => pos,
        }
    }
}

/// Error raised by the textual TAC reader (line is 1-based)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("TAC parse error at line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_position() {
        let err = CodegenError::unresolved(QuadPos::new("loop", 3), "L9");
        assert_eq!(err.pos().index, 3);
        assert_eq!(err.to_string(), "Unresolved label 'L9' at loop#3");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(12, "expected '->'");
        assert_eq!(err.to_string(), "TAC parse error at line 12: expected '->'");
    }
}
