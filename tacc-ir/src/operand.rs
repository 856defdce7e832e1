//! Operand kinds of a quadruple

use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Const {
    Int(i32),
    Str(String),
    Bool(bool),
    Null,
}

impl Const {
    /// Integer value of a non-string literal (`true` is 1, `null` is 0)
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Const::Int(n) => Some(*n),
            Const::Bool(b) => Some(i32::from(*b)),
            Const::Null => Some(0),
            Const::Str(_) => None,
        }
    }

    /// Truth value when used as a branch condition
    pub fn is_truthy(&self) -> bool {
        match self {
            Const::Int(n) => *n != 0,
            Const::Bool(b) => *b,
            Const::Null => false,
            // A string literal evaluates to its (non-null) pool address
            Const::Str(_) => true,
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(n) => write!(f, "{n}"),
            Const::Str(s) => write!(f, "\"{}\"", escape(s)),
            Const::Bool(b) => write!(f, "{b}"),
            Const::Null => write!(f, "null"),
        }
    }
}

/// Escape a literal for its quoted textual form
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}

/// A quadruple operand. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Integer, string, boolean or null literal
    Const(Const),
    /// Variable or compiler temporary, unique per function
    Name(String),
    /// `[base±k]`, k in words
    FrameAddr { base: String, offset: i32 },
    /// Branch target or call target
    Label(String),
}

impl Operand {
    pub fn int(n: i32) -> Self {
        Operand::Const(Const::Int(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Operand::Const(Const::Str(s.into()))
    }

    pub fn name(n: impl Into<String>) -> Self {
        Operand::Name(n.into())
    }

    pub fn label(l: impl Into<String>) -> Self {
        Operand::Label(l.into())
    }

    /// `[fp+offset]`
    pub fn fp(offset: i32) -> Self {
        Operand::FrameAddr { base: "fp".to_string(), offset }
    }

    /// The variable name, if this operand is one
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&Const> {
        match self {
            Operand::Const(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_frame_addr(&self) -> bool {
        matches!(self, Operand::FrameAddr { .. })
    }

    /// Text of a label-like operand (label, name or string literal)
    pub fn label_text(&self) -> Option<&str> {
        match self {
            Operand::Label(l) | Operand::Name(l) => Some(l),
            Operand::Const(Const::Str(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(c) => write!(f, "{c}"),
            Operand::Name(n) => write!(f, "{n}"),
            Operand::FrameAddr { base, offset } => {
                if *offset < 0 {
                    write!(f, "[{base}{offset}]")
                } else {
                    write!(f, "[{base}+{offset}]")
                }
            }
            Operand::Label(l) => write!(f, "{l}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_display() {
        assert_eq!(Operand::fp(2).to_string(), "[fp+2]");
        assert_eq!(Operand::fp(-1).to_string(), "[fp-1]");
        assert_eq!(Operand::int(-7).to_string(), "-7");
        assert_eq!(Operand::string("a \"b\"\n").to_string(), r#""a \"b\"\n""#);
        assert_eq!(Operand::Const(Const::Null).to_string(), "null");
    }

    #[test]
    fn test_truthiness() {
        assert!(Const::Int(3).is_truthy());
        assert!(!Const::Int(0).is_truthy());
        assert!(!Const::Null.is_truthy());
        assert!(!Const::Bool(false).is_truthy());
        assert_eq!(Const::Bool(true).as_int(), Some(1));
        assert_eq!(Const::Str("x".into()).as_int(), None);
    }
}
