//! Instruction positions for error reporting
//! 
//! Code generation failures are reported against the function being lowered
//! and the 0-based index of the offending quadruple inside that function.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a quadruple inside a segmented function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuadPos {
    pub function: String,
    pub index: usize,
}

impl QuadPos {
    pub fn new(function: &str, index: usize) -> Self {
        Self {
            function: function.to_string(),
            index,
        }
    }
}

impl fmt::Display for QuadPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.function, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let pos = QuadPos::new("fact", 7);
        assert_eq!(pos.to_string(), "fact#7");
    }
}
