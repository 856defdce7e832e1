//! TAC programs

use crate::quad::Quad;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An ordered quadruple sequence. Function bodies are delimited by
/// `func_<name>_entry` / `func_<name>_end` labels; anything outside such a
/// pair is top-level code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacProgram {
    pub code: Vec<Quad>,

    /// Size in words of each type that `alloc` may instantiate
    #[serde(default)]
    pub layouts: BTreeMap<String, u32>,
}

impl TacProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quads(code: Vec<Quad>) -> Self {
        Self { code, layouts: BTreeMap::new() }
    }

    /// Append a quadruple
    pub fn emit(&mut self, quad: Quad) -> &mut Self {
        self.code.push(quad);
        self
    }

    /// Declare the object size of an allocatable type
    pub fn with_layout(mut self, type_name: impl Into<String>, words: u32) -> Self {
        self.layouts.insert(type_name.into(), words);
        self
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quad> {
        self.code.iter()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a TacProgram {
    type Item = &'a Quad;
    type IntoIter = std::slice::Iter<'a, Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.code.iter()
    }
}

impl fmt::Display for TacProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, words) in &self.layouts {
            writeln!(f, ".layout {name} {words}")?;
        }
        for quad in &self.code {
            writeln!(f, "{quad}")?;
        }
        Ok(())
    }
}
