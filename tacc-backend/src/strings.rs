//! Program-wide string literal pool

use std::collections::HashMap;
use tacc_codegen::AsmWriter;
use tacc_ir::operand::escape;

/// Interns string literals and assigns them `str_<n>` labels in first-seen
/// order. Equal literals share one label.
#[derive(Debug, Clone, Default)]
pub struct StringPool {
    labels: HashMap<String, String>,
    entries: Vec<(String, String)>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label of `value`, interning it on first use
    pub fn intern(&mut self, value: &str) -> String {
        if let Some(label) = self.labels.get(value) {
            return label.clone();
        }
        let label = format!("str_{}", self.entries.len());
        self.labels.insert(value.to_string(), label.clone());
        self.entries.push((label.clone(), value.to_string()));
        label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit the `.data` section with one `.asciiz` entry per literal
    pub fn emit(&self, out: &mut AsmWriter) {
        if self.entries.is_empty() {
            return;
        }
        out.data();
        for (label, value) in &self.entries {
            out.emit_raw(&format!("{label}: .asciiz \"{}\"", escape(value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_equal_literals_share_a_label() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern("hola"), "str_0");
        assert_eq!(pool.intern("mundo"), "str_1");
        assert_eq!(pool.intern("hola"), "str_0");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_data_section_escapes() {
        let mut pool = StringPool::new();
        pool.intern("a \"b\"\n");
        let mut out = AsmWriter::new();
        pool.emit(&mut out);
        assert_eq!(out.finish(), ".data\nstr_0: .asciiz \"a \\\"b\\\"\\n\"\n");
    }

    #[test]
    fn test_carriage_return_stays_on_one_line() {
        let mut pool = StringPool::new();
        pool.intern("a\r\nb");
        let mut out = AsmWriter::new();
        pool.emit(&mut out);
        assert_eq!(out.finish(), ".data\nstr_0: .asciiz \"a\\r\\nb\"\n");
    }

    #[test]
    fn test_empty_pool_emits_nothing() {
        let mut out = AsmWriter::new();
        StringPool::new().emit(&mut out);
        assert!(out.is_empty());
    }
}
