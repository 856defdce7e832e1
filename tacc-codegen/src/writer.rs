//! Assembly writer
//! 
//! Accumulates output lines and tracks whether code or static data is being
//! emitted, so a section directive is only written when the section changes.

use crate::asm::AsmInst;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Text,
    Data,
}

impl Section {
    pub fn directive(&self) -> &'static str {
        match self {
            Section::Text => ".text",
            Section::Data => ".data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Section(Section),
    Label(String),
    Inst(String),
    Raw(String),
}

#[derive(Debug, Clone, Default)]
pub struct AsmWriter {
    lines: Vec<Line>,
    section: Option<Section>,
}

impl AsmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `section`, emitting the directive only on an actual change
    pub fn switch_to(&mut self, section: Section) -> &mut Self {
        if self.section != Some(section) {
            self.lines.push(Line::Section(section));
            self.section = Some(section);
        }
        self
    }

    pub fn text(&mut self) -> &mut Self {
        self.switch_to(Section::Text)
    }

    pub fn data(&mut self) -> &mut Self {
        self.switch_to(Section::Data)
    }

    pub fn section(&self) -> Option<Section> {
        self.section
    }

    /// Start a label (never indented)
    pub fn label(&mut self, name: &str) -> &mut Self {
        self.lines.push(Line::Label(name.to_string()));
        self
    }

    /// Append one indented instruction; labels are routed to `label`
    pub fn emit(&mut self, inst: AsmInst) -> &mut Self {
        match inst {
            AsmInst::Label(name) => {
                self.lines.push(Line::Label(name));
            }
            other => self.lines.push(Line::Inst(other.to_string())),
        }
        self
    }

    pub fn emit_all(&mut self, insts: impl IntoIterator<Item = AsmInst>) -> &mut Self {
        for inst in insts {
            self.emit(inst);
        }
        self
    }

    /// Append a line verbatim, without indentation
    pub fn emit_raw(&mut self, line: &str) -> &mut Self {
        self.lines.push(Line::Raw(line.to_string()));
        self
    }

    /// Concatenate another writer's output, dropping section directives that
    /// would not change the current section
    pub fn append(&mut self, other: AsmWriter) -> &mut Self {
        for line in other.lines {
            match line {
                Line::Section(section) => {
                    self.switch_to(section);
                }
                line => self.lines.push(line),
            }
        }
        self
    }

    /// Number of instruction lines (labels, directives and raw lines excluded)
    pub fn instruction_count(&self) -> usize {
        self.lines.iter().filter(|l| matches!(l, Line::Inst(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Final text: one line per entry, trailing newline
    pub fn finish(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            // Writing into a String cannot fail
            let _ = match line {
                Line::Section(section) => writeln!(out, "{}", section.directive()),
                Line::Label(name) => writeln!(out, "{name}:"),
                Line::Inst(text) => writeln!(out, "  {text}"),
                Line::Raw(text) => writeln!(out, "{text}"),
            };
        }
        out
    }
}
