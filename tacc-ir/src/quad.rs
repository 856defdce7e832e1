//! Quadruple Definitions
//! 
//! `{ op, a1, a2, dst, label }` with a closed opcode set. Which fields an
//! opcode populates:
//! 
//! | op | a1 | a2 | dst | label |
//! |---|---|---|---|---|
//! | `label` | | | | name |
//! | `goto` | | | | target |
//! | `ifgoto` | condition | | | target |
//! | `assign` | source | | name | |
//! | `load` | `[fp±k]` or pointer | | name | |
//! | `store` | value | `[fp±k]` or pointer | | |
//! | arithmetic / relational | lhs | rhs | name | |
//! | `ret` | optional value | | | |
//! | `param` | value | | | |
//! | `call` | callee | argument count | optional name | |
//! | `print` | value | | | |
//! | `addr_field` | base | field index | name | |
//! | `addr_index` | base | index | name | |
//! | `alloc` | type or word count | | name | |
//! | `alloc_array` | element count | | name | |

use crate::operand::Operand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    Label,
    Goto,
    IfGoto,
    Assign,
    Load,
    Store,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Ret,
    Param,
    Call,
    Print,
    AddrField,
    AddrIndex,
    Alloc,
    AllocArray,
}

impl OpCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpCode::Label => "label",
            OpCode::Goto => "goto",
            OpCode::IfGoto => "ifgoto",
            OpCode::Assign => "assign",
            OpCode::Load => "load",
            OpCode::Store => "store",
            OpCode::Add => "+",
            OpCode::Sub => "-",
            OpCode::Mul => "*",
            OpCode::Div => "/",
            OpCode::Mod => "%",
            OpCode::Lt => "<",
            OpCode::Le => "<=",
            OpCode::Gt => ">",
            OpCode::Ge => ">=",
            OpCode::Eq => "==",
            OpCode::Ne => "!=",
            OpCode::Ret => "ret",
            OpCode::Param => "param",
            OpCode::Call => "call",
            OpCode::Print => "print",
            OpCode::AddrField => "addr_field",
            OpCode::AddrIndex => "addr_index",
            OpCode::Alloc => "alloc",
            OpCode::AllocArray => "alloc_array",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge | OpCode::Eq | OpCode::Ne
        )
    }

    /// Opcodes printed as `op a1, a2 -> dst`
    pub fn is_three_address(&self) -> bool {
        self.is_arithmetic()
            || self.is_relational()
            || matches!(self, OpCode::AddrField | OpCode::AddrIndex)
    }

    /// Whether the opcode writes its `dst` operand
    pub fn writes_dst(&self) -> bool {
        self.is_three_address()
            || matches!(
                self,
                OpCode::Assign | OpCode::Load | OpCode::Call | OpCode::Alloc | OpCode::AllocArray
            )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OpCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "label" => OpCode::Label,
            "goto" => OpCode::Goto,
            "ifgoto" | "if_goto" => OpCode::IfGoto,
            "assign" | ":=" => OpCode::Assign,
            "load" => OpCode::Load,
            "store" => OpCode::Store,
            "+" => OpCode::Add,
            "-" => OpCode::Sub,
            "*" => OpCode::Mul,
            "/" => OpCode::Div,
            "%" => OpCode::Mod,
            "<" => OpCode::Lt,
            "<=" => OpCode::Le,
            ">" => OpCode::Gt,
            ">=" => OpCode::Ge,
            "==" => OpCode::Eq,
            "!=" => OpCode::Ne,
            "ret" => OpCode::Ret,
            "param" => OpCode::Param,
            "call" => OpCode::Call,
            "print" => OpCode::Print,
            "addr_field" => OpCode::AddrField,
            "addr_index" => OpCode::AddrIndex,
            "alloc" => OpCode::Alloc,
            "alloc_array" => OpCode::AllocArray,
            other => return Err(format!("unknown opcode '{other}'")),
        };
        Ok(op)
    }
}

/// One three-address-code instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad {
    pub op: OpCode,
    #[serde(default)]
    pub a1: Option<Operand>,
    #[serde(default)]
    pub a2: Option<Operand>,
    #[serde(default)]
    pub dst: Option<Operand>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Quad {
    pub fn new(op: OpCode) -> Self {
        Self { op, a1: None, a2: None, dst: None, label: None }
    }

    pub fn with_a1(mut self, a1: Operand) -> Self {
        self.a1 = Some(a1);
        self
    }

    pub fn with_a2(mut self, a2: Operand) -> Self {
        self.a2 = Some(a2);
        self
    }

    pub fn with_dst(mut self, dst: Operand) -> Self {
        self.dst = Some(dst);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::new(OpCode::Label).with_label(name)
    }

    pub fn goto(target: impl Into<String>) -> Self {
        Self::new(OpCode::Goto).with_label(target)
    }

    pub fn if_goto(cond: Operand, target: impl Into<String>) -> Self {
        Self::new(OpCode::IfGoto).with_a1(cond).with_label(target)
    }

    pub fn assign(src: Operand, dst: impl Into<String>) -> Self {
        Self::new(OpCode::Assign).with_a1(src).with_dst(Operand::name(dst))
    }

    pub fn load(addr: Operand, dst: impl Into<String>) -> Self {
        Self::new(OpCode::Load).with_a1(addr).with_dst(Operand::name(dst))
    }

    pub fn store(value: Operand, addr: Operand) -> Self {
        Self::new(OpCode::Store).with_a1(value).with_a2(addr)
    }

    pub fn binary(op: OpCode, lhs: Operand, rhs: Operand, dst: impl Into<String>) -> Self {
        Self::new(op).with_a1(lhs).with_a2(rhs).with_dst(Operand::name(dst))
    }

    pub fn ret(value: Option<Operand>) -> Self {
        Self { a1: value, ..Self::new(OpCode::Ret) }
    }

    pub fn param(value: Operand) -> Self {
        Self::new(OpCode::Param).with_a1(value)
    }

    pub fn call(callee: impl Into<String>, nargs: i32, dst: Option<&str>) -> Self {
        Self {
            dst: dst.map(Operand::name),
            ..Self::new(OpCode::Call)
                .with_a1(Operand::label(callee))
                .with_a2(Operand::int(nargs))
        }
    }

    pub fn print(value: Operand) -> Self {
        Self::new(OpCode::Print).with_a1(value)
    }

    /// Label name for `label` quads, branch target for `goto`/`ifgoto`
    pub fn target(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The destination name, when `dst` is a real variable
    pub fn dst_name(&self) -> Option<&str> {
        self.dst.as_ref().and_then(Operand::as_name)
    }
}

fn opt(operand: &Option<Operand>) -> String {
    operand.as_ref().map_or_else(|| "_".to_string(), |o| o.to_string())
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.label.as_deref().unwrap_or("_");
        match self.op {
            OpCode::Label => write!(f, "{label}:"),
            OpCode::Goto => write!(f, "goto {label}"),
            OpCode::IfGoto => write!(f, "if {} goto {label}", opt(&self.a1)),
            OpCode::Assign => write!(f, "{} := {}", opt(&self.dst), opt(&self.a1)),
            OpCode::Load => write!(f, "load {} -> {}", opt(&self.a1), opt(&self.dst)),
            OpCode::Store => write!(f, "store {}, {}", opt(&self.a1), opt(&self.a2)),
            OpCode::Ret => match &self.a1 {
                Some(v) => write!(f, "ret {v}"),
                None => write!(f, "ret"),
            },
            OpCode::Param => write!(f, "param {}", opt(&self.a1)),
            OpCode::Print => write!(f, "print {}", opt(&self.a1)),
            OpCode::Call => {
                write!(f, "call {}, nargs={}", opt(&self.a1), opt(&self.a2))?;
                if let Some(dst) = &self.dst {
                    write!(f, " -> {dst}")?;
                }
                Ok(())
            }
            OpCode::Alloc | OpCode::AllocArray => {
                write!(f, "{} {} -> {}", self.op, opt(&self.a1), opt(&self.dst))
            }
            _ => write!(f, "{} {}, {} -> {}", self.op, opt(&self.a1), opt(&self.a2), opt(&self.dst)),
        }
    }
}
