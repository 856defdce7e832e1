//! Quad normalization
//!
//! Front ends disagree on where a few operands live: branch targets show up
//! in `dst` or `a2` instead of `label`, call and allocation targets arrive as
//! plain names or quoted strings. `normalize` rewrites every such quad into
//! the one canonical shape the rest of the backend reads, and `validate`
//! checks the fixed operand arity of each opcode.

use tacc_common::{CodegenError, QuadPos};
use tacc_ir::{Const, OpCode, Operand, Quad};

/// Rewrite a quad into canonical form. Normalizing twice changes nothing.
pub fn normalize(quad: &Quad) -> Quad {
    let mut q = quad.clone();
    match q.op {
        OpCode::Label | OpCode::Goto => {
            if q.label.is_none() {
                if let Some(target) = take_label(&mut q.dst).or_else(|| take_label(&mut q.a1)) {
                    q.label = Some(target);
                }
            }
        }
        OpCode::IfGoto => {
            if q.label.is_none() {
                if let Some(target) = take_label(&mut q.dst).or_else(|| take_label(&mut q.a2)) {
                    q.label = Some(target);
                }
            }
        }
        OpCode::Call | OpCode::Alloc => {
            q.a1 = q.a1.map(|target| match target {
                Operand::Name(n) | Operand::Const(Const::Str(n)) => Operand::Label(n),
                other => other,
            });
        }
        OpCode::Ret => {
            if matches!(q.a1, Some(Operand::Const(Const::Null))) {
                q.a1 = None;
            }
        }
        _ => {}
    }
    q
}

fn take_label(slot: &mut Option<Operand>) -> Option<String> {
    let text = slot.as_ref()?.label_text()?.to_string();
    *slot = None;
    Some(text)
}

/// Check operand arity and kinds for a normalized quad
pub fn validate(quad: &Quad, pos: &QuadPos) -> Result<(), CodegenError> {
    let malformed = |message: String| CodegenError::malformed(pos.clone(), message);
    let op = quad.op;

    // `.asciiz` ends at the first NUL
    for operand in [&quad.a1, &quad.a2].into_iter().flatten() {
        if let Operand::Const(Const::Str(s)) = operand {
            if s.contains('\0') {
                return Err(malformed(format!("{} string literal contains a NUL character", op.as_str())));
            }
        }
    }

    match op {
        OpCode::Label | OpCode::Goto => {
            require_label(quad).map_err(malformed)?;
            forbid(op, "a1", &quad.a1).map_err(malformed)?;
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            forbid(op, "dst", &quad.dst).map_err(malformed)?;
        }
        OpCode::IfGoto => {
            require_label(quad).map_err(malformed)?;
            value(op, "a1", &quad.a1).map_err(malformed)?;
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            forbid(op, "dst", &quad.dst).map_err(malformed)?;
        }
        OpCode::Assign => {
            match &quad.a1 {
                Some(Operand::FrameAddr { .. }) => frame_addr(op, &quad.a1).map_err(malformed)?,
                _ => value(op, "a1", &quad.a1).map_err(malformed)?,
            }
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            destination(op, quad).map_err(malformed)?;
        }
        OpCode::Load => {
            address(op, "a1", &quad.a1).map_err(malformed)?;
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            destination(op, quad).map_err(malformed)?;
        }
        OpCode::Store => {
            value(op, "a1", &quad.a1).map_err(malformed)?;
            address(op, "a2", &quad.a2).map_err(malformed)?;
            forbid(op, "dst", &quad.dst).map_err(malformed)?;
        }
        _ if op.is_arithmetic() || op.is_relational() => {
            value(op, "a1", &quad.a1).map_err(malformed)?;
            value(op, "a2", &quad.a2).map_err(malformed)?;
            destination(op, quad).map_err(malformed)?;
            for operand in [&quad.a1, &quad.a2].into_iter().flatten() {
                if matches!(operand, Operand::Const(Const::Str(_))) {
                    return Err(CodegenError::unsupported(
                        pos.clone(),
                        format!("{} on a string literal", op.as_str()),
                    ));
                }
            }
        }
        OpCode::Ret => {
            if quad.a1.is_some() {
                value(op, "a1", &quad.a1).map_err(malformed)?;
            }
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            forbid(op, "dst", &quad.dst).map_err(malformed)?;
        }
        OpCode::Param | OpCode::Print => {
            value(op, "a1", &quad.a1).map_err(malformed)?;
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            forbid(op, "dst", &quad.dst).map_err(malformed)?;
        }
        OpCode::Call => {
            if !matches!(quad.a1, Some(Operand::Label(_))) {
                return Err(malformed("call needs a callee label in a1".to_string()));
            }
            match &quad.a2 {
                Some(Operand::Const(Const::Int(n))) if *n >= 0 => {}
                _ => return Err(malformed("call needs a non-negative argument count in a2".to_string())),
            }
            if quad.dst.is_some() {
                destination(op, quad).map_err(malformed)?;
            }
        }
        OpCode::AddrField => {
            name(op, "a1", &quad.a1).map_err(malformed)?;
            int(op, "a2", &quad.a2).map_err(malformed)?;
            destination(op, quad).map_err(malformed)?;
        }
        OpCode::AddrIndex => {
            name(op, "a1", &quad.a1).map_err(malformed)?;
            match &quad.a2 {
                Some(Operand::Name(_)) => {}
                _ => int(op, "a2", &quad.a2).map_err(malformed)?,
            }
            destination(op, quad).map_err(malformed)?;
        }
        OpCode::Alloc => {
            match &quad.a1 {
                Some(Operand::Label(_)) => {}
                _ => int(op, "a1", &quad.a1).map_err(malformed)?,
            }
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            destination(op, quad).map_err(malformed)?;
        }
        OpCode::AllocArray => {
            match &quad.a1 {
                Some(Operand::Name(_)) => {}
                _ => int(op, "a1", &quad.a1).map_err(malformed)?,
            }
            forbid(op, "a2", &quad.a2).map_err(malformed)?;
            destination(op, quad).map_err(malformed)?;
        }
        // Arithmetic and relational opcodes are handled by the guard above
        _ => {}
    }
    Ok(())
}

fn require_label(quad: &Quad) -> Result<(), String> {
    match quad.label.as_deref() {
        Some(l) if !l.is_empty() => Ok(()),
        _ => Err(format!("{} requires a label", quad.op.as_str())),
    }
}

fn forbid(op: OpCode, slot: &str, operand: &Option<Operand>) -> Result<(), String> {
    match operand {
        None => Ok(()),
        Some(o) => Err(format!("{} takes no {slot} operand, found {o}", op.as_str())),
    }
}

/// A literal or a name
fn value(op: OpCode, slot: &str, operand: &Option<Operand>) -> Result<(), String> {
    match operand {
        Some(Operand::Const(_)) | Some(Operand::Name(_)) => Ok(()),
        Some(o) => Err(format!("{} expects a value in {slot}, found {o}", op.as_str())),
        None => Err(format!("{} is missing its {slot} operand", op.as_str())),
    }
}

fn name(op: OpCode, slot: &str, operand: &Option<Operand>) -> Result<(), String> {
    match operand {
        Some(Operand::Name(_)) => Ok(()),
        Some(o) => Err(format!("{} expects a name in {slot}, found {o}", op.as_str())),
        None => Err(format!("{} is missing its {slot} operand", op.as_str())),
    }
}

fn int(op: OpCode, slot: &str, operand: &Option<Operand>) -> Result<(), String> {
    match operand {
        Some(Operand::Const(Const::Int(_))) => Ok(()),
        Some(o) => Err(format!("{} expects an integer in {slot}, found {o}", op.as_str())),
        None => Err(format!("{} is missing its {slot} operand", op.as_str())),
    }
}

fn frame_addr(op: OpCode, operand: &Option<Operand>) -> Result<(), String> {
    match operand {
        Some(Operand::FrameAddr { base, .. }) if base == "fp" => Ok(()),
        Some(Operand::FrameAddr { base, .. }) => {
            Err(format!("{} references unknown frame base '{base}'", op.as_str()))
        }
        _ => Err(format!("{} expects a frame address", op.as_str())),
    }
}

/// A frame address or a name holding a pointer
fn address(op: OpCode, slot: &str, operand: &Option<Operand>) -> Result<(), String> {
    match operand {
        Some(Operand::FrameAddr { .. }) => frame_addr(op, operand),
        Some(Operand::Name(_)) => Ok(()),
        Some(o) => Err(format!("{} expects an address in {slot}, found {o}", op.as_str())),
        None => Err(format!("{} is missing its {slot} operand", op.as_str())),
    }
}

fn destination(op: OpCode, quad: &Quad) -> Result<(), String> {
    name(op, "dst", &quad.dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pos() -> QuadPos {
        QuadPos::new("f", 0)
    }

    #[test]
    fn test_branch_targets_move_to_label() {
        let legacy_goto = Quad::new(OpCode::Goto).with_dst(Operand::label("L1"));
        assert_eq!(normalize(&legacy_goto), Quad::goto("L1"));

        let legacy_if = Quad::new(OpCode::IfGoto)
            .with_a1(Operand::name("t0"))
            .with_a2(Operand::label("L2"));
        assert_eq!(normalize(&legacy_if), Quad::if_goto(Operand::name("t0"), "L2"));

        let legacy_label = Quad::new(OpCode::Label).with_dst(Operand::label("L3"));
        assert_eq!(normalize(&legacy_label), Quad::label("L3"));
    }

    #[test]
    fn test_call_target_becomes_label() {
        let quoted = Quad::new(OpCode::Call)
            .with_a1(Operand::string("suma"))
            .with_a2(Operand::int(2))
            .with_dst(Operand::name("t2"));
        assert_eq!(normalize(&quoted), Quad::call("suma", 2, Some("t2")));

        let named = Quad::new(OpCode::Alloc)
            .with_a1(Operand::name("Node"))
            .with_dst(Operand::name("t0"));
        assert_eq!(normalize(&named).a1, Some(Operand::label("Node")));
    }

    #[test]
    fn test_ret_null_means_no_value() {
        let q = Quad::ret(Some(Operand::Const(Const::Null)));
        assert_eq!(normalize(&q), Quad::ret(None));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let quads = vec![
            Quad::new(OpCode::Goto).with_dst(Operand::label("L1")),
            Quad::new(OpCode::IfGoto)
                .with_a1(Operand::name("c"))
                .with_dst(Operand::label("L2")),
            Quad::new(OpCode::Call).with_a1(Operand::name("f")).with_a2(Operand::int(0)),
            Quad::binary(OpCode::Add, Operand::name("a"), Operand::int(1), "b"),
            Quad::ret(Some(Operand::Const(Const::Null))),
            Quad::store(Operand::name("x"), Operand::fp(-1)),
        ];
        for q in &quads {
            let once = normalize(q);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_validate_accepts_canonical_quads() {
        let quads = vec![
            Quad::label("L1"),
            Quad::goto("L1"),
            Quad::if_goto(Operand::name("c"), "L1"),
            Quad::assign(Operand::int(5), "t0"),
            Quad::assign(Operand::fp(2), "t1"),
            Quad::load(Operand::fp(-1), "t2"),
            Quad::load(Operand::name("p"), "t3"),
            Quad::store(Operand::int(0), Operand::fp(-2)),
            Quad::binary(OpCode::Le, Operand::name("a"), Operand::int(3), "t4"),
            Quad::ret(None),
            Quad::param(Operand::name("x")),
            Quad::call("f", 1, None),
            Quad::print(Operand::string("hi")),
            Quad::binary(OpCode::AddrField, Operand::name("p"), Operand::int(1), "t5"),
            Quad::binary(OpCode::AddrIndex, Operand::name("p"), Operand::name("i"), "t6"),
            Quad::new(OpCode::Alloc).with_a1(Operand::label("Node")).with_dst(Operand::name("t7")),
            Quad::new(OpCode::AllocArray).with_a1(Operand::name("n")).with_dst(Operand::name("t8")),
        ];
        for q in &quads {
            assert_eq!(validate(q, &pos()), Ok(()), "{q}");
        }
    }

    #[test]
    fn test_validate_rejects_missing_operands() {
        let no_dst = Quad::new(OpCode::Add).with_a1(Operand::int(1)).with_a2(Operand::int(2));
        assert!(matches!(
            validate(&no_dst, &pos()),
            Err(CodegenError::MalformedInstruction { .. })
        ));

        let store_to_literal = Quad::store(Operand::name("x"), Operand::int(4));
        assert!(matches!(
            validate(&store_to_literal, &pos()),
            Err(CodegenError::MalformedInstruction { .. })
        ));

        let bad_base = Quad::load(
            Operand::FrameAddr { base: "gp".to_string(), offset: 1 },
            "t0",
        );
        assert!(matches!(
            validate(&bad_base, &pos()),
            Err(CodegenError::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn test_string_arithmetic_is_unsupported() {
        let q = Quad::binary(OpCode::Add, Operand::string("a"), Operand::int(1), "t0");
        assert_eq!(
            validate(&q, &pos()),
            Err(CodegenError::unsupported(pos(), "+ on a string literal"))
        );
    }

    #[test]
    fn test_nul_in_string_literal_is_malformed() {
        let q = Quad::print(Operand::string("ab\0cd"));
        assert_eq!(
            validate(&q, &pos()),
            Err(CodegenError::malformed(pos(), "print string literal contains a NUL character"))
        );
        assert_eq!(validate(&Quad::print(Operand::string("ab\rcd")), &pos()), Ok(()));
    }
}
