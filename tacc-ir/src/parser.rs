//! Textual TAC reader
//! 
//! Reads the canonical printed form back into quadruples. Any line that does
//! not match a known form is an error; there is no "first token is the
//! opcode" fallback.

use crate::operand::{Const, Operand};
use crate::program::TacProgram;
use crate::quad::{OpCode, Quad};
use std::str::FromStr;
use tacc_common::ParseError;

impl FromStr for TacProgram {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut program = TacProgram::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix(".layout") {
                let (name, words) = parse_layout(rest).map_err(|m| ParseError::new(idx + 1, m))?;
                program.layouts.insert(name, words);
                continue;
            }
            let quad = parse_quad(line).map_err(|m| ParseError::new(idx + 1, m))?;
            program.code.push(quad);
        }
        Ok(program)
    }
}

fn parse_layout(rest: &str) -> Result<(String, u32), String> {
    let mut parts = rest.split_whitespace();
    let (Some(name), Some(words), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("expected '.layout <type> <words>'".to_string());
    };
    let words = words
        .parse::<u32>()
        .map_err(|_| format!("invalid layout size '{words}'"))?;
    Ok((name.to_string(), words))
}

/// Parse one non-empty line of TAC
pub fn parse_quad(line: &str) -> Result<Quad, String> {
    let line = line.trim();

    if let Some(name) = line.strip_suffix(':') {
        if is_ident(name) {
            return Ok(Quad::label(name));
        }
    }

    let (head, body) = match line.split_once(char::is_whitespace) {
        Some((h, b)) => (h, b.trim()),
        None => (line, ""),
    };

    match head {
        "goto" => Ok(Quad::goto(label_name(body)?)),
        "if" => {
            let at = rfind_outside_quotes(body, " goto ")
                .ok_or_else(|| format!("expected 'if <cond> goto <label>', got '{line}'"))?;
            let cond = parse_operand(&body[..at])?;
            Ok(Quad::if_goto(cond, label_name(&body[at + " goto ".len()..])?))
        }
        "load" => {
            let (src, dst) = split_arrow(body)?;
            Ok(Quad::load(parse_operand(src)?, dst_name(dst)?))
        }
        "store" => {
            let (value, addr) = split_comma(body)?;
            Ok(Quad::store(parse_operand(value)?, parse_operand(addr)?))
        }
        "ret" => {
            if body.is_empty() {
                Ok(Quad::ret(None))
            } else {
                Ok(Quad::ret(Some(parse_operand(body)?)))
            }
        }
        "param" => Ok(Quad::param(parse_operand(body)?)),
        "print" => Ok(Quad::print(parse_operand(body)?)),
        "call" => parse_call(body),
        "alloc" | "alloc_array" => {
            let op = OpCode::from_str(head)?;
            let (src, dst) = split_arrow(body)?;
            // Object allocations name a layout; array allocations take a count
            let size = if op == OpCode::Alloc { parse_target(src)? } else { parse_operand(src)? };
            Ok(Quad::new(op)
                .with_a1(size)
                .with_dst(Operand::name(dst_name(dst)?)))
        }
        _ => {
            if let Ok(op) = OpCode::from_str(head) {
                if op.is_three_address() {
                    let (args, dst) = split_arrow(body)?;
                    let (lhs, rhs) = split_comma(args)?;
                    return Ok(Quad::binary(op, parse_operand(lhs)?, parse_operand(rhs)?, dst_name(dst)?));
                }
            }
            if let Some(at) = find_outside_quotes(line, ":=") {
                let dst = dst_name(&line[..at])?;
                let src = parse_operand(&line[at + 2..])?;
                return Ok(Quad::assign(src, dst));
            }
            Err(format!("unrecognized instruction '{line}'"))
        }
    }
}

fn parse_call(body: &str) -> Result<Quad, String> {
    let (target, dst) = match find_outside_quotes(body, "->") {
        Some(at) => (body[..at].trim(), Some(dst_name(&body[at + 2..])?)),
        None => (body.trim(), None),
    };
    let (callee, nargs) = split_comma(target)?;
    let nargs = nargs.strip_prefix("nargs=").unwrap_or(nargs).trim();
    let nargs = nargs
        .parse::<i32>()
        .map_err(|_| format!("invalid argument count '{nargs}'"))?;
    let mut quad = Quad::new(OpCode::Call)
        .with_a1(parse_target(callee)?)
        .with_a2(Operand::int(nargs));
    quad.dst = dst.map(Operand::Name);
    Ok(quad)
}

/// Callee or type name: bare identifiers are labels, everything else is an operand
fn parse_target(text: &str) -> Result<Operand, String> {
    let text = text.trim();
    if is_ident(text) && !is_keyword(text) {
        Ok(Operand::label(text))
    } else {
        parse_operand(text)
    }
}

/// Parse a single operand: `[fp±k]`, a literal, or a name
pub fn parse_operand(text: &str) -> Result<Operand, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("missing operand".to_string());
    }
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return parse_frame_addr(inner);
    }
    if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Ok(Operand::Const(Const::Str(unescape(inner)?)));
    }
    match text {
        "true" => return Ok(Operand::Const(Const::Bool(true))),
        "false" => return Ok(Operand::Const(Const::Bool(false))),
        "null" => return Ok(Operand::Const(Const::Null)),
        _ => {}
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return text
            .parse::<i32>()
            .map(Operand::int)
            .map_err(|_| format!("invalid integer literal '{text}'"));
    }
    if is_ident(text) {
        return Ok(Operand::name(text));
    }
    Err(format!("invalid operand '{text}'"))
}

fn parse_frame_addr(inner: &str) -> Result<Operand, String> {
    let inner: String = inner.chars().filter(|c| !c.is_whitespace()).collect();
    let (base, offset) = match inner.find(['+', '-']) {
        Some(at) => {
            let offset = inner[at..]
                .parse::<i32>()
                .map_err(|_| format!("invalid frame offset in '[{inner}]'"))?;
            (&inner[..at], offset)
        }
        None => (inner.as_str(), 0),
    };
    if !is_ident(base) {
        return Err(format!("invalid frame base in '[{inner}]'"));
    }
    Ok(Operand::FrameAddr { base: base.to_string(), offset })
}

fn unescape(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(format!("unknown escape '\\{other}'")),
            None => return Err("dangling '\\' in string literal".to_string()),
        }
    }
    Ok(out)
}

fn label_name(text: &str) -> Result<String, String> {
    let text = text.trim();
    if is_ident(text) {
        Ok(text.to_string())
    } else {
        Err(format!("invalid label '{text}'"))
    }
}

fn dst_name(text: &str) -> Result<String, String> {
    let text = text.trim();
    if is_ident(text) && !is_keyword(text) {
        Ok(text.to_string())
    } else {
        Err(format!("invalid destination '{text}'"))
    }
}

fn split_arrow(body: &str) -> Result<(&str, &str), String> {
    let at = find_outside_quotes(body, "->").ok_or_else(|| format!("expected '->' in '{body}'"))?;
    Ok((body[..at].trim(), body[at + 2..].trim()))
}

fn split_comma(body: &str) -> Result<(&str, &str), String> {
    let at = find_outside_quotes(body, ",").ok_or_else(|| format!("expected ',' in '{body}'"))?;
    Ok((body[..at].trim(), body[at + 1..].trim()))
}

/// Byte offsets of `pat` occurrences that are not inside a string literal
fn positions_outside_quotes(text: &str, pat: &str) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut in_str = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_str {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
        } else if c == '"' {
            in_str = true;
        } else if text[i..].starts_with(pat) {
            hits.push(i);
        }
    }
    hits
}

fn find_outside_quotes(text: &str, pat: &str) -> Option<usize> {
    positions_outside_quotes(text, pat).first().copied()
}

fn rfind_outside_quotes(text: &str, pat: &str) -> Option<usize> {
    positions_outside_quotes(text, pat).last().copied()
}

fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

fn is_keyword(text: &str) -> bool {
    matches!(text, "true" | "false" | "null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic_forms() {
        assert_eq!(parse_quad("t0 := 5").unwrap(), Quad::assign(Operand::int(5), "t0"));
        assert_eq!(
            parse_quad("load [fp+2] -> t0").unwrap(),
            Quad::load(Operand::fp(2), "t0")
        );
        assert_eq!(
            parse_quad("store t1, [fp-1]").unwrap(),
            Quad::store(Operand::name("t1"), Operand::fp(-1))
        );
        assert_eq!(parse_quad("if t2 goto Lfor_body1").unwrap(), Quad::if_goto(Operand::name("t2"), "Lfor_body1"));
        assert_eq!(parse_quad("func_main_entry:").unwrap(), Quad::label("func_main_entry"));
        assert_eq!(parse_quad("ret").unwrap(), Quad::ret(None));
        assert_eq!(parse_quad("ret null").unwrap(), Quad::ret(Some(Operand::Const(Const::Null))));
    }

    #[test]
    fn test_parse_binary_and_relational() {
        assert_eq!(
            parse_quad("<= t0, 3 -> t2").unwrap(),
            Quad::binary(OpCode::Le, Operand::name("t0"), Operand::int(3), "t2")
        );
        assert_eq!(
            parse_quad("- x, -1 -> t9").unwrap(),
            Quad::binary(OpCode::Sub, Operand::name("x"), Operand::int(-1), "t9")
        );
        assert_eq!(
            parse_quad("addr_field t0, 2 -> t1").unwrap(),
            Quad::binary(OpCode::AddrField, Operand::name("t0"), Operand::int(2), "t1")
        );
    }

    #[test]
    fn test_parse_call_forms() {
        assert_eq!(parse_quad("call suma, nargs=2 -> t2").unwrap(), Quad::call("suma", 2, Some("t2")));
        let quoted = parse_quad("call \"Point.constructor\", nargs=3").unwrap();
        assert_eq!(quoted.a1, Some(Operand::string("Point.constructor")));
        assert_eq!(quoted.a2, Some(Operand::int(3)));
        assert_eq!(quoted.dst, None);
    }

    #[test]
    fn test_alloc_array_count_is_an_operand() {
        let quad = parse_quad("alloc_array n -> t1").unwrap();
        assert_eq!(quad.a1, Some(Operand::name("n")));
        let quad = parse_quad("alloc_array 4 -> t1").unwrap();
        assert_eq!(quad.a1, Some(Operand::int(4)));
    }

    #[test]
    fn test_string_literals_with_separators() {
        let quad = parse_quad(r#"t0 := "a, b -> c := d""#).unwrap();
        assert_eq!(quad, Quad::assign(Operand::string("a, b -> c := d"), "t0"));
        let quad = parse_quad(r#"print "line\n""#).unwrap();
        assert_eq!(quad, Quad::print(Operand::string("line\n")));
    }

    #[test]
    fn test_frame_offsets_span_the_full_range() {
        let quad = parse_quad("store t, [fp-2147483648]").unwrap();
        assert_eq!(quad.a2, Some(Operand::fp(i32::MIN)));
        assert!(parse_quad("load [fp+2147483648] -> t").is_err());
    }

    #[test]
    fn test_control_characters_round_trip() {
        let quad = Quad::print(Operand::string("a\rb\0c"));
        assert_eq!(quad.to_string(), r#"print "a\rb\0c""#);
        assert_eq!(parse_quad(&quad.to_string()).unwrap(), quad);
    }

    #[test]
    fn test_unknown_forms_are_errors() {
        assert!(parse_quad("len t0 -> t1").is_err());
        assert!(parse_quad("frobnicate").is_err());
        assert!(parse_quad("load [fp+x] -> t0").is_err());
        assert!(parse_quad("+ t0 t1 -> t2").is_err());
    }

    #[test]
    fn test_program_parse_and_print() {
        let text = "\
.layout Point 2
# constructor call
func_main_entry:
alloc Point -> t0
t1 := 5
ret t1
func_main_end:
";
        let program: TacProgram = text.parse().unwrap();
        assert_eq!(program.layouts.get("Point"), Some(&2));
        assert_eq!(program.len(), 5);
        assert_eq!(program.code[1].a1, Some(Operand::label("Point")));

        let reparsed: TacProgram = program.to_string().parse().unwrap();
        assert_eq!(reparsed, program);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = "t0 := 1\n\nbogus line here\n".parse::<TacProgram>().unwrap_err();
        assert_eq!(err.line, 3);
    }
}
