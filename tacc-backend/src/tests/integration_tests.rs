//! End-to-end tests: TAC text in, assembly text out

use super::{assert_sequence, compile, compile_with, frame_size, parse};
use crate::{generate, CodegenOptions};
use pretty_assertions::assert_eq;
use tacc_ir::{OpCode, Operand, Quad, TacProgram};

#[test]
fn test_constants_and_return() {
    let asm = compile(
        "\
func_main_entry:
t0 := 5
t1 := 7
+ t0, t1 -> t2
ret t2
func_main_end:
",
    );
    let expected = "\
.text
.globl main
main:
  addiu $sp, $sp, -8
  sw $ra, 4($sp)
  sw $fp, 0($sp)
  addiu $fp, $sp, 0
  li $t0, 5
  li $t1, 7
  addu $t2, $t0, $t1
  move $v0, $t2
main_epilogue:
  lw $ra, 4($fp)
  addiu $sp, $fp, 8
  lw $fp, 0($fp)
  jr $ra
";
    assert_eq!(asm, expected);
}

#[test]
fn test_toplevel_prints_and_exits() {
    let asm = compile("print \"hola\"\nprint 42\n");
    let expected = "\
.text
.globl main
main:
  addiu $sp, $sp, -8
  sw $ra, 4($sp)
  sw $fp, 0($sp)
  addiu $fp, $sp, 0
  la $a0, str_0
  li $v0, 4
  syscall
  li $a0, 42
  li $v0, 1
  syscall
main_epilogue:
  li $v0, 10
  syscall
.data
str_0: .asciiz \"hola\"
";
    assert_eq!(asm, expected);
}

#[test]
fn test_frame_slot_store_and_load_agree() {
    let asm = compile(
        "\
func_f_entry:
t0 := 42
store t0, [fp-1]
load [fp-1] -> t1
ret t1
func_f_end:
",
    );
    assert!(asm.contains("sw $t0, -4($fp)"));
    assert!(asm.contains("lw $t0, -4($fp)"));
    assert_eq!(frame_size(&asm, "f"), 16);
}

#[test]
fn test_parameters_are_above_the_header() {
    let asm = compile(
        "\
func_suma_entry:
load [fp+2] -> a
load [fp+3] -> b
+ a, b -> t0
ret t0
func_suma_end:
",
    );
    assert_sequence(
        &asm,
        &["lw $t0, 8($fp)", "lw $t1, 12($fp)", "addu $t2, $t0, $t1", "move $v0, $t2"],
    );
}

#[test]
fn test_call_convention() {
    let asm = compile(
        "\
func_suma_entry:
load [fp+2] -> a
load [fp+3] -> b
+ a, b -> t0
ret t0
func_suma_end:
func_main_entry:
t0 := 3
t1 := 4
param t0
param t1
call suma, nargs=2 -> t2
ret t2
func_main_end:
",
    );
    assert_sequence(
        &asm,
        &[
            "addiu $sp, $sp, -8",
            "sw $t0, 0($sp)",
            "sw $t1, 4($sp)",
            "jal suma",
            "addiu $sp, $sp, 8",
            "move $t0, $v0",
            "move $v0, $t0",
        ],
    );
}

#[test]
fn test_values_survive_calls_in_slots() {
    let text = "\
func_g_entry:
ret 1
func_g_end:
func_main_entry:
x := 5
call g, nargs=0 -> r
+ x, r -> y
ret y
func_main_end:
";
    let asm = compile(text);
    assert_sequence(&asm, &["li $t0, 5", "sw $t0, -4($fp)", "jal g", "move $t0, $v0", "lw $t1, -4($fp)"]);
    assert!(!asm.contains("$s0"));
}

#[test]
fn test_values_survive_calls_in_saved_registers() {
    let text = "\
func_g_entry:
ret 1
func_g_end:
func_main_entry:
x := 5
call g, nargs=0 -> r
+ x, r -> y
ret y
func_main_end:
";
    let options = CodegenOptions { saved_registers: true, ..CodegenOptions::default() };
    let asm = compile_with(text, options);
    assert_sequence(&asm, &["addiu $fp, $sp, 8", "sw $s0, -4($fp)", "li $s0, 5", "jal g"]);
    assert_sequence(&asm, &["addu $t1, $s0, $t0"]);
    assert_sequence(&asm, &["main_epilogue:", "lw $s0, -4($fp)", "lw $ra, 4($fp)"]);
}

#[test]
fn test_register_pressure_spills() {
    let mut text = String::new();
    for i in 0..12 {
        text.push_str(&format!("t{i} := {i}\n"));
    }
    text.push_str("+ t0, t1 -> s\n");
    for i in 2..12 {
        text.push_str(&format!("+ s, t{i} -> s\n"));
    }
    text.push_str("print s\n");

    let asm = compile(&text);
    let spills = asm
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("sw $t") && l.ends_with("($fp)"))
        .count();
    assert!(spills >= 1, "expected a spill store in:\n{asm}");
    assert_eq!(frame_size(&asm, "main") % 8, 0);
}

#[test]
fn test_dead_values_free_their_registers() {
    let mut text = String::from("func_f_entry:\n");
    for i in 0..12 {
        text.push_str(&format!("t{i} := {i}\n"));
    }
    text.push_str("+ t10, t11 -> t12\nret t12\nfunc_f_end:\n");

    let released = compile(&text);
    assert!(!released.lines().any(|l| l.trim().starts_with("sw $t")));
    assert_eq!(frame_size(&released, "f"), 8);

    let options = CodegenOptions { release_dead_values: false, ..CodegenOptions::default() };
    let kept = compile_with(&text, options);
    assert!(kept.contains("sw $t0, -4($fp)"));
    assert_eq!(frame_size(&kept, "f") % 8, 0);
}

#[test]
fn test_branch_join_uses_frame_slot() {
    let asm = compile(
        "\
x := 1
if c goto L1
x := 2
L1:
print x
",
    );
    assert_sequence(
        &asm,
        &[
            "li $t0, 1",
            "sw $t0, -4($fp)",
            "bne $t1, $zero, L1",
            "li $t0, 2",
            "sw $t0, -4($fp)",
            "L1:",
            "lw $t0, -4($fp)",
            "move $a0, $t0",
            "li $v0, 1",
            "syscall",
        ],
    );
}

#[test]
fn test_loop() {
    let asm = compile(
        "\
i := 0
Lcond:
< i, 3 -> c
if c goto Lbody
goto Lend
Lbody:
print i
+ i, 1 -> i
goto Lcond
Lend:
",
    );
    assert!(asm.contains("Lcond:\n"));
    assert!(asm.contains("slt "));
    assert!(asm.contains("bne "));
    assert!(asm.contains("j Lcond"));
    assert!(asm.contains("j Lend"));
    assert!(asm.ends_with("main_epilogue:\n  li $v0, 10\n  syscall\n"));
}

#[test]
fn test_constant_conditions_are_static() {
    let never = compile("if 0 goto L\nprint 1\nL:\n");
    assert!(!never.contains("j L\n"));
    assert!(!never.contains("bne"));

    let always = compile("if true goto L\nprint 1\nL:\n");
    assert!(always.contains("j L\n"));
}

#[test]
fn test_relational_idioms() {
    let asm = compile(
        "\
func_f_entry:
load [fp+2] -> a
load [fp+3] -> b
<= a, b -> le
>= a, b -> ge
== a, b -> eq
!= a, b -> ne
> a, b -> gt
print le
print ge
print eq
print ne
print gt
func_f_end:
",
    );
    assert_sequence(&asm, &["slt $t2, $t1, $t0", "xori $t2, $t2, 1"]);
    assert_sequence(&asm, &["slt $t3, $t0, $t1", "xori $t3, $t3, 1"]);
    assert_sequence(&asm, &["subu $t4, $t0, $t1", "sltiu $t4, $t4, 1"]);
    assert_sequence(&asm, &["subu $t5, $t0, $t1", "sltu $t5, $zero, $t5"]);
    assert!(asm.contains("slt $t6, $t1, $t0"));
}

#[test]
fn test_division_and_modulo() {
    let asm = compile("a := 7\nb := 2\n/ a, b -> q\n% a, b -> r\nprint q\nprint r\n");
    assert_sequence(&asm, &["div $t0, $t1", "mflo $t2", "div $t0, $t1", "mfhi $t3"]);
}

#[test]
fn test_string_pool_is_shared() {
    let asm = compile(
        "\
print \"a\"
print \"b\"
print \"a\"
s := \"b\"
print s
",
    );
    let entries = asm.lines().filter(|l| l.contains(".asciiz")).count();
    assert_eq!(entries, 2);
    // A name holding a literal prints as a string
    assert_sequence(&asm, &["la $t0, str_1", "move $a0, $t0", "li $v0, 4"]);
}

#[test]
fn test_frame_sizes_are_aligned() {
    for depth in 1..6 {
        let text = format!("func_f_entry:\nt0 := 1\nstore t0, [fp-{depth}]\nret\nfunc_f_end:\n");
        let size = frame_size(&compile(&text), "f");
        assert_eq!(size % 8, 0, "depth {depth}");
        assert!(size >= 8 + 4 * depth);
    }
}

#[test]
fn test_early_return_jumps_to_epilogue() {
    let asm = compile(
        "\
func_f_entry:
load [fp+2] -> n
if n goto Lpos
ret 0
Lpos:
ret 1
func_f_end:
",
    );
    assert_sequence(&asm, &["li $v0, 0", "j f_epilogue", "Lpos:", "li $v0, 1", "f_epilogue:"]);
}

#[test]
fn test_heap_allocation() {
    let asm = compile(
        "\
.layout Point 2
alloc Point -> p
addr_field p, 1 -> q
store 5, q
alloc_array 3 -> arr
addr_index arr, 2 -> e
load e -> v
print v
",
    );
    assert_sequence(&asm, &["li $a0, 8", "li $v0, 9", "syscall"]);
    assert_sequence(&asm, &["li $a0, 12", "li $v0, 9", "syscall"]);
    assert!(asm.contains("addiu $t1, $t0, 4"));
    assert!(asm.contains("sw $a1, 0($t1)"));
}

#[test]
fn test_wide_field_offset_goes_through_a_register() {
    let asm = compile(
        "\
.layout Big 20000
alloc Big -> p
addr_field p, 10000 -> q
store 1, q
",
    );
    assert_sequence(&asm, &["li $a0, 80000", "li $v0, 9", "syscall"]);
    assert_sequence(&asm, &["li $a2, 40000", "addu $t1, $t0, $a2"]);
}

#[test]
fn test_dynamic_array_index() {
    let asm = compile(
        "\
func_f_entry:
load [fp+2] -> n
alloc_array n -> arr
load [fp+3] -> i
addr_index arr, i -> e
load e -> v
ret v
func_f_end:
",
    );
    assert_sequence(&asm, &["lw $t0, 8($fp)", "sll $a0, $t0, 2", "li $v0, 9", "syscall"]);
    assert!(asm.contains("sll $a2, "));
    assert!(asm.contains("addu "));
}

#[test]
fn test_method_call_resolution() {
    let asm = compile(
        "\
func_Point.norm_entry:
ret 0
func_Point.norm_end:
call norm, nargs=0 -> a
call \"Point.norm\", nargs=0 -> b
print a
print b
",
    );
    assert!(asm.contains("Point_norm:\n"));
    assert_eq!(asm.matches("jal Point_norm").count(), 2);
}

#[test]
fn test_entry_unit_comes_first() {
    let asm = compile("func_f_entry:\nret 1\nfunc_f_end:\nprint 1\n");
    let main_at = asm.find("main:").unwrap();
    let f_at = asm.find("f:").unwrap();
    assert!(main_at < f_at);
}

#[test]
fn test_json_input_matches_text() {
    let mut program = TacProgram::new();
    program
        .emit(Quad::label("func_main_entry"))
        .emit(Quad::assign(Operand::int(2), "x"))
        .emit(Quad::binary(OpCode::Mul, Operand::name("x"), Operand::int(3), "y"))
        .emit(Quad::ret(Some(Operand::name("y"))))
        .emit(Quad::label("func_main_end"));

    let json = program.to_json().unwrap();
    let from_json = TacProgram::from_json(&json).unwrap();
    let from_text = parse("func_main_entry:\nx := 2\n* x, 3 -> y\nret y\nfunc_main_end:\n");

    let asm = generate(&from_json).unwrap();
    assert_eq!(asm, generate(&from_text).unwrap());
    assert_sequence(&asm, &["li $t0, 2", "li $a2, 3", "mul $t1, $t0, $a2", "move $v0, $t1"]);
}

#[test]
fn test_legacy_quad_shapes_compile() {
    let mut program = TacProgram::new();
    program
        .emit(Quad::new(OpCode::Label).with_dst(Operand::label("func_f_entry")))
        .emit(Quad::ret(Some(Operand::int(3))))
        .emit(Quad::new(OpCode::Label).with_dst(Operand::label("func_f_end")))
        .emit(
            Quad::new(OpCode::Call)
                .with_a1(Operand::string("f"))
                .with_a2(Operand::int(0))
                .with_dst(Operand::name("r")),
        )
        .emit(Quad::new(OpCode::Goto).with_dst(Operand::label("L")))
        .emit(Quad::new(OpCode::Label).with_dst(Operand::label("L")))
        .emit(Quad::print(Operand::name("r")));

    let asm = generate(&program).unwrap();
    assert!(asm.contains("jal f"));
    assert!(asm.contains("j L\n"));
}
