//! Operation Library Tests.
//!
//! Verifies that the operations perform:
//!   1. Signed arithmetic at register width — add, sub, mul, div, rem
//!   2. Division faults — divide or remainder by zero
//!   3. Immediate arithmetic — field immediates sign-extended at field width
//!   4. The blocking protocol — a false comparison skips exactly one
//!      following operation, and only that one
//!   5. Memory access — load/store a machine word at base + offset
//!   6. Syscalls — terminate and trap codes, unknown codes fault

use isasim_core::common::Signal;
use isasim_core::common::error::SimError;
use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;

/// Runs a program long enough for every instruction to clear execute.
fn run_program(source: &str) -> TestContext {
    let mut ctx = TestContext::load(source);
    let instructions = source.lines().filter(|l| !l.trim().is_empty()).count() as u64;
    ctx.run(instructions + 3);
    ctx
}

#[test]
fn register_arithmetic() {
    let ctx = run_program(
        "li $t0, 21\n\
         li $t1, 4\n\
         add $t2, $t0, $t1\n\
         sub $t3, $t0, $t1\n\
         mul $t4, $t0, $t1\n\
         div $t5, $t0, $t1\n\
         rem $t6, $t0, $t1\n",
    );
    assert_eq!(ctx.reg("$t2"), 25);
    assert_eq!(ctx.reg("$t3"), 17);
    assert_eq!(ctx.reg("$t4"), 84);
    assert_eq!(ctx.reg("$t5"), 5);
    assert_eq!(ctx.reg("$t6"), 1);
}

#[test]
fn arithmetic_is_signed_at_register_width() {
    let ctx = run_program(
        "li $t0, -6\n\
         li $t1, 4\n\
         add $t2, $t0, $t1\n\
         div $t3, $t0, $t1\n\
         mul $t4, $t0, $t1\n",
    );
    // -6 + 4 = -2, re-encoded at 32 bits.
    assert_eq!(ctx.reg("$t2"), 0xFFFF_FFFE);
    // -6 / 4 truncates toward zero.
    assert_eq!(ctx.reg("$t3"), 0xFFFF_FFFF);
    // -6 * 4 = -24.
    assert_eq!(ctx.reg("$t4"), 0xFFFF_FFE8);
}

#[test]
fn division_by_zero_faults() {
    let mut ctx = TestContext::load(
        "li $t0, 9\n\
         li $t1, 0\n\
         div $t2, $t0, $t1\n",
    );
    let (fault, _) = ctx.run_until_fault(8);
    assert_eq!(fault, SimError::DivisionByZero);
}

#[test]
fn remainder_by_zero_faults() {
    let mut ctx = TestContext::load("rem $t2, $t0, $zero\n");
    let (fault, _) = ctx.run_until_fault(8);
    assert_eq!(fault, SimError::DivisionByZero);
}

#[test]
fn immediate_arithmetic_sign_extends_the_field() {
    let ctx = run_program(
        "li $t0, 10\n\
         addi $t1, $t0, -3\n\
         addi $t2, $t0, 0x10\n",
    );
    assert_eq!(ctx.reg("$t1"), 7);
    assert_eq!(ctx.reg("$t2"), 26);
}

#[test]
fn copy_moves_a_register_value() {
    let ctx = run_program(
        "li $s0, 1234\n\
         move $s1, $s0\n",
    );
    assert_eq!(ctx.reg("$s1"), 1234);
}

#[test]
fn a_false_comparison_skips_exactly_one_operation() {
    // Compare 10 against 0 both ways around.
    let ctx = run_program(
        "li $t0, 10\n\
         li $t1, 0\n\
         slt $t2, $t0, $t1\n\
         slt $t3, $t1, $t0\n",
    );
    // 10 < 0 is false: the trailing `set 1` was skipped, the leading
    // `set 0` was not.
    assert_eq!(ctx.reg("$t2"), 0);
    // 0 < 10 is true: nothing skipped.
    assert_eq!(ctx.reg("$t3"), 1);
}

#[test]
fn the_skip_is_single_shot() {
    // Two slt instructions back to back: the first one's skip must not
    // leak into the second one's operation list.
    let ctx = run_program(
        "li $t0, 10\n\
         li $t1, 0\n\
         slt $t2, $t0, $t1\n\
         slt $t3, $t1, $t0\n\
         slt $t4, $t0, $t1\n",
    );
    assert_eq!(ctx.reg("$t2"), 0);
    assert_eq!(ctx.reg("$t3"), 1);
    assert_eq!(ctx.reg("$t4"), 0);
}

#[test]
fn loads_and_stores_use_base_plus_offset() {
    let ctx = run_program(
        "li $t0, 777\n\
         sw $t0, 8($gp)\n\
         lw $t1, 8($gp)\n",
    );
    assert_eq!(ctx.reg("$t1"), 777);
    // The demo $gp points at the data segment base.
    let mut ctx = ctx;
    assert_eq!(
        ctx.processor.memory_mut().get_word(16392, 32, true).unwrap(),
        777
    );
}

#[test]
fn stores_fault_outside_the_address_space() {
    let mut ctx = TestContext::load(
        "li $t0, -1\n\
         sw $t0, 4($t0)\n",
    );
    let (fault, _) = ctx.run_until_fault(8);
    assert!(matches!(fault, SimError::Segmentation { .. }));
}

#[test]
fn syscall_zero_terminates() {
    let mut ctx = TestContext::load(
        "li $v0, 0\n\
         syscall\n",
    );
    let (signal, _) = ctx.run_until_signal(8);
    assert_eq!(signal, Signal::Terminate(0));
}

#[test]
fn syscall_one_traps_at_the_current_pc() {
    let mut ctx = TestContext::load(
        "li $v0, 1\n\
         syscall\n",
    );
    let (signal, _) = ctx.run_until_signal(8);
    assert!(matches!(signal, Signal::Trap(_)));
}

#[test]
fn unknown_syscall_codes_fault() {
    let mut ctx = TestContext::load(
        "li $v0, 7\n\
         syscall\n",
    );
    let (fault, _) = ctx.run_until_fault(8);
    assert_eq!(fault, SimError::UnknownSignalCode(7));
}
