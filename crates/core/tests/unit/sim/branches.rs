//! Branch Semantics Tests.
//!
//! Verifies that control flow performs:
//!   1. Relative branches — the target is the labeled line regardless of the
//!      words already in flight (pipeline-index compensation)
//!   2. Conditional branches — blocked comparisons suppress the transfer
//!   3. Absolute jumps — the PC is set to the target address directly
//!   4. Delayed jumps — a register-held count scaled by the word spacing
//!   5. Whole programs — the shipped demo program computes its sum

use isasim_core::common::Signal;
use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;

/// The shipped demo program.
const SUM_PROGRAM: &str = include_str!("../../../../../demos/sum.s");

#[test]
fn a_taken_branch_lands_on_its_label() {
    // The branch skips the two delay slots plus one extra instruction; the
    // skipped `li $t3` must never execute.
    let mut ctx = TestContext::load(
        "beq $zero, $zero, over\n\
         nop\n\
         nop\n\
         li $t3, 99\n\
         over: li $t4, 7\n\
         li $v0, 0\n\
         syscall\n",
    );
    let (signal, _) = ctx.run_until_signal(16);
    assert_eq!(signal, Signal::Terminate(0));
    assert_eq!(ctx.reg("$t3"), 0, "the branched-over instruction never ran");
    assert_eq!(ctx.reg("$t4"), 7);
}

#[test]
fn a_not_taken_branch_falls_through() {
    let mut ctx = TestContext::load(
        "li $t0, 1\n\
         beq $t0, $zero, over\n\
         nop\n\
         nop\n\
         li $t3, 99\n\
         over: li $t4, 7\n\
         li $v0, 0\n\
         syscall\n",
    );
    let (signal, _) = ctx.run_until_signal(16);
    assert_eq!(signal, Signal::Terminate(0));
    assert_eq!(ctx.reg("$t3"), 99, "fall-through executes everything");
    assert_eq!(ctx.reg("$t4"), 7);
}

#[test]
fn backward_branches_loop() {
    // Count $t0 down from 3; bne loops until it reaches zero.
    let mut ctx = TestContext::load(
        "li $t0, 3\n\
         li $t1, 0\n\
         loop: addi $t0, $t0, -1\n\
         addi $t1, $t1, 1\n\
         bne $t0, $zero, loop\n\
         nop\n\
         nop\n\
         li $v0, 0\n\
         syscall\n",
    );
    let (signal, _) = ctx.run_until_signal(64);
    assert_eq!(signal, Signal::Terminate(0));
    assert_eq!(ctx.reg("$t0"), 0);
    assert_eq!(ctx.reg("$t1"), 3, "the loop body ran exactly three times");
}

#[test]
fn absolute_jumps_set_the_pc_directly() {
    let mut ctx = TestContext::load(
        "j skip\n\
         nop\n\
         nop\n\
         li $t3, 99\n\
         skip: li $t4, 7\n\
         li $v0, 0\n\
         syscall\n",
    );
    let (signal, _) = ctx.run_until_signal(16);
    assert_eq!(signal, Signal::Terminate(0));
    assert_eq!(ctx.reg("$t3"), 0);
    assert_eq!(ctx.reg("$t4"), 7);
}

#[test]
fn delayed_jumps_add_a_scaled_register_count() {
    // jd lands `$t5` words past the label: the first target instruction is
    // skipped when $t5 holds 1.
    let mut ctx = TestContext::load(
        "li $t5, 1\n\
         jd table, $t5\n\
         nop\n\
         nop\n\
         table: li $t3, 99\n\
         li $t4, 7\n\
         li $v0, 0\n\
         syscall\n",
    );
    let (signal, _) = ctx.run_until_signal(16);
    assert_eq!(signal, Signal::Terminate(0));
    assert_eq!(ctx.reg("$t3"), 0, "jd skipped the first table entry");
    assert_eq!(ctx.reg("$t4"), 7);
}

#[test]
fn the_demo_program_sums_one_through_five() {
    let mut ctx = TestContext::load(SUM_PROGRAM);
    let (signal, cycles) = ctx.run_until_signal(512);
    assert_eq!(signal, Signal::Terminate(0));
    assert_eq!(ctx.reg("$t1"), 15);
    // The result was stored at the data segment base.
    assert_eq!(
        ctx.processor.memory_mut().get_word(16384, 32, true).unwrap(),
        15
    );
    assert!(cycles > 5 * 7, "five loop iterations take real cycles");
}
