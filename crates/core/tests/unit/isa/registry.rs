//! Machine Description Validation Tests.
//!
//! Every rejection the configuration contract promises is exercised by
//! mutating the (valid) demo description and asserting the build fails with
//! the right error:
//!   1. Duplicate formats, instructions, registers, segments
//!   2. Overlapping or out-of-range bit fields
//!   3. Unknown formats, fields, operations, operand tokens
//!   4. Ambiguous signatures and multi-word signature placement
//!   5. Register-file profile invariant (exactly one program counter)
//!   6. Bad patterns, address spaces, and stage lists

use isasim_core::MachineDescription;
use isasim_core::common::error::ConfigError;

use crate::common::fixtures::demo_description;

/// Builds a mutated demo description and returns the rejection.
fn build_err(mutate: impl FnOnce(&mut MachineDescription)) -> ConfigError {
    let mut description = demo_description();
    mutate(&mut description);
    match description.build() {
        Ok(_) => panic!("mutated description unexpectedly built"),
        Err(e) => e,
    }
}

#[test]
fn the_demo_description_builds() {
    let processor = demo_description().build().expect("demo builds");
    assert_eq!(processor.word_spacing(), 4);
    assert_eq!(processor.registry().word_width(), 32);
}

#[test]
fn duplicate_format_names_are_rejected() {
    let e = build_err(|d| {
        let first = d.formats[0].clone();
        d.formats.push(first);
    });
    assert!(matches!(e, ConfigError::Duplicate { kind: "format", .. }));
}

#[test]
fn overlapping_fields_are_rejected() {
    let e = build_err(|d| {
        d.formats[0].fields[1].bits = [4, 10].into();
    });
    assert!(matches!(e, ConfigError::OverlappingFields { .. }));
}

#[test]
fn out_of_range_fields_are_rejected() {
    let e = build_err(|d| {
        d.formats[0].fields[5].bits = [26, 32].into();
    });
    assert!(matches!(e, ConfigError::BadBitRange { .. }));
}

#[test]
fn format_width_must_be_whole_words() {
    let e = build_err(|d| d.formats[0].width = 40);
    assert!(matches!(e, ConfigError::FormatWidthMismatch { .. }));
}

#[test]
fn unknown_format_references_are_rejected() {
    let e = build_err(|d| d.instructions[1].format = "Q".to_string());
    assert!(matches!(e, ConfigError::UnknownFormat { .. }));
}

#[test]
fn unknown_signature_fields_are_rejected() {
    let e = build_err(|d| {
        d.instructions[1].signature.insert("mystery".to_string(), 1);
    });
    assert!(matches!(e, ConfigError::UnknownField { .. }));
}

#[test]
fn identical_signatures_in_one_format_are_rejected() {
    let e = build_err(|d| {
        let mut twin = d.instructions[1].clone();
        twin.name = "add2".to_string();
        twin.syntax.mnemonic = "add2".to_string();
        d.instructions.push(twin);
    });
    assert!(matches!(e, ConfigError::AmbiguousSignature { .. }));
}

#[test]
fn unknown_operations_are_rejected_at_build_time() {
    let e = build_err(|d| d.instructions[1].operations[0].op = "frobnicate".to_string());
    assert!(matches!(e, ConfigError::UnknownOperation { .. }));
}

#[test]
fn wrong_operand_counts_are_rejected_at_build_time() {
    let e = build_err(|d| {
        let _ = d.instructions[1].operations[0].args.pop();
    });
    assert!(matches!(e, ConfigError::BadOperandCount { .. }));
}

#[test]
fn unresolvable_operand_tokens_are_rejected() {
    let e = build_err(|d| {
        d.instructions[1].operations[0].args[2] = "$nosuch".to_string();
    });
    assert!(matches!(e, ConfigError::UnresolvableOperand { .. }));
}

#[test]
fn label_symbols_must_be_syntax_symbols() {
    let e = build_err(|d| {
        // `beq` is the first instruction carrying label metadata.
        let beq = d
            .instructions
            .iter_mut()
            .find(|i| i.name == "beq")
            .expect("demo has beq");
        beq.label.as_mut().expect("beq has a label").symbol = "nowhere".to_string();
    });
    assert!(matches!(e, ConfigError::UnknownLabelSymbol { .. }));
}

#[test]
fn multi_word_signatures_must_sit_in_the_first_word() {
    let e = build_err(|d| {
        let ldi = d
            .instructions
            .iter_mut()
            .find(|i| i.name == "ldi")
            .expect("demo has ldi");
        ldi.signature.insert("imm".to_string(), 0);
    });
    assert!(matches!(e, ConfigError::SignatureBeyondFirstWord { .. }));
}

#[test]
fn exactly_one_program_counter_is_required() {
    let e = build_err(|d| {
        d.registers.retain(|r| r.name.as_deref() != Some("pc"));
    });
    assert!(matches!(e, ConfigError::ProgramCounter { count: 0 }));
}

#[test]
fn duplicate_register_numbers_are_rejected() {
    let e = build_err(|d| {
        let mut twin = d.registers[3].clone();
        twin.name = Some("$dup".to_string());
        d.registers.push(twin);
    });
    assert!(matches!(e, ConfigError::DuplicateRegister { .. }));
}

#[test]
fn segments_outside_the_address_space_are_rejected() {
    let e = build_err(|d| d.memory.segments[0].bounds = [0, 0x1_0000]);
    assert!(matches!(e, ConfigError::BadSegment { .. }));
}

#[test]
fn bad_syntax_patterns_are_rejected() {
    let e = build_err(|d| d.instructions[1].syntax.pattern = "add (".to_string());
    assert!(matches!(e, ConfigError::BadPattern { .. }));
}

#[test]
fn an_empty_stage_list_is_rejected() {
    let e = build_err(|d| d.pipeline.stages.clear());
    assert!(matches!(e, ConfigError::NoStages));
}
