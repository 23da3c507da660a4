//! Signature Decode Tests.
//!
//! Verifies that `match_word` performs:
//!   1. Exact signature matching — format and instruction names by bit slice
//!   2. First-match-wins scanning across formats
//!   3. No match for words outside every signature
//!   4. Multi-word formats matched on their first word alone

use pretty_assertions::assert_eq;

use crate::common::fixtures::demo_processor;

#[test]
fn the_reference_add_word_decodes() {
    let processor = demo_processor();
    let (format, def) = processor
        .registry()
        .match_word(0b00000010001100100100000000100000)
        .expect("add decodes");
    assert_eq!(format.name, "R");
    assert_eq!(def.name, "add");

    let fields = format.decode_fields(u128::from(0x02324020u32));
    assert_eq!(fields["s"], 17);
    assert_eq!(fields["t"], 18);
    assert_eq!(fields["d"], 8);
    assert_eq!(fields["shamt"], 0);
    assert_eq!(fields["funct"], 32);
}

#[test]
fn the_zero_word_decodes_as_nop() {
    let processor = demo_processor();
    let (_, def) = processor.registry().match_word(0).expect("zero decodes");
    assert_eq!(def.name, "nop");
}

#[test]
fn signature_distinguishes_within_a_format() {
    let processor = demo_processor();
    // Same opcode (0), different funct values.
    let sub = 0x02324022u64; // funct 34
    let (_, def) = processor.registry().match_word(sub).expect("sub decodes");
    assert_eq!(def.name, "sub");
    let slt = 0x0232402Au64; // funct 42
    let (_, def) = processor.registry().match_word(slt).expect("slt decodes");
    assert_eq!(def.name, "slt");
}

#[test]
fn unknown_words_match_nothing() {
    let processor = demo_processor();
    // Opcode 62 is unassigned in the demo machine.
    assert!(processor.registry().match_word(0xF800_0000).is_none());
}

#[test]
fn multi_word_formats_match_on_the_first_word() {
    let processor = demo_processor();
    // ldi's first word: opcode 63 in the top six bits.
    let first = 0xFC00_0000u64 | (9 << 21);
    let (format, def) = processor.registry().match_word(first).expect("ldi decodes");
    assert_eq!(def.name, "ldi");
    assert_eq!(format.word_count, 2);
}
