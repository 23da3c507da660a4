//! Memory Engine Tests.
//!
//! Verifies that the memory engine performs:
//!   1. Word round-trips — `get_word` returns what `set_word` stored, for
//!      every unit-multiple size at every aligned offset
//!   2. Fault taxonomy — addressing, alignment, and segmentation failures
//!      exactly where the contract places them
//!   3. Text loading — sequential placement from the segment base, fault at
//!      the segment's end, optional wipe
//!   4. Reset — storage cleared, segments kept

use isasim_core::common::error::{ConfigError, SimError};
use isasim_core::machine::{Endianness, Memory};
use pretty_assertions::assert_eq;

fn mem() -> Memory {
    let mut m = Memory::new(0, 0xFFFF, 8, 32, Endianness::Big).unwrap();
    m.add_segment("text", 0, 0xFF).unwrap();
    m.add_segment("data", 0x100, 0x1FF).unwrap();
    m
}

#[test]
fn round_trips_for_every_unit_multiple_size() {
    let mut m = mem();
    for size in [8u32, 16, 24, 32] {
        let cells = u64::from(size / 8);
        for i in 0..16u64 {
            let offset = i * cells;
            let value = 0x1122_3344u64 & isasim_core::common::bits::mask(size);
            m.set_word(offset, value, size, true).unwrap();
            assert_eq!(m.get_word(offset, size, true).unwrap(), value, "size {size}");
        }
    }
}

#[test]
fn size_below_or_off_the_unit_is_an_addressing_error() {
    let mut m = mem();
    assert!(matches!(m.get_word(0, 4, true), Err(SimError::Addressing { .. })));
    assert!(matches!(m.set_word(0, 0, 4, true), Err(SimError::Addressing { .. })));
    assert!(matches!(m.get_word(0, 20, true), Err(SimError::Addressing { .. })));
}

#[test]
fn misalignment_is_an_alignment_error_only_when_requested() {
    let mut m = mem();
    assert!(matches!(
        m.get_word(2, 32, true),
        Err(SimError::Alignment { offset: 2, cells: 4 })
    ));
    m.set_word(2, 0xAABBCCDD, 32, false).unwrap();
    assert_eq!(m.get_word(2, 32, false).unwrap(), 0xAABBCCDD);
}

#[test]
fn any_touched_address_outside_the_space_faults() {
    let mut m = mem();
    // Entirely outside.
    assert!(matches!(
        m.get_word(0x1_0000, 32, true),
        Err(SimError::Segmentation { .. })
    ));
    // Straddling the high bound.
    assert!(matches!(
        m.set_word(0xFFFE, 0, 32, false),
        Err(SimError::Segmentation { .. })
    ));
}

#[test]
fn segments_must_fit_the_address_space() {
    let mut m = mem();
    assert!(matches!(
        m.add_segment("bad", 0x8000, 0x1_0000),
        Err(ConfigError::BadSegment { .. })
    ));
    assert!(matches!(
        m.add_segment("inverted", 0x20, 0x10),
        Err(ConfigError::BadSegment { .. })
    ));
    assert!(matches!(
        m.add_segment("text", 0, 0xFF),
        Err(ConfigError::Duplicate { .. })
    ));
}

#[test]
fn load_text_places_words_from_the_segment_base() {
    let mut m = mem();
    m.load_text(&[0x11111111, 0x22222222, 0x33333333], false).unwrap();
    assert_eq!(m.get_word(0, 32, true).unwrap(), 0x11111111);
    assert_eq!(m.get_word(4, 32, true).unwrap(), 0x22222222);
    assert_eq!(m.get_word(8, 32, true).unwrap(), 0x33333333);
}

#[test]
fn load_text_faults_past_the_segment_end() {
    let mut m = mem();
    // The text segment holds exactly 64 words.
    let words = vec![0u64; 65];
    assert!(matches!(
        m.load_text(&words, false),
        Err(SimError::Segmentation { address: 0x100 })
    ));
}

#[test]
fn load_text_can_wipe_first() {
    let mut m = mem();
    m.set_word(0x100, 0xDEAD, 16, true).unwrap();
    m.load_text(&[0x1], true).unwrap();
    assert!(!m.cells().contains_key(&0x100));
    m.set_word(0x100, 0xDEAD, 16, true).unwrap();
    m.load_text(&[0x2], false).unwrap();
    assert_eq!(m.get_word(0x100, 16, true).unwrap(), 0xDEAD);
}

#[test]
fn load_text_requires_a_text_segment() {
    let mut m = Memory::new(0, 0xFF, 8, 32, Endianness::Big).unwrap();
    assert!(matches!(
        m.load_text(&[0], false),
        Err(SimError::UnknownSegment { .. })
    ));
}

#[test]
fn reset_clears_storage_but_not_segments() {
    let mut m = mem();
    m.set_word(0x10, 0xAB, 8, true).unwrap();
    m.reset();
    assert!(m.cells().is_empty());
    assert!(m.segment("text").is_some());
    assert!(m.segment("data").is_some());
}
