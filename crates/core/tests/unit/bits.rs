//! Bit/Number Codec Tests.
//!
//! Verifies that the two's-complement codec performs:
//!   1. Sign round-trip — `to_signed(to_unsigned(x, w), w) == x` over the
//!      whole representable range, at every width
//!   2. Width masking — values wrap at the target width
//!   3. Token parsing — decimal, `0x` hex, and suffix hex spellings

use isasim_core::common::bits;
use proptest::prelude::*;

proptest! {
    #[test]
    fn sign_round_trip_all_widths(width in 1u32..=64, raw in any::<i64>()) {
        let (lo, hi) = if width == 64 {
            (i64::MIN, i64::MAX)
        } else {
            (-(1i64 << (width - 1)), (1i64 << (width - 1)) - 1)
        };
        // Fold the arbitrary value into the representable range.
        let span = (hi as i128) - (lo as i128) + 1;
        let value = (lo as i128 + (raw as i128).rem_euclid(span)) as i64;
        prop_assert_eq!(bits::to_signed(bits::to_unsigned(value, width), width), value);
    }

    #[test]
    fn encoded_words_stay_in_width(value in any::<i64>(), width in 1u32..=63) {
        let word = bits::to_unsigned(value, width);
        prop_assert!(word <= bits::mask(width));
    }
}

#[test]
fn width_one_represents_zero_and_minus_one() {
    assert_eq!(bits::to_unsigned(-1, 1), 1);
    assert_eq!(bits::to_signed(1, 1), -1);
    assert_eq!(bits::to_signed(0, 1), 0);
}

#[test]
fn suffix_hex_requires_the_configured_suffix() {
    assert_eq!(bits::parse_int("FFh", Some("h")), Some(255));
    assert_eq!(bits::parse_int("FFh", None), None);
    assert_eq!(bits::parse_int("0xFF", None), Some(255));
}

#[test]
fn hex_rendering_matches_word_width() {
    assert_eq!(bits::to_hex_string(0x2C, 32), "0x0000002c");
    assert_eq!(bits::to_hex_string(0x2C, 8), "0x2c");
}
