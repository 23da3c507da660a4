//! Instruction bit-layout formats.
//!
//! A format names a bit width and an ordered field table. Bit positions are
//! most-significant-bit-first: position 0 is the top bit of the (possibly
//! multi-word) encoding, and a field's `[start, end]` range is inclusive at
//! both ends. Formats wider than the machine word span several words; the
//! first fetched word occupies the most significant positions.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::common::error::ConfigError;

/// An inclusive bit range within a format, most-significant-bit-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[u32; 2]")]
pub struct BitRange {
    /// Most significant bit position (inclusive).
    pub start: u32,
    /// Least significant bit position (inclusive).
    pub end: u32,
}

impl From<[u32; 2]> for BitRange {
    fn from([start, end]: [u32; 2]) -> Self {
        Self { start, end }
    }
}

impl BitRange {
    /// The range's width in bits.
    pub fn width(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// A named field and the bits it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within its format.
    pub name: String,
    /// The bits the field occupies.
    pub bits: BitRange,
}

/// A named bit layout spanning one or more machine words.
#[derive(Debug, Clone, Deserialize)]
pub struct InstructionFormat {
    /// Format name, unique within the registry.
    pub name: String,
    /// Total width in bits; equals `word_count` machine words.
    pub width: u32,
    /// Ordered field table.
    pub fields: Vec<FieldSpec>,
    /// How many machine words the format spans.
    #[serde(default = "InstructionFormat::default_word_count")]
    pub word_count: u32,
}

impl InstructionFormat {
    /// Single-word is the default span.
    fn default_word_count() -> u32 {
        1
    }

    /// Validates the format against the machine's base word width.
    ///
    /// Rejects empty names, a width that is not `word_count` whole words,
    /// field ranges that are inverted, wider than 64 bits, or outside the
    /// format, and any pair of overlapping fields.
    pub fn validate(&self, word_width: u32) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName { kind: "format" });
        }
        if self.word_count == 0 || self.width != self.word_count * word_width {
            return Err(ConfigError::FormatWidthMismatch {
                format: self.name.clone(),
                width: self.width,
                word_count: self.word_count,
                word_width,
            });
        }
        for (i, field) in self.fields.iter().enumerate() {
            let r = field.bits;
            if r.start > r.end || r.end >= self.width || r.width() > 64 {
                return Err(ConfigError::BadBitRange {
                    format: self.name.clone(),
                    field: field.name.clone(),
                    start: r.start,
                    end: r.end,
                    width: self.width,
                });
            }
            for other in &self.fields[..i] {
                if field.name == other.name {
                    return Err(ConfigError::Duplicate {
                        kind: "field",
                        name: field.name.clone(),
                    });
                }
                if r.start <= other.bits.end && other.bits.start <= r.end {
                    return Err(ConfigError::OverlappingFields {
                        format: self.name.clone(),
                        first: other.name.clone(),
                        second: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Looks up a field's bit range by name.
    pub fn range_of(&self, field: &str) -> Option<BitRange> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.bits)
    }

    /// Extracts one field from a raw encoding.
    pub fn extract(&self, raw: u128, range: BitRange) -> u64 {
        let shifted = raw >> (self.width - 1 - range.end);
        let width = range.width();
        let mask = if width >= 128 {
            u128::MAX
        } else {
            (1u128 << width) - 1
        };
        (shifted & mask) as u64
    }

    /// Writes one field's value into a raw encoding under construction.
    ///
    /// The value is truncated to the field's width.
    pub fn insert(&self, raw: &mut u128, range: BitRange, value: u64) {
        let width = range.width();
        let mask = if width >= 128 {
            u128::MAX
        } else {
            (1u128 << width) - 1
        };
        let shift = self.width - 1 - range.end;
        *raw &= !(mask << shift);
        *raw |= ((value as u128) & mask) << shift;
    }

    /// Slices a full raw encoding into a field-name to value map.
    pub fn decode_fields(&self, raw: u128) -> BTreeMap<String, u64> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), self.extract(raw, f.bits)))
            .collect()
    }
}
