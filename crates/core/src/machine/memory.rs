//! The segmented memory engine.
//!
//! Storage is a sparse map from address to one addressable unit's worth of
//! bits. Any address inside the configured space reads as zero until written;
//! a first read materializes the zero so observers see what the program has
//! touched. Multi-unit words are composed and decomposed in the configured
//! endianness. Named segments bound the regions a loader may fill.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::common::bits;
use crate::common::error::{ConfigError, SimError};

/// Byte-order used to compose and decompose multi-unit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    /// Most significant unit at the lowest address.
    #[default]
    Big,
    /// Least significant unit at the lowest address.
    Little,
}

/// A named, inclusive sub-range of the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// First address of the segment.
    pub start: u64,
    /// Last address of the segment (inclusive).
    pub end: u64,
}

/// The sparse, segmented, unit-addressable store.
#[derive(Debug)]
pub struct Memory {
    low: u64,
    high: u64,
    unit: u32,
    word_width: u32,
    endianness: Endianness,
    cells: BTreeMap<u64, u64>,
    segments: BTreeMap<String, Segment>,
}

impl Memory {
    /// Creates a memory over the inclusive address space `[low, high]`.
    ///
    /// `unit` is the addressable unit in bits (typically 8); `word_width` is
    /// the machine word in bits and must be a positive multiple of the unit.
    pub fn new(
        low: u64,
        high: u64,
        unit: u32,
        word_width: u32,
        endianness: Endianness,
    ) -> Result<Self, ConfigError> {
        if low > high {
            return Err(ConfigError::BadAddressSpace { low, high });
        }
        if unit == 0 || unit > 64 || word_width == 0 || word_width > 64 || word_width % unit != 0 {
            return Err(ConfigError::BadWordWidth { word_width, unit });
        }
        Ok(Self {
            low,
            high,
            unit,
            word_width,
            endianness,
            cells: BTreeMap::new(),
            segments: BTreeMap::new(),
        })
    }

    /// The addressable unit in bits.
    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// The machine word width in bits.
    pub fn word_width(&self) -> u32 {
        self.word_width
    }

    /// The machine word's span in storage cells (the word spacing).
    pub fn word_cells(&self) -> u64 {
        u64::from(self.word_width / self.unit)
    }

    /// The inclusive address-space bounds.
    pub fn bounds(&self) -> (u64, u64) {
        (self.low, self.high)
    }

    /// Adds a named segment after validating its bounds lie in the space.
    pub fn add_segment(&mut self, name: &str, start: u64, end: u64) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyName { kind: "segment" });
        }
        if start > end || start < self.low || end > self.high {
            return Err(ConfigError::BadSegment {
                name: name.to_string(),
                start,
                end,
            });
        }
        if self.segments.contains_key(name) {
            return Err(ConfigError::Duplicate {
                kind: "segment",
                name: name.to_string(),
            });
        }
        self.segments.insert(name.to_string(), Segment { start, end });
        Ok(())
    }

    /// Looks up a segment by name.
    pub fn segment(&self, name: &str) -> Option<Segment> {
        self.segments.get(name).copied()
    }

    /// Validates an access and returns its span in cells.
    fn span(&self, offset: u64, size: u32, aligned: bool) -> Result<u64, SimError> {
        if size < self.unit || size % self.unit != 0 {
            return Err(SimError::Addressing {
                size,
                unit: self.unit,
            });
        }
        let cells = u64::from(size / self.unit);
        if aligned && offset % cells != 0 {
            return Err(SimError::Alignment { offset, cells });
        }
        if offset < self.low || offset.checked_add(cells - 1).is_none_or(|last| last > self.high)
        {
            let address = if offset < self.low { offset } else { self.high.wrapping_add(1) };
            debug!(offset, cells, "access outside the address space");
            return Err(SimError::Segmentation { address });
        }
        Ok(cells)
    }

    /// Reads a `size`-bit word starting at `offset`.
    ///
    /// Unwritten cells read as zero and are materialized on first read, so
    /// reads never change what a program observes, only internal storage.
    pub fn get_word(&mut self, offset: u64, size: u32, aligned: bool) -> Result<u64, SimError> {
        let cells = self.span(offset, size, aligned)?;
        let mut word: u64 = 0;
        for i in 0..cells {
            let address = offset + self.position(i, cells);
            let cell = *self.cells.entry(address).or_insert(0);
            word = (word << self.unit) | cell;
        }
        Ok(word)
    }

    /// Writes a `size`-bit word starting at `offset`.
    pub fn set_word(
        &mut self,
        offset: u64,
        value: u64,
        size: u32,
        aligned: bool,
    ) -> Result<(), SimError> {
        let cells = self.span(offset, size, aligned)?;
        let unit_mask = bits::mask(self.unit);
        for i in 0..cells {
            let address = offset + self.position(i, cells);
            let shift = (cells - 1 - i) * u64::from(self.unit);
            let cell = (value >> shift) & unit_mask;
            self.cells.insert(address, cell);
        }
        Ok(())
    }

    /// Maps a most-significant-first unit index to its address offset under
    /// the configured endianness.
    fn position(&self, index: u64, cells: u64) -> u64 {
        match self.endianness {
            Endianness::Big => index,
            Endianness::Little => cells - 1 - index,
        }
    }

    /// Writes a program's words sequentially into the `text` segment.
    ///
    /// Words land at the segment base and advance by the word spacing; a word
    /// that would cross the segment's end is a segmentation fault. When
    /// `and_wipe` is set, all storage is cleared first.
    pub fn load_text(&mut self, words: &[u64], and_wipe: bool) -> Result<(), SimError> {
        let segment = self
            .segment("text")
            .ok_or_else(|| SimError::UnknownSegment {
                name: "text".to_string(),
            })?;
        if and_wipe {
            self.cells.clear();
        }
        let spacing = self.word_cells();
        for (i, &word) in words.iter().enumerate() {
            let offset = segment.start + i as u64 * spacing;
            if offset + spacing - 1 > segment.end {
                return Err(SimError::Segmentation { address: offset });
            }
            self.set_word(offset, word, self.word_width, true)?;
        }
        debug!(words = words.len(), base = segment.start, "text segment loaded");
        Ok(())
    }

    /// Clears all storage. Segment definitions are kept.
    pub fn reset(&mut self) {
        self.cells.clear();
    }

    /// The materialized cells, keyed by address.
    pub fn cells(&self) -> &BTreeMap<u64, u64> {
        &self.cells
    }
}
