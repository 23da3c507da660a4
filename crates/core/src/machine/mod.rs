//! Machine state owned by one simulation run.
//!
//! This module provides:
//! 1. **Register file:** Numbered registers with width, profile, and privilege.
//! 2. **Memory engine:** A sparse, segmented, unit-addressable store.
//!
//! Both are owned collections inside the constructed machine; two simulator
//! instances in one process never share state.

/// Segmented, unit-addressable memory engine.
pub mod memory;
/// Keyed register file with name mapping.
pub mod registers;

pub use memory::{Endianness, Memory, Segment};
pub use registers::{Profile, Register, RegisterFile};
