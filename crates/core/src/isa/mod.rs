//! ISA description: formats, instruction definitions, and their registry.
//!
//! Everything in this module is data. The processor and the assembler treat an
//! [`IsaRegistry`] as a read-only lookup table; all decode and encode behavior
//! lives with them, not here.

/// Bit-layout formats (field name to bit-range tables).
pub mod format;
/// Instruction definitions (signatures, presets, syntax, operations).
pub mod instruction;
/// The validating container for formats and instructions.
pub mod registry;

pub use format::{BitRange, FieldSpec, InstructionFormat};
pub use instruction::{InstructionDefinition, LabelMode, LabelRef, OpInvocation, SymbolBinding, Syntax};
pub use registry::{IsaRegistry, Lexical};
