//! Data-driven instruction-set simulator library.
//!
//! This crate implements a configurable instruction-set simulator with the following:
//! 1. **ISA:** Table-driven formats, signatures, syntax patterns, and operation bindings.
//! 2. **Machine:** A keyed register file and a segmented, unit-addressable memory engine.
//! 3. **Execution:** A typed operation library (arithmetic, memory, comparison, branch, syscall).
//! 4. **Simulation:** A configurable fetch/decode/execute/writeback pipeline with breakpoints
//!    and synchronous state observers.
//! 5. **Assembly:** A three-pass assembler (preprocess, link, encode) driven by the same
//!    ISA description the processor decodes against.
//!
//! A machine is described as data (see [`config::MachineDescription`]), built once, then
//! driven cycle by cycle. Nothing in the crate is specific to any real silicon ISA.

/// Three-pass assembler over the registry's syntax data.
pub mod asm;
/// Common types (bit/number codec, errors, signals).
pub mod common;
/// Machine description document and its validating builder.
pub mod config;
/// Operation library (typed operands, operation kinds, handlers).
pub mod exec;
/// ISA description (bit ranges, formats, instruction definitions, registry).
pub mod isa;
/// Machine state (register file, segmented memory).
pub mod machine;
/// Pipelined processor, stage handlers, observers.
pub mod sim;

/// Root machine description; deserialize from JSON and call `build()`.
pub use crate::config::MachineDescription;
/// Main processor type; holds the registry, register file, memory, and pipeline.
pub use crate::sim::Processor;
