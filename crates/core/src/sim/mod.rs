//! The pipelined processor.
//!
//! This module drives simulation. It provides:
//! 1. **Processor:** Owns the registry, register file, memory, pipeline,
//!    breakpoints, and observers for one simulation run.
//! 2. **Stages:** Free-function handlers for fetch, decode, execute, and
//!    writeback, dispatched per configured stage each cycle.
//! 3. **Observers:** Synchronous listeners receiving register, memory, and
//!    pipeline snapshots after every cycle and reset.

/// Observer trait and state snapshots.
pub mod observer;
/// Processor state and the cycle driver.
pub mod processor;
/// Pipeline stage handlers.
pub mod stages;

pub use observer::{Observer, StateSnapshot};
pub use processor::{CycleOutcome, PipelineEntry, PipelineFlags, Processor, StageKind};
