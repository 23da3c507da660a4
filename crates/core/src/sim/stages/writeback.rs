//! Writeback stage.
//!
//! Reserved: the stage participates in the pipeline's depth accounting but
//! has no default behavior. Machines give instructions writeback effects
//! through their operation lists instead.

use tracing::trace;

use crate::common::error::SimError;
use crate::sim::processor::Processor;

/// Executes the writeback stage.
pub fn writeback(_p: &mut Processor, index: usize) -> Result<(), SimError> {
    trace!(index, "writeback");
    Ok(())
}
