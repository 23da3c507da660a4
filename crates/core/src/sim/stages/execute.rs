//! Instruction execute stage.
//!
//! Execute re-slices the record's full raw value into its field map and runs
//! the instruction's operation list in order under the blocking protocol: a
//! `Blocked` result skips exactly the next operation, then the skip is
//! cleared. A raised signal stops the list and surfaces through the cycle's
//! outcome.

use tracing::trace;

use crate::common::error::SimError;
use crate::exec::{self, Flow, OpContext};
use crate::sim::processor::Processor;

/// Executes the execute stage.
pub fn execute(p: &mut Processor, index: usize) -> Result<(), SimError> {
    let Processor {
        ref registry,
        ref mut registers,
        ref mut memory,
        ref mut pipeline,
        ref flags,
        ref mut pending_signal,
        pc,
        word_spacing,
        pc_advanced_this_cycle,
        ..
    } = *p;

    let entry = match pipeline.get_mut(index) {
        Some(entry) => entry,
        None => return Ok(()),
    };
    let Some(instruction_name) = entry.instruction.clone() else {
        return Ok(());
    };
    let Some(def) = registry.instruction(&instruction_name) else {
        return Ok(());
    };
    let Some(format) = registry.format(&def.format) else {
        return Ok(());
    };

    entry.fields = format.decode_fields(entry.raw);
    // The record's pipeline position, plus one when this cycle's fetch has
    // already moved the PC past one more word.
    let branch_offset = index as i64 + i64::from(pc_advanced_this_cycle);
    trace!(instruction = %instruction_name, branch_offset, "execute");

    let mut ctx = OpContext {
        registers: &mut *registers,
        memory: &mut *memory,
        format,
        fields: &entry.fields,
        branch_offset,
        word_spacing,
        pc,
        word_width: registry.word_width(),
    };

    let mut skip_next = false;
    for invocation in &def.operations {
        if skip_next {
            skip_next = false;
            trace!(operation = ?invocation.kind, "operation skipped");
            continue;
        }
        match exec::dispatch(invocation.kind, &invocation.operands, &mut ctx)? {
            Flow::Proceed => {}
            Flow::Blocked => skip_next = true,
            Flow::Raise(signal) => {
                *pending_signal = Some(signal);
                break;
            }
        }
    }

    if flags.execute_advances_pc {
        registers.advance(pc, word_spacing as i64)?;
    }
    Ok(())
}
