//! Instruction fetch stage.
//!
//! Fetch reads one machine word at the program counter and pushes a fresh
//! record onto the front of the pipeline. Machines whose fetch advances the
//! PC do so here, and the advancement is remembered for the rest of the cycle
//! so relative branches can compensate. Machines with a combined
//! fetch/decode run the decode handler immediately on the new record.

use tracing::trace;

use crate::common::error::SimError;
use crate::sim::processor::{PipelineEntry, Processor};
use crate::sim::stages::decode::decode_record;

/// Executes the fetch stage.
pub fn fetch(p: &mut Processor, _index: usize) -> Result<(), SimError> {
    let pc_value = p.registers.get(p.pc)?;
    let word = p.memory.get_word(pc_value, p.registry.word_width(), true)?;
    trace!(pc = pc_value, word, "fetch");
    p.pipeline.push_front(PipelineEntry {
        raw: u128::from(word),
        words: 1,
        ..PipelineEntry::default()
    });
    if p.flags.fetch_advances_pc {
        p.registers.advance(p.pc, p.word_spacing as i64)?;
        p.pc_advanced_this_cycle = true;
    }
    if p.flags.fetch_decodes {
        decode_record(p, 0)?;
    }
    Ok(())
}
