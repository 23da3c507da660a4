//! Instruction decode stage.
//!
//! Decode matches the record at this stage's pipeline position against every
//! known instruction signature and, for multi-word formats, completes the
//! record by fetching the remaining words before execute can see it.

use tracing::trace;

use crate::common::error::SimError;
use crate::sim::processor::Processor;

/// Executes the decode stage.
///
/// A record that was already decoded (combined fetch/decode machines) is left
/// alone. A record that is present but matches no signature has aged into the
/// decode stage undecodable, which is a hard fault.
pub fn decode(p: &mut Processor, index: usize) -> Result<(), SimError> {
    match p.pipeline.get(index) {
        None => Ok(()),
        Some(entry) if entry.instruction.is_some() => Ok(()),
        Some(_) => decode_record(p, index),
    }
}

/// Matches one record by signature and completes multi-word fetches.
///
/// Every known format is scanned in order; within a format, every definition
/// is tested by slicing the raw word at the signature fields' bit ranges. The
/// first exact match names the record's format and instruction. When the
/// matched format spans several machine words, the remaining words are
/// fetched now, concatenated most significant first, and the PC advances once
/// per extra word, so the full value is in place before execute runs.
pub(crate) fn decode_record(p: &mut Processor, index: usize) -> Result<(), SimError> {
    let entry = match p.pipeline.get(index) {
        Some(entry) => entry,
        None => return Ok(()),
    };
    let first_word = entry.raw as u64;
    let (format_name, instruction_name, word_count) = match p.registry.match_word(first_word) {
        Some((format, def)) => (format.name.clone(), def.name.clone(), format.word_count),
        None => {
            return Err(SimError::OpcodeNotFound { word: entry.raw });
        }
    };
    trace!(instruction = %instruction_name, format = %format_name, "decode");

    for _ in 1..word_count {
        let pc_value = p.registers.get(p.pc)?;
        let address = if p.flags.fetch_advances_pc {
            pc_value
        } else {
            pc_value.wrapping_add(p.word_spacing)
        };
        let word = p.memory.get_word(address, p.registry.word_width(), true)?;
        let entry = &mut p.pipeline[index];
        entry.raw = (entry.raw << p.registry.word_width()) | u128::from(word);
        entry.words += 1;
        p.registers.advance(p.pc, p.word_spacing as i64)?;
    }

    let entry = &mut p.pipeline[index];
    entry.format = Some(format_name);
    entry.instruction = Some(instruction_name);
    Ok(())
}
