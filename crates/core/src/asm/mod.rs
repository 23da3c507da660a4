//! The three-pass assembler.
//!
//! Translates symbolic source lines into machine words using the same ISA
//! description the processor decodes against:
//! 1. **Preprocess:** Strip comments, collapse whitespace, collect labels.
//! 2. **Link:** Resolve label references (absolute or relative) in place.
//! 3. **Encode:** Capture operand tokens, map them to fields, merge presets,
//!    and emit one word per machine word the format spans.
//!
//! Errors carry the offending source line; a failed assemble call leaves the
//! processor and memory untouched.

use std::collections::HashMap;

use tracing::debug;

use crate::common::bits;
use crate::common::error::AsmError;
use crate::isa::instruction::{InstructionDefinition, LabelMode};
use crate::isa::registry::IsaRegistry;
use crate::machine::memory::Memory;
use crate::machine::registers::RegisterFile;

/// One preprocessed instruction line.
#[derive(Debug, Clone)]
struct Line {
    /// 1-based line number in the original source.
    number: usize,
    /// Comment-stripped, whitespace-collapsed text.
    text: String,
}

/// A borrowed view of the machine data the assembler works against.
#[derive(Debug)]
pub struct Assembler<'a> {
    registry: &'a IsaRegistry,
    registers: &'a RegisterFile,
    memory: &'a Memory,
}

impl<'a> Assembler<'a> {
    /// Creates an assembler over a machine's registry, registers, and memory.
    pub fn new(
        registry: &'a IsaRegistry,
        registers: &'a RegisterFile,
        memory: &'a Memory,
    ) -> Self {
        Self {
            registry,
            registers,
            memory,
        }
    }

    /// Assembles source text into machine words.
    pub fn assemble(&self, source: &str) -> Result<Vec<u64>, AsmError> {
        let (lines, labels) = self.preprocess(source);
        let linked = self.link(lines, &labels)?;
        self.encode(&linked)
    }

    /// Pass one: strip comments and labels, collapse whitespace, and build
    /// the label table.
    ///
    /// A label on a line of its own attaches to the next instruction line.
    /// Labels map to instruction indices, which the link pass converts to
    /// addresses or line deltas.
    fn preprocess(&self, source: &str) -> (Vec<Line>, HashMap<String, usize>) {
        let lexical = self.registry.lexical();
        let mut lines = Vec::new();
        let mut labels = HashMap::new();

        for (i, raw) in source.lines().enumerate() {
            let stripped = lexical.comment.replace_all(raw, "");
            let mut text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
            let label = lexical
                .label
                .captures(&text)
                .and_then(|c| Some((c.get(1)?.as_str().to_string(), c.get(0)?.end())));
            if let Some((name, end)) = label {
                labels.insert(name, lines.len());
                text = text[end..].trim().to_string();
            }
            if text.is_empty() {
                continue;
            }
            lines.push(Line {
                number: i + 1,
                text,
            });
        }
        (lines, labels)
    }

    /// Pass two: substitute resolved label values into each line.
    fn link(
        &self,
        lines: Vec<Line>,
        labels: &HashMap<String, usize>,
    ) -> Result<Vec<Line>, AsmError> {
        let mut linked = Vec::with_capacity(lines.len());
        for (index, mut line) in lines.into_iter().enumerate() {
            let def = self.definition_for(&line)?;
            if let Some(label_ref) = &def.label {
                let position = def
                    .syntax
                    .bindings
                    .iter()
                    .position(|b| b.symbol == label_ref.symbol);
                if let Some(position) = position {
                    let captures = def.syntax.pattern.captures(&line.text).ok_or_else(|| {
                        AsmError::SyntaxMismatch {
                            line: line.number,
                            mnemonic: def.syntax.mnemonic.clone(),
                            text: line.text.clone(),
                        }
                    })?;
                    if let Some(capture) = captures.get(position + 1) {
                        let token = capture.as_str();
                        let hex_suffix = self.registry.lexical().hex_suffix.as_deref();
                        if bits::parse_int(token, hex_suffix).is_none() {
                            let target = *labels.get(token).ok_or_else(|| {
                                AsmError::UndefinedLabel {
                                    line: line.number,
                                    label: token.to_string(),
                                }
                            })?;
                            let resolved = self.resolve_label(label_ref.mode, target, index);
                            let mut text = line.text.clone();
                            text.replace_range(capture.range(), &resolved);
                            line.text = text;
                        }
                    }
                }
            }
            linked.push(line);
        }
        Ok(linked)
    }

    /// Formats a resolved label for substitution.
    ///
    /// Absolute references become the word's address in the text segment,
    /// rendered as word-width hex; relative references become the signed
    /// line delta as a plain integer.
    fn resolve_label(&self, mode: LabelMode, target: usize, current: usize) -> String {
        match mode {
            LabelMode::Absolute => {
                let base = self
                    .memory
                    .segment("text")
                    .map_or(0, |segment| segment.start);
                let address = base + target as u64 * self.memory.word_cells();
                bits::to_hex_string(address, self.registry.word_width())
            }
            LabelMode::Relative => (target as i64 - current as i64).to_string(),
        }
    }

    /// Pass three: encode each line into its format's machine words.
    fn encode(&self, lines: &[Line]) -> Result<Vec<u64>, AsmError> {
        let mut words = Vec::new();
        let hex_suffix = self.registry.lexical().hex_suffix.clone();
        for line in lines {
            let def = self.definition_for(line)?;
            let format = self
                .registry
                .format(&def.format)
                .ok_or_else(|| AsmError::SyntaxMismatch {
                    line: line.number,
                    mnemonic: def.syntax.mnemonic.clone(),
                    text: line.text.clone(),
                })?;
            let captures =
                def.syntax
                    .pattern
                    .captures(&line.text)
                    .ok_or_else(|| AsmError::SyntaxMismatch {
                        line: line.number,
                        mnemonic: def.syntax.mnemonic.clone(),
                        text: line.text.clone(),
                    })?;

            let mut raw: u128 = 0;
            for (field, value) in &def.presets {
                if let Some(range) = format.range_of(field) {
                    format.insert(&mut raw, range, *value);
                }
            }
            for (i, binding) in def.syntax.bindings.iter().enumerate() {
                let token = captures
                    .get(i + 1)
                    .map(|c| c.as_str())
                    .ok_or_else(|| AsmError::SyntaxMismatch {
                        line: line.number,
                        mnemonic: def.syntax.mnemonic.clone(),
                        text: line.text.clone(),
                    })?;
                let range =
                    format
                        .range_of(&binding.field)
                        .ok_or_else(|| AsmError::SyntaxMismatch {
                            line: line.number,
                            mnemonic: def.syntax.mnemonic.clone(),
                            text: line.text.clone(),
                        })?;
                let value = if let Some(number) = self.registers.number_of(token) {
                    i64::from(number)
                } else {
                    bits::parse_int(token, hex_suffix.as_deref()).ok_or_else(|| {
                        AsmError::BadToken {
                            line: line.number,
                            token: token.to_string(),
                        }
                    })?
                };
                let width = range.width();
                let fits = width >= 64
                    || (i128::from(value) >= -(1i128 << (width - 1))
                        && i128::from(value) < (1i128 << width));
                if !fits {
                    return Err(AsmError::FieldOverflow {
                        line: line.number,
                        value,
                        field: binding.field.clone(),
                        width,
                    });
                }
                format.insert(&mut raw, range, bits::to_unsigned(value, width.min(64)));
            }

            for chunk in 0..format.word_count {
                let shift = format.width - self.registry.word_width() * (chunk + 1);
                let word = (raw >> shift) as u64 & bits::mask(self.registry.word_width());
                words.push(word);
            }
        }
        debug!(lines = lines.len(), words = words.len(), "assembled");
        Ok(words)
    }

    /// Finds the instruction definition for a line's leading mnemonic.
    fn definition_for(&self, line: &Line) -> Result<&InstructionDefinition, AsmError> {
        let mnemonic = line
            .text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        self.registry
            .by_mnemonic(&mnemonic)
            .ok_or(AsmError::UnknownMnemonic {
                line: line.number,
                mnemonic,
                text: line.text.clone(),
            })
    }
}
