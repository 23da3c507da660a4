//! The ISA registry.
//!
//! A pure data container with validating setters and read accessors. The
//! registry holds the machine's formats, instruction definitions, and the
//! lexical data the assembler needs (comment and label patterns, hex suffix),
//! plus the base word width everything is measured against. Decode and encode
//! logic lives in the processor and the assembler, which treat the registry
//! as read-only.

use std::collections::HashMap;

use regex::Regex;

use crate::common::error::ConfigError;
use crate::isa::format::InstructionFormat;
use crate::isa::instruction::InstructionDefinition;

/// Lexical conventions of the ISA's assembly dialect.
#[derive(Debug, Clone)]
pub struct Lexical {
    /// Comment pattern; matches are stripped before any other pass.
    pub comment: Regex,
    /// Label-definition pattern; capture group 1 is the label name.
    pub label: Regex,
    /// Optional hex suffix (for example `h`) accepted on integer tokens.
    pub hex_suffix: Option<String>,
}

/// The validating container for an ISA description.
#[derive(Debug)]
pub struct IsaRegistry {
    word_width: u32,
    lexical: Lexical,
    formats: Vec<InstructionFormat>,
    format_index: HashMap<String, usize>,
    instructions: Vec<InstructionDefinition>,
    instruction_index: HashMap<String, usize>,
    mnemonic_index: HashMap<String, usize>,
    by_format: HashMap<String, Vec<usize>>,
}

impl IsaRegistry {
    /// Creates an empty registry for a machine with the given base word width.
    pub fn new(word_width: u32, lexical: Lexical) -> Self {
        Self {
            word_width,
            lexical,
            formats: Vec::new(),
            format_index: HashMap::new(),
            instructions: Vec::new(),
            instruction_index: HashMap::new(),
            mnemonic_index: HashMap::new(),
            by_format: HashMap::new(),
        }
    }

    /// The machine's base word width in bits.
    pub fn word_width(&self) -> u32 {
        self.word_width
    }

    /// The assembly dialect's lexical conventions.
    pub fn lexical(&self) -> &Lexical {
        &self.lexical
    }

    /// Adds a format, validating it and rejecting duplicates.
    pub fn add_format(&mut self, format: InstructionFormat) -> Result<(), ConfigError> {
        format.validate(self.word_width)?;
        if self.format_index.contains_key(&format.name) {
            return Err(ConfigError::Duplicate {
                kind: "format",
                name: format.name.clone(),
            });
        }
        self.format_index.insert(format.name.clone(), self.formats.len());
        self.by_format.insert(format.name.clone(), Vec::new());
        self.formats.push(format);
        Ok(())
    }

    /// Adds a resolved instruction definition.
    ///
    /// Rejects empty or duplicate names and mnemonics, references to unknown
    /// formats or fields, signature fields a first-word decoder cannot see,
    /// and a signature identical to another instruction of the same format.
    pub fn add_instruction(&mut self, def: InstructionDefinition) -> Result<(), ConfigError> {
        if def.name.is_empty() {
            return Err(ConfigError::EmptyName { kind: "instruction" });
        }
        if self.instruction_index.contains_key(&def.name) {
            return Err(ConfigError::Duplicate {
                kind: "instruction",
                name: def.name.clone(),
            });
        }
        if self.mnemonic_index.contains_key(&def.syntax.mnemonic) {
            return Err(ConfigError::Duplicate {
                kind: "mnemonic",
                name: def.syntax.mnemonic.clone(),
            });
        }
        let format = self
            .format(&def.format)
            .ok_or_else(|| ConfigError::UnknownFormat {
                instruction: def.name.clone(),
                format: def.format.clone(),
            })?;

        for field in def.signature.keys().chain(def.presets.keys()) {
            if format.range_of(field).is_none() {
                return Err(ConfigError::UnknownField {
                    instruction: def.name.clone(),
                    field: field.clone(),
                });
            }
        }
        for binding in &def.syntax.bindings {
            if format.range_of(&binding.field).is_none() {
                return Err(ConfigError::UnknownField {
                    instruction: def.name.clone(),
                    field: binding.field.clone(),
                });
            }
        }
        if let Some(label) = &def.label {
            if !def.syntax.bindings.iter().any(|b| b.symbol == label.symbol) {
                return Err(ConfigError::UnknownLabelSymbol {
                    instruction: def.name.clone(),
                    symbol: label.symbol.clone(),
                });
            }
        }
        // Signatures are matched against the first fetched word only.
        if format.word_count > 1 {
            for field in def.signature.keys() {
                if let Some(range) = format.range_of(field) {
                    if range.end >= self.word_width {
                        return Err(ConfigError::SignatureBeyondFirstWord {
                            instruction: def.name.clone(),
                            field: field.clone(),
                        });
                    }
                }
            }
        }
        for &idx in &self.by_format[&def.format] {
            let other = &self.instructions[idx];
            if other.signature == def.signature {
                return Err(ConfigError::AmbiguousSignature {
                    format: def.format.clone(),
                    first: other.name.clone(),
                    second: def.name.clone(),
                });
            }
        }

        let slot = self.instructions.len();
        self.instruction_index.insert(def.name.clone(), slot);
        self.mnemonic_index.insert(def.syntax.mnemonic.clone(), slot);
        if let Some(members) = self.by_format.get_mut(&def.format) {
            members.push(slot);
        }
        self.instructions.push(def);
        Ok(())
    }

    /// Looks up a format by name.
    pub fn format(&self, name: &str) -> Option<&InstructionFormat> {
        self.format_index.get(name).map(|&i| &self.formats[i])
    }

    /// All formats, in insertion order.
    pub fn formats(&self) -> &[InstructionFormat] {
        &self.formats
    }

    /// Looks up an instruction definition by name.
    pub fn instruction(&self, name: &str) -> Option<&InstructionDefinition> {
        self.instruction_index.get(name).map(|&i| &self.instructions[i])
    }

    /// Looks up an instruction definition by mnemonic.
    pub fn by_mnemonic(&self, mnemonic: &str) -> Option<&InstructionDefinition> {
        self.mnemonic_index.get(mnemonic).map(|&i| &self.instructions[i])
    }

    /// Matches a fetched word against every format's instruction signatures.
    ///
    /// Formats are scanned in insertion order, instructions within a format
    /// likewise; the first exact signature match wins. For formats wider than
    /// one word the fetched word is aligned to the most significant positions,
    /// where every signature field is guaranteed to live.
    pub fn match_word(&self, word: u64) -> Option<(&InstructionFormat, &InstructionDefinition)> {
        for format in &self.formats {
            let aligned = (word as u128) << (format.width - self.word_width);
            for &idx in &self.by_format[&format.name] {
                let def = &self.instructions[idx];
                let hit = def.signature.iter().all(|(field, expected)| {
                    format
                        .range_of(field)
                        .is_some_and(|r| format.extract(aligned, r) == *expected)
                });
                if hit {
                    return Some((format, def));
                }
            }
        }
        None
    }
}
