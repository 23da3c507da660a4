//! Machine description and its validating builder.
//!
//! A [`MachineDescription`] is the serde mirror of everything a simulation
//! run needs: the ISA's lexical conventions, formats, instructions, the
//! register file, the memory map, and the pipeline stage list. `build()`
//! performs every configuration-time validation - unknown fields, formats,
//! registers, and operations all fail here, before the first cycle - and
//! yields a ready [`Processor`].
//!
//! # Examples
//!
//! Building a minimal machine from JSON:
//!
//! ```
//! use isasim_core::MachineDescription;
//!
//! let json = r#"{
//!     "name": "tiny",
//!     "isa": { "word_width": 16 },
//!     "formats": [
//!         { "name": "A", "width": 16, "fields": [
//!             { "name": "opcode", "bits": [0, 7] },
//!             { "name": "imm", "bits": [8, 15] } ] }
//!     ],
//!     "instructions": [
//!         { "name": "halt", "format": "A",
//!           "signature": { "opcode": 0 },
//!           "presets": { "opcode": 0, "imm": 0 },
//!           "syntax": { "mnemonic": "halt", "pattern": "halt", "symbols": [] },
//!           "operations": [ { "op": "syscall", "args": ["0"] } ] }
//!     ],
//!     "registers": [
//!         { "number": 0, "name": "r0", "width": 16 },
//!         { "number": 1, "name": "pc", "width": 16,
//!           "profile": "program_counter", "writable": false }
//!     ],
//!     "memory": { "address_space": [0, 255],
//!                 "segments": [ { "name": "text", "bounds": [0, 127] } ] },
//!     "pipeline": { "stages": ["fetch", "decode", "execute"],
//!                   "fetch_advances_pc": true }
//! }"#;
//!
//! let description: MachineDescription = serde_json::from_str(json).unwrap();
//! let processor = description.build().unwrap();
//! assert_eq!(processor.word_spacing(), 2);
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::common::bits;
use crate::common::error::ConfigError;
use crate::exec::{OpKind, Operand};
use crate::isa::format::InstructionFormat;
use crate::isa::instruction::{
    InstructionDefinition, LabelRef, OpInvocation, SymbolBinding, Syntax,
};
use crate::isa::registry::{IsaRegistry, Lexical};
use crate::machine::memory::{Endianness, Memory};
use crate::machine::registers::{Profile, Register, RegisterFile};
use crate::sim::processor::{PipelineFlags, Processor, StageKind};

/// Default values for the optional description sections.
mod defaults {
    /// Base machine word width in bits.
    pub const WORD_WIDTH: u32 = 32;

    /// Register width in bits when a register entry does not give one.
    pub const REGISTER_WIDTH: u32 = 32;

    /// Addressable unit in bits.
    pub const UNIT: u32 = 8;

    /// Comment pattern: `#` to end of line.
    pub const COMMENT_PATTERN: &str = "#.*";

    /// Label-definition pattern: an identifier followed by a colon, at the
    /// start of the line; capture group 1 is the label name.
    pub const LABEL_PATTERN: &str = r"^([A-Za-z_]\w*):";
}

/// Lexical and word-size conventions of the described ISA.
#[derive(Debug, Clone, Deserialize)]
pub struct IsaSection {
    /// Base machine word width in bits.
    #[serde(default = "IsaSection::default_word_width")]
    pub word_width: u32,

    /// Comment pattern stripped before any other assembler pass.
    #[serde(default = "IsaSection::default_comment_pattern")]
    pub comment_pattern: String,

    /// Label-definition pattern; capture group 1 is the label name.
    #[serde(default = "IsaSection::default_label_pattern")]
    pub label_pattern: String,

    /// Optional hex suffix accepted on integer tokens (for example `h`).
    #[serde(default)]
    pub hex_suffix: Option<String>,
}

impl IsaSection {
    /// Returns the default machine word width.
    fn default_word_width() -> u32 {
        defaults::WORD_WIDTH
    }

    /// Returns the default comment pattern.
    fn default_comment_pattern() -> String {
        defaults::COMMENT_PATTERN.to_string()
    }

    /// Returns the default label pattern.
    fn default_label_pattern() -> String {
        defaults::LABEL_PATTERN.to_string()
    }
}

impl Default for IsaSection {
    fn default() -> Self {
        Self {
            word_width: defaults::WORD_WIDTH,
            comment_pattern: defaults::COMMENT_PATTERN.to_string(),
            label_pattern: defaults::LABEL_PATTERN.to_string(),
            hex_suffix: None,
        }
    }
}

/// One instruction's syntax entry as written in the description.
#[derive(Debug, Clone, Deserialize)]
pub struct SyntaxSpec {
    /// The mnemonic keying this instruction in the assembler.
    pub mnemonic: String,
    /// Full-line matching pattern (anchored automatically).
    pub pattern: String,
    /// Ordered (symbol, field) bindings for the pattern's capture groups.
    #[serde(default)]
    pub symbols: Vec<SymbolBinding>,
}

/// One operation invocation as written in the description.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationSpec {
    /// Operation name, resolved against the operation library at build time.
    pub op: String,
    /// Argument tokens: field names, register names, or integer literals.
    #[serde(default)]
    pub args: Vec<String>,
}

/// One instruction entry as written in the description.
#[derive(Debug, Clone, Deserialize)]
pub struct InstructionSpec {
    /// Instruction name.
    pub name: String,
    /// Name of the format this instruction encodes in.
    pub format: String,
    /// Field values identifying the instruction within its format.
    #[serde(default)]
    pub signature: BTreeMap<String, u64>,
    /// Field values always encoded as fixed constants.
    #[serde(default)]
    pub presets: BTreeMap<String, u64>,
    /// Assembly syntax.
    pub syntax: SyntaxSpec,
    /// Ordered operation list.
    pub operations: Vec<OperationSpec>,
    /// Optional label-reference metadata.
    #[serde(default)]
    pub label: Option<LabelRef>,
}

/// One register entry as written in the description.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterSpec {
    /// Register number (the unique key).
    pub number: u32,
    /// Optional symbolic name.
    #[serde(default)]
    pub name: Option<String>,
    /// Width in bits.
    #[serde(default = "RegisterSpec::default_width")]
    pub width: u32,
    /// Role tag.
    #[serde(default)]
    pub profile: Profile,
    /// Whether user code may target this register.
    #[serde(default = "RegisterSpec::default_writable")]
    pub writable: bool,
    /// Initial (and reset) value.
    #[serde(default)]
    pub initial: u64,
}

impl RegisterSpec {
    /// Returns the default register width.
    fn default_width() -> u32 {
        defaults::REGISTER_WIDTH
    }

    /// Registers are writable unless the description says otherwise.
    fn default_writable() -> bool {
        true
    }
}

/// One named segment as written in the description.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentSpec {
    /// Segment name (`text`, `data`, `stack`, ...).
    pub name: String,
    /// Inclusive [start, end] bounds.
    pub bounds: [u64; 2],
}

/// The memory section of the description.
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    /// Inclusive [low, high] address-space bounds.
    pub address_space: [u64; 2],
    /// Addressable unit in bits.
    #[serde(default = "MemorySection::default_unit")]
    pub unit: u32,
    /// Byte order for multi-unit words.
    #[serde(default)]
    pub endianness: Endianness,
    /// Named segments, validated against the address space.
    #[serde(default)]
    pub segments: Vec<SegmentSpec>,
}

impl MemorySection {
    /// Returns the default addressable unit.
    fn default_unit() -> u32 {
        defaults::UNIT
    }
}

/// The pipeline section of the description.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Ordered stage list.
    pub stages: Vec<StageKind>,
    /// Stage behavior flags.
    #[serde(flatten)]
    pub flags: PipelineFlags,
}

/// The root machine description document.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineDescription {
    /// Machine name, for display only.
    pub name: String,
    /// Lexical and word-size conventions.
    #[serde(default)]
    pub isa: IsaSection,
    /// Instruction bit-layout formats.
    pub formats: Vec<InstructionFormat>,
    /// Instruction definitions.
    pub instructions: Vec<InstructionSpec>,
    /// Register file entries.
    pub registers: Vec<RegisterSpec>,
    /// Memory map.
    pub memory: MemorySection,
    /// Pipeline stages and flags.
    pub pipeline: PipelineSection,
}

impl MachineDescription {
    /// Validates the description and builds a ready processor.
    ///
    /// Everything the error taxonomy calls a configuration error is caught
    /// here: a machine that builds will not fail later for reasons the
    /// description could have revealed.
    pub fn build(self) -> Result<Processor, ConfigError> {
        let word_width = self.isa.word_width;

        let mut registers = RegisterFile::new();
        for spec in &self.registers {
            registers.add(
                spec.number,
                Register {
                    value: spec.initial,
                    width: spec.width,
                    profile: spec.profile,
                    writable: spec.writable,
                },
                spec.name.as_deref(),
            )?;
        }
        registers.pc_number()?;

        let [low, high] = self.memory.address_space;
        let mut memory = Memory::new(low, high, self.memory.unit, word_width, self.memory.endianness)?;
        for segment in &self.memory.segments {
            memory.add_segment(&segment.name, segment.bounds[0], segment.bounds[1])?;
        }

        let lexical = Lexical {
            comment: compile_pattern(&self.isa.comment_pattern, "the comment pattern")?,
            label: compile_pattern(&self.isa.label_pattern, "the label pattern")?,
            hex_suffix: self.isa.hex_suffix.clone(),
        };
        let mut registry = IsaRegistry::new(word_width, lexical);
        for format in self.formats {
            registry.add_format(format)?;
        }

        for spec in self.instructions {
            let definition = resolve_instruction(
                spec,
                &registry,
                &registers,
                self.isa.hex_suffix.as_deref(),
            )?;
            registry.add_instruction(definition)?;
        }

        info!(machine = %self.name, "machine description built");
        Processor::new(
            registry,
            registers,
            memory,
            self.pipeline.stages,
            self.pipeline.flags,
        )
    }
}

/// Compiles a description pattern, naming it in the error on failure.
fn compile_pattern(pattern: &str, what: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::BadPattern {
        what: what.to_string(),
        source,
    })
}

/// Resolves one instruction entry into its runtime definition.
///
/// Operation names resolve against the library, argument tokens against the
/// format's fields first, then register names, then integer literals - the
/// typed-operand model, fixed at build time.
fn resolve_instruction(
    spec: InstructionSpec,
    registry: &IsaRegistry,
    registers: &RegisterFile,
    hex_suffix: Option<&str>,
) -> Result<InstructionDefinition, ConfigError> {
    let format = registry
        .format(&spec.format)
        .ok_or_else(|| ConfigError::UnknownFormat {
            instruction: spec.name.clone(),
            format: spec.format.clone(),
        })?;

    let pattern = compile_pattern(
        &format!("^{}$", spec.syntax.pattern),
        &format!("the syntax of `{}`", spec.name),
    )?;

    let mut operations = Vec::with_capacity(spec.operations.len());
    for op_spec in &spec.operations {
        let kind = OpKind::from_str(&op_spec.op).map_err(|()| ConfigError::UnknownOperation {
            instruction: spec.name.clone(),
            operation: op_spec.op.clone(),
        })?;
        let (min, max) = kind.arity();
        if op_spec.args.len() < min || op_spec.args.len() > max {
            return Err(ConfigError::BadOperandCount {
                instruction: spec.name.clone(),
                operation: op_spec.op.clone(),
                expected: if min == max {
                    min.to_string()
                } else {
                    format!("{min} to {max}")
                },
                given: op_spec.args.len(),
            });
        }
        let mut operands = Vec::with_capacity(op_spec.args.len());
        for token in &op_spec.args {
            let operand = if format.range_of(token).is_some() {
                Operand::Field(token.clone())
            } else if let Some(number) = registers.number_of(token) {
                Operand::Register(number)
            } else if let Some(value) = bits::parse_int(token, hex_suffix) {
                Operand::Immediate(value)
            } else {
                return Err(ConfigError::UnresolvableOperand {
                    instruction: spec.name.clone(),
                    token: token.clone(),
                });
            };
            operands.push(operand);
        }
        operations.push(OpInvocation { kind, operands });
    }

    Ok(InstructionDefinition {
        name: spec.name,
        format: spec.format,
        signature: spec.signature,
        presets: spec.presets,
        syntax: Syntax {
            mnemonic: spec.syntax.mnemonic,
            pattern,
            bindings: spec.syntax.symbols,
        },
        operations,
        label: spec.label,
    })
}
