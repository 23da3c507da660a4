//! Resolved instruction definitions.
//!
//! These are the runtime form of the machine description's instruction
//! entries: operation names resolved to [`OpKind`] variants, operand tokens
//! resolved to the typed [`Operand`] union, and syntax patterns compiled.
//! All resolution happens when the machine is built (see [`crate::config`]),
//! so nothing here guesses at execution time.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;

use crate::exec::{OpKind, Operand};

/// How a label reference resolves during assembly linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    /// Text-segment base plus line index times word spacing, as word-width hex.
    Absolute,
    /// Label line minus current line, as a plain signed integer.
    Relative,
}

/// Marks one syntax symbol of an instruction as a label reference.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelRef {
    /// The syntax symbol that may name a label.
    pub symbol: String,
    /// Resolution mode.
    pub mode: LabelMode,
}

/// One positional capture of a syntax pattern, bound to a format field.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolBinding {
    /// Symbol name, used by label metadata to identify this capture.
    pub symbol: String,
    /// The format field this capture encodes into.
    pub field: String,
}

/// An instruction's assembly syntax: a compiled matching pattern plus the
/// ordered symbol bindings for its capture groups.
#[derive(Debug, Clone)]
pub struct Syntax {
    /// The mnemonic keying this instruction in the assembler.
    pub mnemonic: String,
    /// Full-line matching pattern; capture group `i + 1` is `bindings[i]`.
    pub pattern: Regex,
    /// Ordered (symbol, field) bindings.
    pub bindings: Vec<SymbolBinding>,
}

/// One operation invocation in an instruction's execution list.
#[derive(Debug, Clone)]
pub struct OpInvocation {
    /// The resolved operation.
    pub kind: OpKind,
    /// Typed operands, resolved from the description's argument tokens.
    pub operands: Vec<Operand>,
}

/// A fully resolved instruction definition.
#[derive(Debug, Clone)]
pub struct InstructionDefinition {
    /// Instruction name, unique within the registry.
    pub name: String,
    /// Name of the format this instruction encodes in.
    pub format: String,
    /// Field values that uniquely identify the instruction within its format.
    pub signature: BTreeMap<String, u64>,
    /// Field values always encoded as fixed constants.
    pub presets: BTreeMap<String, u64>,
    /// Assembly syntax.
    pub syntax: Syntax,
    /// Ordered operation list executed when the instruction reaches execute.
    pub operations: Vec<OpInvocation>,
    /// Optional label-reference metadata for the assembler's link pass.
    pub label: Option<LabelRef>,
}
