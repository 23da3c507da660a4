//! Error taxonomies and simulated signals.
//!
//! This module defines every way the simulator reports failure. It provides:
//! 1. **Execution errors:** Faults raised while cycling (memory, registers, decode, arithmetic).
//! 2. **Configuration errors:** Construction-time rejection of a malformed machine description.
//! 3. **Assembly errors:** Per-line failures from the three-pass assembler.
//! 4. **Signals:** Expected control-flow values (terminate, trap) that are not bugs.
//!
//! Errors and signals are plain values. Nothing here is thrown through a panic;
//! callers receive them from `Result` returns and own the recovery policy.

use thiserror::Error;

/// Execution-time faults raised while the processor is cycling.
///
/// Every variant propagates out of `cycle()` after the partial cycle's state
/// has been broadcast to observers; none are swallowed inside the processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A memory access was requested below the addressable unit, or at a size
    /// that is not a whole number of units.
    #[error("addressing error: {size}-bit access is not a multiple of the {unit}-bit unit")]
    Addressing {
        /// Requested access size in bits.
        size: u32,
        /// The memory's addressable unit in bits.
        unit: u32,
    },

    /// An aligned access started at an offset that is not a multiple of its
    /// span in storage cells.
    #[error("alignment error: offset {offset:#x} is not aligned to {cells} cells")]
    Alignment {
        /// The offending start offset.
        offset: u64,
        /// The access span in storage cells.
        cells: u64,
    },

    /// A touched address fell outside the configured address space or past a
    /// segment boundary.
    #[error("segmentation fault at address {address:#x}")]
    Segmentation {
        /// The first out-of-range address.
        address: u64,
    },

    /// A named segment was referenced that the memory engine does not hold.
    #[error("unknown memory segment `{name}`")]
    UnknownSegment {
        /// The missing segment name.
        name: String,
    },

    /// An operation referenced a register the register file does not hold.
    #[error("unknown register {0}")]
    RegisterReference(String),

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A word that has aged into the decode stage matches no instruction
    /// signature in any known format.
    #[error("no instruction signature matches word {word:#x}")]
    OpcodeNotFound {
        /// The raw undecodable word.
        word: u128,
    },

    /// The syscall operation received a code outside the simulated signal set.
    #[error("unknown signal code {0}")]
    UnknownSignalCode(i64),
}

/// Construction-time rejection of a malformed machine description.
///
/// Any of these is fatal: the driver must not proceed to simulate.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A definition carried an empty name.
    #[error("empty name for {kind}")]
    EmptyName {
        /// What kind of definition was unnamed (format, instruction, ...).
        kind: &'static str,
    },

    /// Two definitions of one kind share a name.
    #[error("duplicate {kind} `{name}`")]
    Duplicate {
        /// The kind of definition.
        kind: &'static str,
        /// The colliding name.
        name: String,
    },

    /// A field's bit range is inverted or exceeds its format's width.
    #[error("format `{format}`: field `{field}` range [{start}, {end}] is invalid for width {width}")]
    BadBitRange {
        /// Owning format name.
        format: String,
        /// Offending field name.
        field: String,
        /// Most-significant bit position (inclusive).
        start: u32,
        /// Least-significant bit position (inclusive).
        end: u32,
        /// The format's declared width.
        width: u32,
    },

    /// Two fields of one format claim overlapping bits.
    #[error("format `{format}`: fields `{first}` and `{second}` overlap")]
    OverlappingFields {
        /// Owning format name.
        format: String,
        /// First overlapping field.
        first: String,
        /// Second overlapping field.
        second: String,
    },

    /// A format's width disagrees with its declared word count.
    #[error("format `{format}`: width {width} does not equal {word_count} x {word_width}-bit words")]
    FormatWidthMismatch {
        /// Offending format name.
        format: String,
        /// Declared format width.
        width: u32,
        /// Declared machine-word count.
        word_count: u32,
        /// The machine's base word width.
        word_width: u32,
    },

    /// An instruction referenced a format the registry does not hold.
    #[error("instruction `{instruction}` references unknown format `{format}`")]
    UnknownFormat {
        /// Offending instruction name.
        instruction: String,
        /// The missing format name.
        format: String,
    },

    /// An instruction's signature, preset, or syntax binding referenced a
    /// field its format does not define.
    #[error("instruction `{instruction}` references unknown field `{field}`")]
    UnknownField {
        /// Offending instruction name.
        instruction: String,
        /// The missing field name.
        field: String,
    },

    /// A multi-word format placed a signature field beyond the first machine
    /// word, where the decoder cannot see it.
    #[error("instruction `{instruction}`: signature field `{field}` lies beyond the first word")]
    SignatureBeyondFirstWord {
        /// Offending instruction name.
        instruction: String,
        /// The out-of-reach field name.
        field: String,
    },

    /// Two instructions of one format are indistinguishable by signature.
    #[error("instructions `{first}` and `{second}` share a signature in format `{format}`")]
    AmbiguousSignature {
        /// Owning format name.
        format: String,
        /// First colliding instruction.
        first: String,
        /// Second colliding instruction.
        second: String,
    },

    /// An instruction invoked an operation name the library does not provide.
    #[error("instruction `{instruction}` references unknown operation `{operation}`")]
    UnknownOperation {
        /// Offending instruction name.
        instruction: String,
        /// The unresolved operation name.
        operation: String,
    },

    /// An operation invocation carried the wrong number of arguments.
    #[error("instruction `{instruction}`: operation `{operation}` takes {expected} operands, got {given}")]
    BadOperandCount {
        /// Offending instruction name.
        instruction: String,
        /// The operation name as written in the description.
        operation: String,
        /// Human-readable expected count ("3" or "1 to 2").
        expected: String,
        /// How many arguments the description supplied.
        given: usize,
    },

    /// An operation argument is neither a field of the instruction's format,
    /// a register name, nor an integer literal.
    #[error("instruction `{instruction}`: operand `{token}` is not a field, register, or integer")]
    UnresolvableOperand {
        /// Offending instruction name.
        instruction: String,
        /// The unresolvable argument token.
        token: String,
    },

    /// An instruction declared a label reference whose symbol is not among
    /// its syntax bindings.
    #[error("instruction `{instruction}`: label symbol `{symbol}` is not a syntax symbol")]
    UnknownLabelSymbol {
        /// Offending instruction name.
        instruction: String,
        /// The unbound label symbol.
        symbol: String,
    },

    /// A regular expression in the description failed to compile.
    #[error("invalid pattern for {what}")]
    BadPattern {
        /// What the pattern was for (comment, label, an instruction's syntax).
        what: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The address space bounds are inverted.
    #[error("address space [{low:#x}, {high:#x}] is invalid")]
    BadAddressSpace {
        /// Low bound (inclusive).
        low: u64,
        /// High bound (inclusive).
        high: u64,
    },

    /// The addressable unit or word width is unusable.
    #[error("word width {word_width} is not a positive multiple of the {unit}-bit unit")]
    BadWordWidth {
        /// Machine word width in bits.
        word_width: u32,
        /// Addressable unit in bits.
        unit: u32,
    },

    /// A segment's bounds fall outside the address space or are inverted.
    #[error("segment `{name}` bounds [{start:#x}, {end:#x}] lie outside the address space")]
    BadSegment {
        /// Segment name.
        name: String,
        /// Declared start address.
        start: u64,
        /// Declared end address.
        end: u64,
    },

    /// A register number or name was declared twice.
    #[error("duplicate register {what}")]
    DuplicateRegister {
        /// The colliding number or name, rendered for display.
        what: String,
    },

    /// The register file does not contain exactly one program-counter register.
    #[error("expected exactly one program-counter register, found {count}")]
    ProgramCounter {
        /// How many program-counter registers were declared.
        count: usize,
    },

    /// The pipeline stage list is empty.
    #[error("pipeline stage list is empty")]
    NoStages,
}

/// Per-line failures from the assembler.
///
/// An assembly error aborts the current assemble call; the processor and
/// memory engine remain usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// The line's mnemonic matches no instruction in the registry.
    #[error("line {line}: unknown mnemonic `{mnemonic}` in `{text}`")]
    UnknownMnemonic {
        /// Source line number (1-based).
        line: usize,
        /// The unrecognized mnemonic.
        mnemonic: String,
        /// The offending line text.
        text: String,
    },

    /// The line does not match its mnemonic's syntax pattern.
    #[error("line {line}: `{text}` does not match the syntax for `{mnemonic}`")]
    SyntaxMismatch {
        /// Source line number (1-based).
        line: usize,
        /// The mnemonic whose pattern failed.
        mnemonic: String,
        /// The offending line text.
        text: String,
    },

    /// A referenced label was never defined.
    #[error("line {line}: undefined label `{label}`")]
    UndefinedLabel {
        /// Source line number (1-based).
        line: usize,
        /// The unresolved label.
        label: String,
    },

    /// An operand token is neither a known register name nor an integer.
    #[error("line {line}: `{token}` is neither a register nor an integer")]
    BadToken {
        /// Source line number (1-based).
        line: usize,
        /// The offending token.
        token: String,
    },

    /// An operand value does not fit its field's bit width.
    #[error("line {line}: value {value} does not fit in the {width}-bit field `{field}`")]
    FieldOverflow {
        /// Source line number (1-based).
        line: usize,
        /// The out-of-range value.
        value: i64,
        /// Target field name.
        field: String,
        /// Target field width in bits.
        width: u32,
    },
}

/// Simulated control-flow signals.
///
/// Signals are expected outcomes, not bugs: the syscall operation raises them
/// deliberately and the breakpoint mechanism raises `Trap` on a hit. They are
/// returned through `cycle()`'s value so the driver cannot miss them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The running program requested termination with the given code.
    Terminate(i64),
    /// A trap fired: a breakpoint was hit, or the program requested one.
    /// Carries the program-counter value at the moment of the trap.
    Trap(u64),
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Terminate(code) => write!(f, "terminated with code {code}"),
            Signal::Trap(pc) => write!(f, "trap at pc {pc:#x}"),
        }
    }
}
