//! Operation kinds, operands, and their handlers.
//!
//! Each operation receives typed operands, the executing instruction's
//! decoded field map, and cycle context (at minimum the branch compensation
//! offset). It returns a [`Flow`]: `Proceed`, `Blocked` (the next operation
//! in the same instruction's list is skipped), or `Raise` carrying a
//! simulated signal. Faults are ordinary `Err` values.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::trace;

use crate::common::bits;
use crate::common::error::{Signal, SimError};
use crate::isa::format::InstructionFormat;
use crate::machine::memory::Memory;
use crate::machine::registers::RegisterFile;

/// A resolved operation argument.
///
/// Resolution happens when the machine description is built: a token naming a
/// field of the instruction's format becomes `Field`, a known register name
/// becomes `Register`, and an integer literal becomes `Immediate`. Nothing is
/// re-guessed at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// The value decoded from the named format field.
    Field(String),
    /// A fixed register number.
    Register(u32),
    /// A literal value.
    Immediate(i64),
}

/// The closed set of operations an instruction list may invoke.
///
/// The `..I` variants read their final operand as a signed immediate (a
/// decoded field or literal); their plain counterparts read every operand as
/// a register reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// `add d, a, b` - signed addition of two registers.
    Add,
    /// `sub d, a, b` - signed subtraction.
    Sub,
    /// `mul d, a, b` - signed multiplication.
    Mul,
    /// `div d, a, b` - signed division; zero divisor faults.
    Div,
    /// `rem d, a, b` - signed remainder; zero divisor faults.
    Rem,
    /// `addi d, a, imm` - signed addition of a register and an immediate.
    AddI,
    /// `eq a, b` - blocks the next operation unless the registers are equal.
    Eq,
    /// `ne a, b` - blocks unless not equal.
    Ne,
    /// `lt a, b` - blocks unless `a < b` (signed).
    Lt,
    /// `gt a, b` - blocks unless `a > b` (signed).
    Gt,
    /// `ge a, b` - blocks unless `a >= b` (signed).
    Ge,
    /// `eqi a, imm` - immediate variant of `eq`.
    EqI,
    /// `nei a, imm` - immediate variant of `ne`.
    NeI,
    /// `lti a, imm` - immediate variant of `lt`.
    LtI,
    /// `gti a, imm` - immediate variant of `gt`.
    GtI,
    /// `gei a, imm` - immediate variant of `ge`.
    GeI,
    /// `set d, imm` - writes an immediate into a register.
    Set,
    /// `copy d, s` - copies one register into another.
    Copy,
    /// `load d, base, offset` - reads a machine word at `base + offset`.
    Load,
    /// `store s, base, offset` - writes a machine word at `base + offset`.
    Store,
    /// `jump target[, delay]` - sets the PC to an absolute target, optionally
    /// advanced by a register-held word count.
    Jump,
    /// `branch offset` - relative branch compensated by the pipeline index.
    Branch,
    /// `syscall code` - routes a register's value to the signal dispatcher.
    Syscall,
}

impl OpKind {
    /// The operand counts an operation accepts, as an inclusive (min, max)
    /// pair. Checked when the machine description is built.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Rem
            | Self::AddI
            | Self::Load
            | Self::Store => (3, 3),
            Self::Eq
            | Self::Ne
            | Self::Lt
            | Self::Gt
            | Self::Ge
            | Self::EqI
            | Self::NeI
            | Self::LtI
            | Self::GtI
            | Self::GeI
            | Self::Set
            | Self::Copy => (2, 2),
            Self::Jump => (1, 2),
            Self::Branch | Self::Syscall => (1, 1),
        }
    }
}

impl FromStr for OpKind {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            "add" => Self::Add,
            "sub" => Self::Sub,
            "mul" => Self::Mul,
            "div" => Self::Div,
            "rem" => Self::Rem,
            "addi" => Self::AddI,
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "lt" => Self::Lt,
            "gt" => Self::Gt,
            "ge" => Self::Ge,
            "eqi" => Self::EqI,
            "nei" => Self::NeI,
            "lti" => Self::LtI,
            "gti" => Self::GtI,
            "gei" => Self::GeI,
            "set" => Self::Set,
            "copy" => Self::Copy,
            "load" => Self::Load,
            "store" => Self::Store,
            "jump" => Self::Jump,
            "branch" => Self::Branch,
            "syscall" => Self::Syscall,
            _ => return Err(()),
        })
    }
}

/// An operation's result under the blocking/signal protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    /// Continue with the next operation.
    Proceed,
    /// Skip the next operation in this instruction's list (single-shot).
    Blocked,
    /// Raise a simulated signal; the cycle stops executing operations.
    Raise(Signal),
}

/// Everything an operation may touch during one invocation.
pub struct OpContext<'a> {
    /// The register file.
    pub registers: &'a mut RegisterFile,
    /// The memory engine.
    pub memory: &'a mut Memory,
    /// The executing instruction's format (for field widths).
    pub format: &'a InstructionFormat,
    /// The decoded field map.
    pub fields: &'a BTreeMap<String, u64>,
    /// Pipeline compensation for relative branches.
    pub branch_offset: i64,
    /// The machine's word spacing in addresses.
    pub word_spacing: u64,
    /// The program-counter register number.
    pub pc: u32,
    /// The machine's word width in bits.
    pub word_width: u32,
}

impl OpContext<'_> {
    /// Resolves an operand to a register number.
    ///
    /// A `Field` operand names a field whose decoded value is the register
    /// number; an `Immediate` is taken as a literal number.
    fn register_number(&self, operand: &Operand) -> Result<u32, SimError> {
        match operand {
            Operand::Register(n) => Ok(*n),
            Operand::Field(name) => self
                .fields
                .get(name)
                .map(|&v| v as u32)
                .ok_or_else(|| SimError::RegisterReference(name.clone())),
            Operand::Immediate(v) => Ok(*v as u32),
        }
    }

    /// Reads an operand as a register, returning its signed value.
    fn read_register(&self, operand: &Operand) -> Result<i64, SimError> {
        let number = self.register_number(operand)?;
        let word = self.registers.get(number)?;
        Ok(bits::to_signed(word, self.registers.width_of(number)?))
    }

    /// Reads an operand as a signed immediate.
    ///
    /// A `Field` operand sign-extends the decoded value at the field's width.
    fn read_immediate(&self, operand: &Operand) -> Result<i64, SimError> {
        match operand {
            Operand::Immediate(v) => Ok(*v),
            Operand::Field(name) => {
                let value = self
                    .fields
                    .get(name)
                    .copied()
                    .ok_or_else(|| SimError::RegisterReference(name.clone()))?;
                let width = self
                    .format
                    .range_of(name)
                    .map_or(self.word_width, |r| r.width());
                Ok(bits::to_signed(value, width))
            }
            Operand::Register(n) => {
                let word = self.registers.get(*n)?;
                Ok(bits::to_signed(word, self.registers.width_of(*n)?))
            }
        }
    }

    /// Reads an operand as a nonnegative word (no sign extension).
    fn read_word(&self, operand: &Operand) -> Result<u64, SimError> {
        match operand {
            Operand::Immediate(v) => Ok(*v as u64),
            Operand::Field(name) => self
                .fields
                .get(name)
                .copied()
                .ok_or_else(|| SimError::RegisterReference(name.clone())),
            Operand::Register(n) => self.registers.get(*n),
        }
    }

    /// Writes a signed result into a destination register, re-encoded at the
    /// register's width.
    fn write_register(&mut self, operand: &Operand, value: i64) -> Result<(), SimError> {
        let number = self.register_number(operand)?;
        let width = self.registers.width_of(number)?;
        self.registers.set(number, bits::to_unsigned(value, width))
    }

    fn operand(operands: &[Operand], index: usize) -> Result<&Operand, SimError> {
        operands
            .get(index)
            .ok_or_else(|| SimError::RegisterReference(format!("missing operand {index}")))
    }
}

/// Invokes one operation against the library.
pub fn dispatch(
    kind: OpKind,
    operands: &[Operand],
    ctx: &mut OpContext<'_>,
) -> Result<Flow, SimError> {
    use OpKind::*;
    match kind {
        Add | Sub | Mul | Div | Rem => {
            let a = ctx.read_register(OpContext::operand(operands, 1)?)?;
            let b = ctx.read_register(OpContext::operand(operands, 2)?)?;
            arithmetic(kind, a, b, OpContext::operand(operands, 0)?, ctx)
        }
        AddI => {
            let a = ctx.read_register(OpContext::operand(operands, 1)?)?;
            let b = ctx.read_immediate(OpContext::operand(operands, 2)?)?;
            arithmetic(Add, a, b, OpContext::operand(operands, 0)?, ctx)
        }
        Eq | Ne | Lt | Gt | Ge => {
            let a = ctx.read_register(OpContext::operand(operands, 0)?)?;
            let b = ctx.read_register(OpContext::operand(operands, 1)?)?;
            Ok(compare(kind, a, b))
        }
        EqI | NeI | LtI | GtI | GeI => {
            let a = ctx.read_register(OpContext::operand(operands, 0)?)?;
            let b = ctx.read_immediate(OpContext::operand(operands, 1)?)?;
            Ok(compare(kind, a, b))
        }
        Set => {
            let value = ctx.read_immediate(OpContext::operand(operands, 1)?)?;
            ctx.write_register(OpContext::operand(operands, 0)?, value)?;
            Ok(Flow::Proceed)
        }
        Copy => {
            let value = ctx.read_register(OpContext::operand(operands, 1)?)?;
            ctx.write_register(OpContext::operand(operands, 0)?, value)?;
            Ok(Flow::Proceed)
        }
        Load => {
            let address = effective_address(operands, ctx)?;
            let word = ctx.memory.get_word(address, ctx.word_width, true)?;
            let dest = ctx.register_number(OpContext::operand(operands, 0)?)?;
            ctx.registers.set(dest, word)?;
            Ok(Flow::Proceed)
        }
        Store => {
            let address = effective_address(operands, ctx)?;
            let source = ctx.register_number(OpContext::operand(operands, 0)?)?;
            let word = ctx.registers.get(source)?;
            ctx.memory.set_word(address, word, ctx.word_width, true)?;
            Ok(Flow::Proceed)
        }
        Jump => {
            let mut target = ctx.read_word(OpContext::operand(operands, 0)?)?;
            if let Some(delay) = operands.get(1) {
                let count = ctx.read_register(delay)?;
                target = target.wrapping_add(count.wrapping_mul(ctx.word_spacing as i64) as u64);
            }
            trace!(target, "absolute branch");
            ctx.registers.set(ctx.pc, target)?;
            Ok(Flow::Proceed)
        }
        Branch => {
            let offset = ctx.read_immediate(OpContext::operand(operands, 0)?)?;
            let pc_value = ctx.registers.get(ctx.pc)? as i64;
            let target =
                pc_value + (offset - ctx.branch_offset) * ctx.word_spacing as i64;
            trace!(offset, compensation = ctx.branch_offset, target, "relative branch");
            ctx.registers.set(ctx.pc, target as u64)?;
            Ok(Flow::Proceed)
        }
        Syscall => {
            let code = ctx.read_register(OpContext::operand(operands, 0)?)?;
            signal_for(code, ctx)
        }
    }
}

/// Shared register-register and register-immediate arithmetic.
fn arithmetic(
    kind: OpKind,
    a: i64,
    b: i64,
    dest: &Operand,
    ctx: &mut OpContext<'_>,
) -> Result<Flow, SimError> {
    let result = match kind {
        OpKind::Add => a.wrapping_add(b),
        OpKind::Sub => a.wrapping_sub(b),
        OpKind::Mul => a.wrapping_mul(b),
        OpKind::Div => {
            if b == 0 {
                return Err(SimError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        OpKind::Rem => {
            if b == 0 {
                return Err(SimError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        _ => unreachable!("arithmetic dispatch covers add/sub/mul/div/rem"),
    };
    ctx.write_register(dest, result)?;
    Ok(Flow::Proceed)
}

/// Shared comparison logic for the blocking protocol.
fn compare(kind: OpKind, a: i64, b: i64) -> Flow {
    let holds = match kind {
        OpKind::Eq | OpKind::EqI => a == b,
        OpKind::Ne | OpKind::NeI => a != b,
        OpKind::Lt | OpKind::LtI => a < b,
        OpKind::Gt | OpKind::GtI => a > b,
        OpKind::Ge | OpKind::GeI => a >= b,
        _ => unreachable!("comparison dispatch covers eq/ne/lt/gt/ge"),
    };
    if holds { Flow::Proceed } else { Flow::Blocked }
}

/// Computes `base-register + signed offset-field` for memory operations.
fn effective_address(operands: &[Operand], ctx: &OpContext<'_>) -> Result<u64, SimError> {
    let base_reg = ctx.register_number(OpContext::operand(operands, 1)?)?;
    let base = ctx.registers.get(base_reg)?;
    let offset = ctx.read_immediate(OpContext::operand(operands, 2)?)?;
    Ok(base.wrapping_add(offset as u64))
}

/// Maps a syscall code to its simulated signal.
///
/// Code `0` terminates the run; code `1` raises a trap at the current PC;
/// anything else is outside the simulated signal surface.
fn signal_for(code: i64, ctx: &OpContext<'_>) -> Result<Flow, SimError> {
    match code {
        0 => Ok(Flow::Raise(Signal::Terminate(0))),
        1 => {
            let pc_value = ctx.registers.get(ctx.pc)?;
            Ok(Flow::Raise(Signal::Trap(pc_value)))
        }
        other => Err(SimError::UnknownSignalCode(other)),
    }
}
