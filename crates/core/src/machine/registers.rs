//! The register file.
//!
//! Registers are keyed by number and carry a value, a width in bits, a
//! profile tag, and a write-privilege flag. A name map and its inverse serve
//! symbolic access from the assembler and drivers. Values are stored as
//! nonnegative machine words; signed interpretation is the caller's business
//! through the bit codec.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::common::bits;
use crate::common::error::{ConfigError, SimError};

/// A register's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Ordinary data register.
    #[default]
    GeneralPurpose,
    /// The machine's program counter. Exactly one register carries this.
    ProgramCounter,
    /// Status register.
    Status,
}

/// One register's state and static properties.
#[derive(Debug, Clone)]
pub struct Register {
    /// Current value, masked to `width` bits.
    pub value: u64,
    /// Width in bits (1 to 64).
    pub width: u32,
    /// Role tag.
    pub profile: Profile,
    /// Whether user code may target this register.
    pub writable: bool,
}

/// The keyed register file.
#[derive(Debug, Default)]
pub struct RegisterFile {
    regs: BTreeMap<u32, Register>,
    initial: BTreeMap<u32, u64>,
    names: HashMap<String, u32>,
    numbers: BTreeMap<u32, String>,
}

impl RegisterFile {
    /// Creates an empty register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a register, optionally with a symbolic name.
    ///
    /// The value at the time of the add becomes the register's reset value.
    /// Duplicate numbers or names are rejected.
    pub fn add(
        &mut self,
        number: u32,
        register: Register,
        name: Option<&str>,
    ) -> Result<(), ConfigError> {
        if self.regs.contains_key(&number) {
            return Err(ConfigError::DuplicateRegister {
                what: format!("number {number}"),
            });
        }
        if let Some(name) = name {
            if self.names.contains_key(name) {
                return Err(ConfigError::DuplicateRegister {
                    what: format!("name `{name}`"),
                });
            }
            self.names.insert(name.to_string(), number);
            self.numbers.insert(number, name.to_string());
        }
        self.initial.insert(number, register.value & bits::mask(register.width));
        self.regs.insert(number, register);
        Ok(())
    }

    /// Removes a register and its name mapping, if present.
    pub fn remove(&mut self, number: u32) -> Option<Register> {
        self.initial.remove(&number);
        if let Some(name) = self.numbers.remove(&number) {
            self.names.remove(&name);
        }
        self.regs.remove(&number)
    }

    /// Reads a register's value.
    ///
    /// An unknown number is a programming error in the caller and fails hard.
    pub fn get(&self, number: u32) -> Result<u64, SimError> {
        self.regs
            .get(&number)
            .map(|r| r.value)
            .ok_or_else(|| SimError::RegisterReference(number.to_string()))
    }

    /// Writes a register's value, masked to its width.
    pub fn set(&mut self, number: u32, value: u64) -> Result<(), SimError> {
        let reg = self
            .regs
            .get_mut(&number)
            .ok_or_else(|| SimError::RegisterReference(number.to_string()))?;
        reg.value = value & bits::mask(reg.width);
        Ok(())
    }

    /// Advances a register by a signed step, wrapping at its width.
    ///
    /// Used for program-counter stepping, where the step is the machine's
    /// word spacing.
    pub fn advance(&mut self, number: u32, step: i64) -> Result<(), SimError> {
        let reg = self
            .regs
            .get_mut(&number)
            .ok_or_else(|| SimError::RegisterReference(number.to_string()))?;
        reg.value = reg.value.wrapping_add(step as u64) & bits::mask(reg.width);
        Ok(())
    }

    /// A register's width in bits.
    pub fn width_of(&self, number: u32) -> Result<u32, SimError> {
        self.regs
            .get(&number)
            .map(|r| r.width)
            .ok_or_else(|| SimError::RegisterReference(number.to_string()))
    }

    /// Whether user code may target the register.
    pub fn is_writable(&self, number: u32) -> Result<bool, SimError> {
        self.regs
            .get(&number)
            .map(|r| r.writable)
            .ok_or_else(|| SimError::RegisterReference(number.to_string()))
    }

    /// Resolves a symbolic name to a register number.
    pub fn number_of(&self, name: &str) -> Option<u32> {
        self.names.get(name).copied()
    }

    /// Resolves a register number to its symbolic name, if it has one.
    pub fn name_of(&self, number: u32) -> Option<&str> {
        self.numbers.get(&number).map(String::as_str)
    }

    /// Scans for the register carrying the program-counter profile.
    ///
    /// The machine builder guarantees exactly one exists; this validates that
    /// guarantee when called during construction.
    pub fn pc_number(&self) -> Result<u32, ConfigError> {
        let mut found = self
            .regs
            .iter()
            .filter(|(_, r)| r.profile == Profile::ProgramCounter)
            .map(|(&n, _)| n);
        match (found.next(), found.next()) {
            (Some(n), None) => Ok(n),
            (first, _) => Err(ConfigError::ProgramCounter {
                count: if first.is_some() {
                    2 + found.count()
                } else {
                    0
                },
            }),
        }
    }

    /// Restores every register to its value at the time it was added.
    pub fn reset(&mut self) {
        for (number, reg) in &mut self.regs {
            if let Some(&value) = self.initial.get(number) {
                reg.value = value;
            }
        }
    }

    /// Iterates registers in number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Register)> {
        self.regs.iter().map(|(&n, r)| (n, r))
    }

    /// Snapshot of all register values, keyed by number.
    pub fn values(&self) -> BTreeMap<u32, u64> {
        self.regs.iter().map(|(&n, r)| (n, r.value)).collect()
    }
}
