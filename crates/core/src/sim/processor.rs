//! Processor state and the cycle driver.
//!
//! The processor owns every piece of state for one simulation run and drives
//! the configured stage list once per `cycle()` call. A cycle either
//! completes all stages or stops at the first fault or signal; in both cases
//! the pipeline is retired and observers are broadcast before the outcome is
//! returned, so listeners always see a consistent snapshot.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::asm::Assembler;
use crate::common::error::{AsmError, ConfigError, Signal, SimError};
use crate::isa::registry::IsaRegistry;
use crate::machine::memory::Memory;
use crate::machine::registers::RegisterFile;
use crate::sim::observer::{Observer, StateSnapshot};
use crate::sim::stages;

/// The stage kinds a pipeline may be configured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Read a word at the PC and push a new pipeline record.
    Fetch,
    /// Match a record against the registry's instruction signatures.
    Decode,
    /// Run a decoded record's operation list.
    Execute,
    /// Reserved stage with no default behavior.
    Writeback,
}

/// Per-machine pipeline behavior flags.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PipelineFlags {
    /// Fetch advances the PC by the word spacing immediately after reading.
    #[serde(default)]
    pub fetch_advances_pc: bool,
    /// Fetch runs the decode handler on the record it just pushed.
    #[serde(default)]
    pub fetch_decodes: bool,
    /// Execute advances the PC after the operation list completes.
    #[serde(default)]
    pub execute_advances_pc: bool,
}

/// One instruction in flight.
///
/// A record accumulates state stage by stage: the raw word (concatenated
/// across fetches for multi-word formats), then the matched format and
/// instruction names, then the decoded field map.
#[derive(Debug, Clone, Default)]
pub struct PipelineEntry {
    /// Raw machine word(s), most significant word first.
    pub raw: u128,
    /// How many machine words `raw` currently spans.
    pub words: u32,
    /// Matched format name, once decoded.
    pub format: Option<String>,
    /// Matched instruction name, once decoded.
    pub instruction: Option<String>,
    /// Decoded field values, once executed.
    pub fields: BTreeMap<String, u64>,
}

impl fmt::Display for PipelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.instruction, &self.format) {
            (Some(instruction), Some(format)) => {
                write!(f, "{:#x} ({instruction}, {format})", self.raw)
            }
            _ => write!(f, "{:#x} (undecoded)", self.raw),
        }
    }
}

/// The outcome of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CycleOutcome {
    /// The cycle ran to completion; call `cycle()` again to continue.
    Continue,
    /// A simulated signal fired (syscall or breakpoint).
    Signal(Signal),
}

/// The pipelined processor for one simulation run.
pub struct Processor {
    pub(crate) registry: IsaRegistry,
    pub(crate) registers: RegisterFile,
    pub(crate) memory: Memory,
    pub(crate) stages: Vec<StageKind>,
    pub(crate) flags: PipelineFlags,
    pub(crate) pipeline: VecDeque<PipelineEntry>,
    pub(crate) pc: u32,
    pub(crate) word_spacing: u64,
    pub(crate) pc_advanced_this_cycle: bool,
    pub(crate) pending_signal: Option<Signal>,
    pub(crate) breakpoints: Vec<u64>,
    pub(crate) debug_mode: bool,
    pub(crate) observers: Vec<Rc<dyn Observer>>,
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("stages", &self.stages)
            .field("pipeline", &self.pipeline)
            .field("breakpoints", &self.breakpoints)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Processor {
    /// Wires a processor from its fully built parts.
    ///
    /// Validates that the stage list is non-empty, that the register file
    /// carries exactly one program counter, and that the registry and the
    /// memory agree on the machine word.
    pub fn new(
        registry: IsaRegistry,
        registers: RegisterFile,
        memory: Memory,
        stages: Vec<StageKind>,
        flags: PipelineFlags,
    ) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        if memory.word_width() != registry.word_width() {
            return Err(ConfigError::BadWordWidth {
                word_width: registry.word_width(),
                unit: memory.unit(),
            });
        }
        let pc = registers.pc_number()?;
        let word_spacing = memory.word_cells();
        Ok(Self {
            registry,
            registers,
            memory,
            stages,
            flags,
            pipeline: VecDeque::new(),
            pc,
            word_spacing,
            pc_advanced_this_cycle: false,
            pending_signal: None,
            breakpoints: Vec::new(),
            debug_mode: false,
            observers: Vec::new(),
        })
    }

    /// Runs one cycle: every configured stage in order, then retire, then
    /// broadcast, then the breakpoint check.
    ///
    /// On a fault the partial cycle's state is still retired and broadcast
    /// before the error is returned; observers always see a consistent
    /// snapshot.
    pub fn cycle(&mut self) -> Result<CycleOutcome, SimError> {
        self.pc_advanced_this_cycle = false;
        self.pending_signal = None;

        let mut failure = None;
        for index in 0..self.stages.len() {
            let stage = self.stages[index];
            let result = match stage {
                StageKind::Fetch => stages::fetch(self, index),
                StageKind::Decode => stages::decode(self, index),
                StageKind::Execute => stages::execute(self, index),
                StageKind::Writeback => stages::writeback(self, index),
            };
            if let Err(fault) = result {
                failure = Some(fault);
                break;
            }
            if self.pending_signal.is_some() {
                break;
            }
        }

        if self.pipeline.len() > self.stages.len() {
            self.pipeline.truncate(self.stages.len());
        }
        self.broadcast();

        if let Some(fault) = failure {
            return Err(fault);
        }
        if let Some(signal) = self.pending_signal.take() {
            return Ok(CycleOutcome::Signal(signal));
        }
        if self.debug_mode {
            let pc_value = self.registers.get(self.pc)?;
            if self.breakpoints.contains(&pc_value) {
                debug!(pc = pc_value, "breakpoint hit");
                return Ok(CycleOutcome::Signal(Signal::Trap(pc_value)));
            }
        }
        Ok(CycleOutcome::Continue)
    }

    /// Assembles source text against this machine's ISA description.
    pub fn assemble(&self, source: &str) -> Result<Vec<u64>, AsmError> {
        Assembler::new(&self.registry, &self.registers, &self.memory).assemble(source)
    }

    /// Loads pre-assembled words into the text segment.
    pub fn load_text(&mut self, words: &[u64], and_wipe: bool) -> Result<(), SimError> {
        self.memory.load_text(words, and_wipe)
    }

    /// Registers a breakpoint at a program-counter value and enables debug
    /// mode.
    pub fn add_break_point(&mut self, offset: u64) {
        self.breakpoints.push(offset);
        self.debug_mode = true;
    }

    /// Removes a breakpoint by list position; disables debug mode once the
    /// list is empty. Out-of-range positions are ignored.
    pub fn remove_break_point(&mut self, index: usize) {
        if index < self.breakpoints.len() {
            self.breakpoints.remove(index);
        }
        if self.breakpoints.is_empty() {
            self.debug_mode = false;
        }
    }

    /// Force-disables debug mode without clearing the breakpoint list.
    pub fn set_traps_off(&mut self) {
        self.debug_mode = false;
    }

    /// The registered breakpoints, in registration order.
    pub fn break_points(&self) -> &[u64] {
        &self.breakpoints
    }

    /// Restores registers to their construction snapshot, clears memory and
    /// the pipeline, drops all breakpoints, and broadcasts once.
    pub fn reset(&mut self) {
        info!("processor reset");
        self.registers.reset();
        self.memory.reset();
        self.pipeline.clear();
        self.breakpoints.clear();
        self.debug_mode = false;
        self.broadcast();
    }

    /// Registers an observer. Registering the same handle twice is a no-op;
    /// a new observer immediately receives one snapshot.
    pub fn add_observer(&mut self, observer: Rc<dyn Observer>) {
        if self.observers.iter().any(|o| Rc::ptr_eq(o, &observer)) {
            return;
        }
        observer.on_update(&self.snapshot());
        self.observers.push(observer);
    }

    /// Removes an observer handle. Unknown handles are a no-op.
    pub fn remove_observer(&mut self, observer: &Rc<dyn Observer>) {
        self.observers.retain(|o| !Rc::ptr_eq(o, observer));
    }

    /// Builds a snapshot of the externally visible state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            registers: self.registers.values(),
            memory: self.memory.cells().clone(),
            pipeline: self.pipeline.iter().map(|e| e.raw).collect(),
        }
    }

    fn broadcast(&self) {
        let snapshot = self.snapshot();
        for observer in &self.observers {
            observer.on_update(&snapshot);
        }
    }

    /// The ISA description this processor decodes against.
    pub fn registry(&self) -> &IsaRegistry {
        &self.registry
    }

    /// The register file.
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Mutable register-file access for drivers.
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// The memory engine.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable memory access for drivers.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// The instructions in flight, newest first.
    pub fn pipeline(&self) -> &VecDeque<PipelineEntry> {
        &self.pipeline
    }

    /// The program-counter register number.
    pub fn pc_number(&self) -> u32 {
        self.pc
    }

    /// The machine's word spacing in addresses.
    pub fn word_spacing(&self) -> u64 {
        self.word_spacing
    }
}
