//! Instruction-set simulator CLI.
//!
//! This binary is the batch driver around the core library. It performs:
//! 1. **Assemble:** Translate a source file against a machine description and
//!    print the machine words.
//! 2. **Run:** Assemble (or accept pre-assembled hex words), load the text
//!    segment, and cycle until a signal, a fault, or the cycle budget.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use isasim_core::MachineDescription;
use isasim_core::common::Signal;
use isasim_core::sim::{CycleOutcome, Observer, Processor, StateSnapshot};

#[derive(Parser, Debug)]
#[command(
    name = "isasim",
    author,
    version,
    about = "Data-driven instruction-set simulator",
    long_about = "Assemble and run programs against a machine described as data.\n\n\
        Examples:\n  \
        isasim asm -m demos/mips32.json demos/sum.s\n  \
        isasim run -m demos/mips32.json demos/sum.s --trace\n  \
        isasim run -m demos/mips32.json demos/sum.s --break 16"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a source file and print one hex word per line.
    Asm {
        /// Machine description (JSON).
        #[arg(short, long)]
        machine: PathBuf,

        /// Assembly source file.
        source: PathBuf,
    },

    /// Assemble, load, and run a program until it signals or faults.
    Run {
        /// Machine description (JSON).
        #[arg(short, long)]
        machine: PathBuf,

        /// Assembly source file.
        source: PathBuf,

        /// Stop after this many cycles.
        #[arg(long, default_value_t = 100_000)]
        max_cycles: u64,

        /// Print a state line after every cycle.
        #[arg(long)]
        trace: bool,

        /// Breakpoint program-counter values (repeatable).
        #[arg(long = "break", value_name = "PC")]
        breakpoints: Vec<u64>,
    },
}

/// Observer printing one state line per broadcast.
struct TracePrinter {
    updates: Cell<u64>,
}

impl Observer for TracePrinter {
    fn on_update(&self, snapshot: &StateSnapshot) {
        let n = self.updates.get();
        self.updates.set(n + 1);
        let pipeline: Vec<String> = snapshot
            .pipeline
            .iter()
            .map(|raw| format!("{raw:#010x}"))
            .collect();
        println!("update {n:>4}  pipeline [{}]", pipeline.join(", "));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Asm { machine, source } => cmd_asm(&machine, &source),
        Commands::Run {
            machine,
            source,
            max_cycles,
            trace,
            breakpoints,
        } => cmd_run(&machine, &source, max_cycles, trace, &breakpoints),
    }
}

/// Builds the machine and assembles the program, exiting on any failure.
fn prepare(machine: &PathBuf, source: &PathBuf) -> (Processor, Vec<u64>) {
    let description = read_description(machine);
    let processor = match description.build() {
        Ok(processor) => processor,
        Err(e) => {
            eprintln!("machine description rejected: {e}");
            process::exit(1);
        }
    };
    let text = match fs::read_to_string(source) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("cannot read {}: {e}", source.display());
            process::exit(1);
        }
    };
    let words = match processor.assemble(&text) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("assembly failed: {e}");
            process::exit(1);
        }
    };
    (processor, words)
}

fn read_description(machine: &PathBuf) -> MachineDescription {
    let text = match fs::read_to_string(machine) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("cannot read {}: {e}", machine.display());
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(description) => description,
        Err(e) => {
            eprintln!("cannot parse {}: {e}", machine.display());
            process::exit(1);
        }
    }
}

fn cmd_asm(machine: &PathBuf, source: &PathBuf) {
    let (processor, words) = prepare(machine, source);
    let digits = (processor.registry().word_width() as usize).div_ceil(4);
    for word in words {
        println!("{word:#0width$x}", width = digits + 2);
    }
}

fn cmd_run(
    machine: &PathBuf,
    source: &PathBuf,
    max_cycles: u64,
    trace: bool,
    breakpoints: &[u64],
) {
    let (mut processor, words) = prepare(machine, source);
    if let Err(e) = processor.load_text(&words, true) {
        eprintln!("program does not fit the text segment: {e}");
        process::exit(1);
    }
    for &pc in breakpoints {
        processor.add_break_point(pc);
    }
    if trace {
        processor.add_observer(Rc::new(TracePrinter {
            updates: Cell::new(0),
        }));
    }

    println!(
        "Loaded {} words; running for up to {} cycles",
        words.len(),
        max_cycles
    );

    for cycle in 0..max_cycles {
        match processor.cycle() {
            Ok(CycleOutcome::Continue) => {}
            Ok(CycleOutcome::Signal(Signal::Terminate(code))) => {
                println!("program terminated with code {code} after {} cycles", cycle + 1);
                dump_registers(&processor);
                process::exit(code as i32);
            }
            Ok(CycleOutcome::Signal(Signal::Trap(pc))) => {
                println!("trap at pc {pc:#x} after {} cycles", cycle + 1);
                dump_registers(&processor);
                process::exit(2);
            }
            Err(e) => {
                eprintln!("fault after {} cycles: {e}", cycle + 1);
                dump_registers(&processor);
                process::exit(1);
            }
        }
    }
    println!("cycle budget exhausted");
    dump_registers(&processor);
}

/// Prints every register with a nonzero value.
fn dump_registers(processor: &Processor) {
    for (number, register) in processor.registers().iter() {
        if register.value == 0 {
            continue;
        }
        let name = processor
            .registers()
            .name_of(number)
            .map_or_else(|| format!("r{number}"), String::from);
        println!("  {name:>8} = {:#x}", register.value);
    }
}
