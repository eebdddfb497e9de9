//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pcc::TargetArch;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "pcc")]
#[command(about = "Probabilistic calling context instrumentation")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Instrument a textual IR module
    Instrument {
        /// Input module
        #[arg(value_name = "MODULE")]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Derive call-site identifiers from the instruction pointer
        #[arg(long)]
        use_call_site_pc: bool,

        /// Call an out-of-line update routine instead of inlining the arithmetic
        #[arg(long)]
        outline_update: bool,

        /// Target architecture for the instruction pointer read
        #[arg(long, value_enum, default_value = "x86-64")]
        target: TargetArg,
    },

    /// Execute a module in the reference interpreter
    Run {
        /// Input module
        #[arg(value_name = "MODULE")]
        input: PathBuf,

        /// Entry function
        #[arg(short, long, default_value = "main")]
        entry: String,

        /// Instrument before executing
        #[arg(long)]
        instrument: bool,

        /// Instruction budget
        #[arg(long, default_value = "1000000")]
        fuel: u64,
    },

    /// Parse a module and print its normalized form
    Dump {
        /// Input module
        #[arg(value_name = "MODULE")]
        input: PathBuf,
    },
}

/// Target architecture argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TargetArg {
    #[value(name = "x86-64")]
    X8664,
    Aarch64,
    Riscv64,
}

impl From<TargetArg> for TargetArch {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::X8664 => Self::X86_64,
            TargetArg::Aarch64 => Self::Aarch64,
            TargetArg::Riscv64 => Self::Riscv64,
        }
    }
}
