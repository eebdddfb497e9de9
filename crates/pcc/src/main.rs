//! PCC CLI - probabilistic calling context instrumentation.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.silent {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("pcc={level}").parse().unwrap())
                .add_directive(format!("pcc_instrument={level}").parse().unwrap()),
        )
        .with_target(false)
        .init();

    std::process::exit(commands::run_command(&cli));
}
