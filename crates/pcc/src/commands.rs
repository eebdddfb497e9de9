//! Command dispatch for the CLI.

use std::fs;
use std::path::Path;

use tracing::{error, info};

use pcc::interp::Machine;
use pcc::{Instrumenter, Module, Options, Result, parse_module};
use pcc_ir::Word;
use pcc_rt::Host;

use crate::cli::{Cli, Commands, EXIT_FAILURE, EXIT_SUCCESS};

pub fn run_command(cli: &Cli) -> i32 {
    let result = match &cli.command {
        Commands::Instrument {
            input,
            output,
            use_call_site_pc,
            outline_update,
            target,
        } => {
            let options = Options {
                use_call_site_pc: *use_call_site_pc,
                inline_update: !*outline_update,
                target: (*target).into(),
            };
            instrument(input, output.as_deref(), options)
        }
        Commands::Run {
            input,
            entry,
            instrument,
            fuel,
        } => run(input, entry, *instrument, *fuel),
        Commands::Dump { input } => dump(input),
    };
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            error!("{err}");
            EXIT_FAILURE
        }
    }
}

fn load(input: &Path) -> Result<Module<Host>> {
    let src = fs::read_to_string(input)?;
    Ok(parse_module(&src)?)
}

fn instrument(input: &Path, output: Option<&Path>, options: Options) -> Result<()> {
    let mut module = load(input)?;
    let stats = Instrumenter::new(options).instrument(&mut module)?;
    info!(
        functions = stats.functions,
        call_sites = stats.call_sites,
        returns = stats.returns,
        "instrumented {}",
        input.display()
    );
    match output {
        Some(path) => fs::write(path, module.to_string())?,
        None => print!("{module}"),
    }
    Ok(())
}

fn run(input: &Path, entry: &str, instrument: bool, fuel: u64) -> Result<()> {
    let mut module = load(input)?;
    if instrument {
        Instrumenter::new(Options::default()).instrument(&mut module)?;
    }
    let mut machine = Machine::new(&module).with_fuel(fuel);
    let ret = machine.run(entry, &[])?;
    for event in &machine.call_trace {
        println!(
            "call @{:<24} context={:#018x}",
            event.callee,
            Host::to_u64(event.context)
        );
    }
    println!("return value    {}", Host::to_u64(ret));
    println!("context at exit {:#018x}", Host::to_u64(machine.context()));
    Ok(())
}

fn dump(input: &Path) -> Result<()> {
    let module = load(input)?;
    print!("{module}");
    Ok(())
}
