use anyhow::bail;
use clap::{Parser, ValueEnum};
use tandem::{pipeline, Fuel, Integer, Machine, MachineError, Trace};
use tracing_subscriber::{fmt, EnvFilter};
use yansi::{Condition, Paint};

mod catalog;

use catalog::{catalog, Entry};

/// Runs demo programs through the tree walker and through the compiler and
/// stack machine, checking that both agree.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Catalog programs to run (all of them when omitted)
    programs: Vec<String>,
    /// Print the catalog and exit
    #[arg(long)]
    list: bool,
    /// Only print results, no listings or traces
    #[arg(short, long)]
    quiet: bool,
    /// Skip the execution trace
    #[arg(long)]
    no_trace: bool,
    /// Run the machine in slices of this many steps
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    fuel: Option<u32>,
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,tandem=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn indented(text: &str) -> String {
    text.lines()
        .map(|line| format!("\t{line}\n"))
        .collect::<String>()
}

/// Runs `machine` in slices of `slice` steps, returning the outcome and the
/// number of slices it took.
fn run_sliced(
    machine: &mut Machine<'_>,
    slice: u32,
    trace: &mut Trace,
) -> (Result<Integer, MachineError>, usize) {
    let mut fuel = Fuel::with(slice);
    let mut slices = 1;
    loop {
        match machine.run_with_fuel(&mut fuel, trace) {
            Ok(Some(result)) => return (Ok(result), slices),
            Ok(None) => {
                fuel.refill(slice);
                slices += 1;
            }
            Err(err) => return (Err(err), slices),
        }
    }
}

/// Runs one entry, returning whether it behaved as the catalog says it should.
///
/// Failures are reported and counted, never propagated, so one bad program
/// does not stop the rest of the catalog.
fn report(cli: &Cli, entry: &Entry) -> bool {
    println!("{} {}", entry.name.bold().underline(), entry.about.dim());
    println!();
    if !cli.quiet {
        println!("The expression to be run:\n\n{}", indented(&entry.program.to_string()));
    }

    match pipeline::interpret(&entry.program) {
        Ok(value) => println!("The result of interpretation of the tree:\n\n\t{value}\n"),
        Err(err) => println!("The tree could not be interpreted:\n\n\t{}\n", err.red()),
    }

    let bytecode = match pipeline::compile(&entry.program) {
        Ok(bytecode) => bytecode,
        Err(err) => {
            println!("The tree could not be compiled:\n\n\t{}\n", err.red());
            return entry.expected.is_none();
        }
    };
    if !cli.quiet {
        println!("The byte code:\n\n{}", indented(&bytecode.to_string()));
    }

    let mut machine = Machine::new(&bytecode);
    let mut trace = Trace::new();
    let outcome = match cli.fuel {
        Some(slice) => {
            let (outcome, slices) = run_sliced(&mut machine, slice, &mut trace);
            if !cli.quiet {
                println!("Ran in {slices} slice(s) of at most {slice} steps.\n");
            }
            outcome
        }
        None => machine.run(&mut trace),
    };

    if !cli.quiet && !cli.no_trace {
        println!("The interpretation steps:\n\n{}", indented(&trace.to_string()));
    }
    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            println!("The byte code could not be run:\n\n\t{}\n", err.red());
            return false;
        }
    };
    println!("The result of interpretation of the byte code:\n\n\t{result}\n");

    let verdict = pipeline::cross_check(&entry.program);
    let ok = entry.expected == Some(result) && verdict.is_ok();
    if ok {
        println!("{}\n", "both pipelines agree".green());
    } else {
        println!("{} {verdict:?}\n", "unexpected outcome:".red().bold());
    }
    ok
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.color {
        ColorChoice::Auto => yansi::whenever(Condition::TTY_AND_COLOR),
        ColorChoice::Always => yansi::enable(),
        ColorChoice::Never => yansi::disable(),
    }

    let entries = catalog();
    if cli.list {
        for entry in &entries {
            println!("{:<12}{}", entry.name, entry.about.dim());
        }
        return Ok(());
    }

    if let Some(unknown) = cli
        .programs
        .iter()
        .find(|name| !entries.iter().any(|entry| entry.name == name.as_str()))
    {
        bail!("no program named `{unknown}` in the catalog (try --list)");
    }

    let selected = entries
        .iter()
        .filter(|entry| cli.programs.is_empty() || cli.programs.iter().any(|name| name == entry.name))
        .collect::<Vec<_>>();
    tracing::info!(programs = selected.len(), "running");

    let mut failures = 0;
    for entry in selected {
        if !report(&cli, entry) {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} program(s) did not behave as expected");
    }
    Ok(())
}
