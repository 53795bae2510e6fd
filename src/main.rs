use anyhow::{Context, Result};
use clap::Parser;

use sbsim::{parse_files, Simulator};

mod cli;

/// Cycle-accurate Tomasulo-style scoreboard simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, styles = cli::styles())]
struct Args {
    /// Input files, concatenated in the order given
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Print every cycle's table, not just the final one
    #[arg(short = 'p', long)]
    print_all: bool,

    /// Print debug-level logs during simulation
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Cap the number of cycles before declaring a deadlock
    #[arg(long)]
    max_cycles: Option<u64>,
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { &tracing::Level::DEBUG } else { &tracing::Level::INFO };
    cli::logging_setup(log_level);

    // spec §6.2 requires a single-line diagnostic on failure: `{:#}` renders
    // anyhow's whole context chain on one line, unlike the derived
    // `Result`-returning `main` termination, whose `Debug` impl spreads the
    // chain across a "Caused by:" block.
    if let Err(err) = run(args) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let (config, program) = parse_files(&args.inputs).context("failed to parse input")?;
    let mut sim = Simulator::new(config, program)
        .context("failed to build simulator")?
        .with_max_cycles(args.max_cycles);

    if args.print_all {
        while !sim.is_finished() {
            sim.step().context("simulation failed")?;
            println!("cycle {}\n{}", sim.current_cycle() - 1, sim.schedule());
        }
    } else {
        let schedule = sim.run().context("simulation failed")?;
        println!("{schedule}");
    }

    Ok(())
}
