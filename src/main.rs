// SCHEDBENCH -- SCHEDULING POLICY BENCHMARK HARNESS
// DRIVES hackbench / cyclictest / deadline_test / stress-ng UNDER perf stat,
// REDUCES THEIR FREE-FORM OUTPUT TO ONE FIXED-SCHEMA CSV.
//
// RUST HANDLES: CONFIGURATION, SEQUENTIAL EXECUTION, EXTRACTION, REPORTING.
// PLOTTING IS LEFT TO WHATEVER READS THE CSV.

mod cli;

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{Parser, Subcommand};

use cli::check::run_check;
use cli::compare::{run_compare, CompareArgs};
use cli::parse::{run_parse, ParseArgs};
use cli::sweep::{run_sweep, SweepArgs};
use cli::ToolArgs;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "schedbench")]
#[command(about = "SCHEDBENCH -- CFS / RT-FIFO / DEADLINE BENCHMARK HARNESS")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    // RUN EACH POLICY'S FIXED BENCHMARK ONCE PER REPETITION
    Compare(CompareArgs),

    // SWEEP FAIR-SHARE TUNABLES x {DEFAULT, HALF, DOUBLE} x WORKLOADS
    Sweep(SweepArgs),

    // RE-EXTRACT METRICS FROM A SAVED LOG
    Parse(ParseArgs),

    // VERIFY TOOLS, KERNEL CONFIG AND TUNABLE DIRECTORY
    Check {
        #[command(flatten)]
        tools: ToolArgs,

        #[arg(long, default_value = schedbench::tunables::DEFAULT_TUNABLE_DIR)]
        tunable_dir: std::path::PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // CTRL+C FINISHES THE CURRENT POINT, THEN PERSISTS WHAT WAS COLLECTED
    ctrlc::set_handler(move || {
        SHUTDOWN.store(true, Ordering::Relaxed);
    })?;

    match &cli.command {
        Cmd::Compare(args) => run_compare(args, &SHUTDOWN)?,
        Cmd::Sweep(args) => run_sweep(args, &SHUTDOWN)?,
        Cmd::Parse(args) => run_parse(args)?,
        Cmd::Check { tools, tunable_dir } => run_check(tools, tunable_dir)?,
    }

    println!("SCHEDBENCH OUT.");
    Ok(())
}
