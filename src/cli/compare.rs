use std::fs;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Args;

use schedbench::invoke::ProcessRunner;
use schedbench::sweep::{CompareConfig, Orchestrator};
use schedbench::table;

use super::{print_summary, CyclictestOpts, DeadlineOpts, HackbenchOpts, RunArgs};

const CSV_NAME: &str = "summary.csv";

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub hackbench: HackbenchOpts,

    #[command(flatten)]
    pub cyclictest: CyclictestOpts,

    #[command(flatten)]
    pub deadline: DeadlineOpts,
}

pub fn run_compare(args: &CompareArgs, stop: &AtomicBool) -> Result<()> {
    let cfg = CompareConfig {
        hackbench: args.hackbench.args(),
        cyclictest: args.cyclictest.args(),
        deadline: args.deadline.args(),
        runs: args.run.runs,
        cpu_count: args.run.cpu_count(),
    };

    fs::create_dir_all(&args.run.out_dir)
        .with_context(|| format!("MKDIR FAILED: {}", args.run.out_dir.display()))?;

    println!("SCHEDBENCH POLICY COMPARISON");
    println!("CPUS:            {}", cfg.cpu_count);
    println!("RUNS:            {}", cfg.runs);
    println!("PERF:            {}", !args.run.no_perf);
    println!("OUT DIR:         {}", args.run.out_dir.display());

    let launcher = args.run.launcher();
    let mut runner = ProcessRunner::new(&args.run.out_dir, args.run.verbose);
    let records = Orchestrator::new(&launcher, &mut runner, stop, args.run.verbose)
        .compare_policies(&cfg);

    let csv = args.run.out_dir.join(CSV_NAME);
    table::write_csv(&csv, &records, &[])?;
    println!("\n=== SUMMARY SAVED TO {} ===", csv.display());
    print_summary(&records);
    Ok(())
}
