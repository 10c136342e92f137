use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use schedbench::extract::extract;
use schedbench::invoke::online_cpu_count;
use schedbench::perf::PerfCounters;
use schedbench::record::RawCapture;
use schedbench::table;
use schedbench::workload::{Benchmark, Policy, RunParameters};

use super::{print_summary, CyclictestOpts, DeadlineOpts, HackbenchOpts};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Tool {
    Hackbench,
    Cyclictest,
    Deadline,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    // WHICH GRAMMAR THE LOG FOLLOWS
    #[arg(long, value_enum)]
    pub tool: Tool,

    // SAVED LOG FROM A PREVIOUS RUN
    pub log: PathBuf,

    #[arg(long)]
    pub cpus: Option<u32>,

    // HARNESS WALL CLOCK, WHEN THE LOG CARRIES NO perf ELAPSED LINE
    #[arg(long)]
    pub elapsed_secs: Option<f64>,

    #[command(flatten)]
    pub hackbench: HackbenchOpts,

    #[command(flatten)]
    pub cyclictest: CyclictestOpts,

    #[command(flatten)]
    pub deadline: DeadlineOpts,
}

// OFFLINE RE-EXTRACTION. SAME FLAGS AS THE RUN THAT PRODUCED THE LOG.
pub fn run_parse(args: &ParseArgs) -> Result<()> {
    let bytes = fs::read(&args.log)
        .with_context(|| format!("READ FAILED: {}", args.log.display()))?;

    let (policy, bench) = match args.tool {
        Tool::Hackbench => (Policy::FairShare, Benchmark::Hackbench(args.hackbench.args())),
        Tool::Cyclictest => (Policy::FixedPriority, Benchmark::Cyclictest(args.cyclictest.args())),
        Tool::Deadline => (Policy::Deadline, Benchmark::DeadlineTest(args.deadline.args())),
    };

    let mut capture = RawCapture::from_text(String::from_utf8_lossy(&bytes));
    capture.elapsed_secs = args.elapsed_secs;
    capture.log_path = Some(args.log.clone());

    if PerfCounters::parse(&capture.text).is_empty() {
        eprintln!("NOTE: NO perf stat COUNTERS IN {} (CS/MIGRATION/UTIL LEFT EMPTY)", args.log.display());
    }

    let cpu_count = args.cpus.unwrap_or_else(online_cpu_count);
    let rec = extract(&bench, RunParameters::comparison(policy, 0), &capture, cpu_count);

    print!("{}", table::to_csv(std::slice::from_ref(&rec), &[]));
    print_summary(std::slice::from_ref(&rec));
    Ok(())
}
