use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use clap::Args;

use schedbench::invoke::ProcessRunner;
use schedbench::sweep::{Orchestrator, SweepConfig};
use schedbench::table;
use schedbench::tunables::{DryRunTunables, FsTunables, TunableSink, DEFAULT_TUNABLE_DIR};
use schedbench::workload::{
    parse_cpu_list, DEFAULT_STRESS_SECS, DEFAULT_STRESS_VM_BYTES, DEFAULT_SWEEP_INTERVAL_US,
    DEFAULT_SWEEP_LOOPS,
};

use super::{print_summary, RunArgs};

const CSV_NAME: &str = "scheduler_results.csv";

#[derive(Args, Debug)]
pub struct SweepArgs {
    #[command(flatten)]
    pub run: RunArgs,

    // CPUs UNDER LOAD: ONE CYCLICTEST THREAD / STRESS WORKER EACH
    #[arg(long, default_value = "0-3")]
    pub cpu_list: String,

    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL_US)]
    pub interval_us: u64,

    #[arg(long, default_value_t = DEFAULT_SWEEP_LOOPS)]
    pub loops: u64,

    #[arg(long, default_value_t = DEFAULT_STRESS_SECS)]
    pub stress_secs: u64,

    #[arg(long, default_value = DEFAULT_STRESS_VM_BYTES)]
    pub vm_bytes: String,

    #[arg(long, default_value = DEFAULT_TUNABLE_DIR)]
    pub tunable_dir: PathBuf,

    // PRINT TUNABLE WRITES INSTEAD OF PERFORMING THEM
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run_sweep(args: &SweepArgs, stop: &AtomicBool) -> Result<()> {
    let cpus = parse_cpu_list(&args.cpu_list);
    if cpus.is_empty() {
        bail!("NO CPUs IN --cpu-list {:?}", args.cpu_list);
    }

    let mut cfg = SweepConfig::new(cpus);
    cfg.interval_us = args.interval_us;
    cfg.loops = args.loops;
    cfg.stress_secs = args.stress_secs;
    cfg.vm_bytes = args.vm_bytes.clone();
    cfg.runs = args.run.runs;
    cfg.cpu_count = args.run.cpu_count();

    fs::create_dir_all(&args.run.out_dir)
        .with_context(|| format!("MKDIR FAILED: {}", args.run.out_dir.display()))?;

    println!("SCHEDBENCH TUNABLE SWEEP");
    println!("CPUS UNDER LOAD: {:?}", cfg.cpus);
    println!("TUNABLES:        {}", cfg.tunables.len());
    println!("POINTS:          {}", cfg.points().len());
    println!("TUNABLE SINK:    {}", if args.dry_run {
        "DRY RUN".to_string()
    } else {
        args.tunable_dir.display().to_string()
    });
    println!("OUT DIR:         {}", args.run.out_dir.display());

    let mut sink: Box<dyn TunableSink> = if args.dry_run {
        Box::new(DryRunTunables)
    } else {
        Box::new(FsTunables::new(&args.tunable_dir, args.run.verbose))
    };

    let launcher = args.run.launcher();
    let mut runner = ProcessRunner::new(&args.run.out_dir, args.run.verbose);
    let records = Orchestrator::new(&launcher, &mut runner, stop, args.run.verbose)
        .sweep_tunables(&cfg, sink.as_mut());

    // LEAVE THE SYSTEM AT DEFAULTS
    if let Err(e) = sink.apply(&cfg.tunables.defaults()) {
        eprintln!("WARNING: FAILED TO RESTORE DEFAULTS: {:#}", e);
    }

    let csv = args.run.out_dir.join(CSV_NAME);
    table::write_csv(&csv, &records, &cfg.cpus)?;
    println!("\nRESULTS SAVED TO {}", csv.display());
    print_summary(&records);
    Ok(())
}
