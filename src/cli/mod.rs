// SUBCOMMAND FRONT ENDS AND THEIR SHARED FLAGS

pub mod check;
pub mod compare;
pub mod parse;
pub mod sweep;

use std::path::PathBuf;

use clap::Args;

use schedbench::invoke::{online_cpu_count, Launcher};
use schedbench::table;
use schedbench::record::MetricsRecord;
use schedbench::workload::*;

pub const DEFAULT_OUT_DIR: &str = "/tmp/schedbench";

#[derive(Args, Clone, Debug)]
pub struct ToolArgs {
    // perf BINARY (MANY DISTROS SHIP IT OUTSIDE PATH)
    #[arg(long, default_value = "perf")]
    pub perf: String,

    #[arg(long, default_value = "hackbench")]
    pub hackbench_bin: String,

    #[arg(long, default_value = "cyclictest")]
    pub cyclictest_bin: String,

    #[arg(long, default_value = "deadline_test")]
    pub deadline_bin: String,

    #[arg(long, default_value = "stress-ng")]
    pub stress_bin: String,
}

impl ToolArgs {
    pub fn paths(&self) -> ToolPaths {
        ToolPaths {
            hackbench: self.hackbench_bin.clone(),
            cyclictest: self.cyclictest_bin.clone(),
            deadline_test: self.deadline_bin.clone(),
            stress_ng: self.stress_bin.clone(),
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    // RAW LOGS AND THE CSV LAND HERE
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    // PREFIX PRIVILEGED INVOCATIONS WITH sudo
    #[arg(long)]
    pub sudo: bool,

    // RUN TOOLS WITHOUT perf stat (NO CS/MIGRATION/UTIL COLUMNS)
    #[arg(long)]
    pub no_perf: bool,

    // REPETITIONS PER POINT. EACH IS ITS OWN ROW.
    #[arg(long, default_value_t = 1)]
    pub runs: u32,

    // CPU COUNT FOR THE UTILIZATION FORMULA (DEFAULT: ONLINE CPUs)
    #[arg(long)]
    pub cpus: Option<u32>,

    #[arg(long)]
    pub verbose: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

impl RunArgs {
    pub fn launcher(&self) -> Launcher {
        Launcher {
            tools: self.tools.paths(),
            sudo: self.sudo,
            perf: (!self.no_perf).then(|| self.tools.perf.clone()),
        }
    }

    pub fn cpu_count(&self) -> u32 {
        self.cpus.unwrap_or_else(online_cpu_count)
    }
}

#[derive(Args, Clone, Debug)]
pub struct HackbenchOpts {
    #[arg(long, default_value_t = DEFAULT_HACKBENCH_GROUPS)]
    pub hb_groups: u32,

    // PAIRS (FILE DESCRIPTORS) PER GROUP
    #[arg(long, default_value_t = DEFAULT_HACKBENCH_FDS)]
    pub hb_fds: u32,

    #[arg(long, default_value_t = DEFAULT_HACKBENCH_LOOPS)]
    pub hb_loops: u32,
}

impl HackbenchOpts {
    pub fn args(&self) -> HackbenchArgs {
        HackbenchArgs { groups: self.hb_groups, fds: self.hb_fds, loops: self.hb_loops }
    }
}

#[derive(Args, Clone, Debug)]
pub struct CyclictestOpts {
    #[arg(long, default_value_t = DEFAULT_RT_THREADS)]
    pub rt_threads: u32,

    #[arg(long, default_value_t = DEFAULT_RT_PRIORITY)]
    pub rt_priority: u32,

    #[arg(long, default_value_t = DEFAULT_RT_INTERVAL_US)]
    pub rt_interval_us: u64,

    #[arg(long, default_value_t = DEFAULT_RT_LOOPS)]
    pub rt_loops: u64,
}

impl CyclictestOpts {
    pub fn args(&self) -> CyclictestArgs {
        CyclictestArgs {
            threads: self.rt_threads,
            priority: self.rt_priority,
            interval_us: self.rt_interval_us,
            loops: self.rt_loops,
            affinity: None,
            mlockall: false,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct DeadlineOpts {
    #[arg(long, default_value_t = DEFAULT_DL_THREADS)]
    pub dl_threads: u32,

    #[arg(long, default_value_t = DEFAULT_DL_INTERVAL_US)]
    pub dl_interval_us: u64,

    // RESERVED CPU BANDWIDTH, PERCENT (-p)
    #[arg(long, default_value_t = DEFAULT_DL_BANDWIDTH)]
    pub dl_bandwidth: u32,

    #[arg(long, default_value_t = DEFAULT_DL_RUNTIME_PCT)]
    pub dl_runtime_pct: u32,
}

impl DeadlineOpts {
    pub fn args(&self) -> DeadlineArgs {
        DeadlineArgs {
            threads: self.dl_threads,
            interval_us: self.dl_interval_us,
            bandwidth_pct: self.dl_bandwidth,
            runtime_pct: self.dl_runtime_pct,
        }
    }
}

pub fn print_summary(records: &[MetricsRecord]) {
    println!();
    for line in table::summary_lines(records) {
        println!("{}", line);
    }
}
