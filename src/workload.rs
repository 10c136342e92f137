// SCHEDBENCH WORKLOAD TYPES
// PURE-RUST MODULE: NO PROCESS SPAWNING, NO FILESYSTEM ACCESS
// SHARED BETWEEN THE BINARY (SWEEPS, CLI) AND THE LIB CRATE (TESTS)

use std::fmt;

// PERF EVENTS CAPTURED AROUND EVERY POLICY-COMPARISON RUN
pub const PERF_EVENTS: &str = "task-clock,cycles,instructions,context-switches,cpu-migrations";

// HACKBENCH DEFAULTS (FAIR-SHARE MESSAGE PASSING)
pub const DEFAULT_HACKBENCH_GROUPS: u32 = 2;
pub const DEFAULT_HACKBENCH_FDS: u32    = 20;
pub const DEFAULT_HACKBENCH_LOOPS: u32  = 2000;

// CYCLICTEST DEFAULTS (FIXED-PRIORITY COMPARISON)
pub const DEFAULT_RT_THREADS: u32     = 2;
pub const DEFAULT_RT_PRIORITY: u32    = 80;
pub const DEFAULT_RT_INTERVAL_US: u64 = 1000;
pub const DEFAULT_RT_LOOPS: u64       = 2000;

// DEADLINE_TEST DEFAULTS
pub const DEFAULT_DL_THREADS: u32     = 2;
pub const DEFAULT_DL_INTERVAL_US: u64 = 2000;
pub const DEFAULT_DL_BANDWIDTH: u32   = 50;
pub const DEFAULT_DL_RUNTIME_PCT: u32 = 100;

// TUNABLE SWEEP DEFAULTS
pub const DEFAULT_SWEEP_INTERVAL_US: u64 = 10_000;
pub const DEFAULT_SWEEP_LOOPS: u64       = 1000;
pub const DEFAULT_STRESS_SECS: u64       = 30;
pub const DEFAULT_STRESS_VM_BYTES: &str  = "512M";

// SCHEDULING POLICY UNDER TEST

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Policy {
    FairShare,
    FixedPriority,
    Deadline,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::FairShare, Policy::FixedPriority, Policy::Deadline];

    pub fn label(self) -> &'static str {
        match self {
            Self::FairShare => "CFS",
            Self::FixedPriority => "RT-FIFO",
            Self::Deadline => "DEADLINE",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// SYNTHETIC LOAD KIND (TUNABLE SWEEP ONLY)

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WorkloadKind {
    CpuBound,
    MemoryBound,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 2] = [WorkloadKind::CpuBound, WorkloadKind::MemoryBound];

    pub fn label(self) -> &'static str {
        match self {
            Self::CpuBound => "cpu_bound",
            Self::MemoryBound => "memory_bound",
        }
    }
}

// THE THREE SETTINGS EVERY TUNABLE IS SWEPT ACROSS

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Setting {
    Default,
    Small,
    Large,
}

impl Setting {
    pub const ALL: [Setting; 3] = [Setting::Default, Setting::Small, Setting::Large];

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Small => "small",
            Self::Large => "large",
        }
    }

    // SMALL = HALF OF DEFAULT, FLOORED AT 1. LARGE = DOUBLE.
    pub fn value(self, default: u64) -> u64 {
        match self {
            Self::Default => default,
            Self::Small => (default / 2).max(1),
            Self::Large => default.saturating_mul(2),
        }
    }
}

// EXACTLY ONE FRAMING PER RUN. FIELDS OF THE OTHER FRAMING DO NOT EXIST.

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Framing {
    PolicyComparison,
    TunableSweep {
        workload: WorkloadKind,
        tunable: String,
        setting: Setting,
        value: u64,
    },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RunParameters {
    pub policy: Policy,
    pub framing: Framing,
    pub repetition: u32,
}

impl RunParameters {
    pub fn comparison(policy: Policy, repetition: u32) -> Self {
        Self { policy, framing: Framing::PolicyComparison, repetition }
    }

    pub fn workload(&self) -> Option<WorkloadKind> {
        match &self.framing {
            Framing::TunableSweep { workload, .. } => Some(*workload),
            Framing::PolicyComparison => None,
        }
    }

    // FILE-NAME SAFE LABEL FOR RAW LOGS
    pub fn log_label(&self) -> String {
        match &self.framing {
            Framing::PolicyComparison => format!("{}_r{}", self.policy.label(), self.repetition),
            Framing::TunableSweep { workload, tunable, setting, .. } => format!(
                "{}_{}_{}_r{}",
                workload.label(), tunable, setting.label(), self.repetition
            ),
        }
    }
}

// TYPED BENCHMARK INVOCATIONS
// EVERY DERIVATION CONSTANT (MESSAGE COUNT, LOOPS x THREADS) COMES FROM
// THESE FIELDS, THE SAME VALUES THAT BUILD THE ARGV.

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HackbenchArgs {
    pub groups: u32,
    pub fds: u32,
    pub loops: u32,
}

impl Default for HackbenchArgs {
    fn default() -> Self {
        Self {
            groups: DEFAULT_HACKBENCH_GROUPS,
            fds: DEFAULT_HACKBENCH_FDS,
            loops: DEFAULT_HACKBENCH_LOOPS,
        }
    }
}

impl HackbenchArgs {
    // GROUPS x PAIRS-PER-GROUP x LOOPS. NONE ON OVERFLOW.
    pub fn message_count(&self) -> Option<u64> {
        (self.groups as u64)
            .checked_mul(self.fds as u64)?
            .checked_mul(self.loops as u64)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CyclictestArgs {
    pub threads: u32,
    pub priority: u32,
    pub interval_us: u64,
    pub loops: u64,
    pub affinity: Option<String>,
    pub mlockall: bool,
}

impl Default for CyclictestArgs {
    fn default() -> Self {
        Self {
            threads: DEFAULT_RT_THREADS,
            priority: DEFAULT_RT_PRIORITY,
            interval_us: DEFAULT_RT_INTERVAL_US,
            loops: DEFAULT_RT_LOOPS,
            affinity: None,
            mlockall: false,
        }
    }
}

impl CyclictestArgs {
    pub fn total_loops(&self) -> Option<u64> {
        self.loops.checked_mul(self.threads as u64)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DeadlineArgs {
    pub threads: u32,
    pub interval_us: u64,
    pub bandwidth_pct: u32,
    pub runtime_pct: u32,
}

impl Default for DeadlineArgs {
    fn default() -> Self {
        Self {
            threads: DEFAULT_DL_THREADS,
            interval_us: DEFAULT_DL_INTERVAL_US,
            bandwidth_pct: DEFAULT_DL_BANDWIDTH,
            runtime_pct: DEFAULT_DL_RUNTIME_PCT,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StressVmArgs {
    pub workers: u32,
    pub timeout_secs: u64,
    pub vm_bytes: String,
    // PIN WORKERS (--taskset). ALSO BOUNDS WHICH CPUs COUNT AS LOAD.
    pub taskset: Option<Vec<u32>>,
}

// CLOSED SET OF TOOLS. EACH VARIANT OWNS ITS OUTPUT GRAMMAR IN extract.rs.

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Benchmark {
    Hackbench(HackbenchArgs),
    Cyclictest(CyclictestArgs),
    DeadlineTest(DeadlineArgs),
    StressVm(StressVmArgs),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ToolPaths {
    pub hackbench: String,
    pub cyclictest: String,
    pub deadline_test: String,
    pub stress_ng: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            hackbench: "hackbench".to_string(),
            cyclictest: "cyclictest".to_string(),
            deadline_test: "deadline_test".to_string(),
            stress_ng: "stress-ng".to_string(),
        }
    }
}

impl Benchmark {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Hackbench(_) => "hackbench",
            Self::Cyclictest(_) => "cyclictest",
            Self::DeadlineTest(_) => "deadline_test",
            Self::StressVm(_) => "stress-ng",
        }
    }

    // REAL-TIME AND DEADLINE TOOLS NEED ROOT TO SET THEIR POLICY
    pub fn needs_privilege(&self) -> bool {
        matches!(self, Self::Cyclictest(_) | Self::DeadlineTest(_))
    }

    pub fn argv(&self, paths: &ToolPaths) -> Vec<String> {
        match self {
            Self::Hackbench(a) => vec![
                paths.hackbench.clone(),
                "-g".into(), a.groups.to_string(),
                "-f".into(), a.fds.to_string(),
                "-l".into(), a.loops.to_string(),
            ],
            Self::Cyclictest(a) => {
                let mut v = vec![
                    paths.cyclictest.clone(),
                    "-q".into(),
                    "-t".into(), a.threads.to_string(),
                    "-p".into(), a.priority.to_string(),
                ];
                if let Some(aff) = &a.affinity {
                    v.push("-a".into());
                    v.push(aff.clone());
                }
                v.extend([
                    "-i".into(), a.interval_us.to_string(),
                    "-l".into(), a.loops.to_string(),
                ]);
                if a.mlockall {
                    v.push("-m".into());
                }
                v
            }
            Self::DeadlineTest(a) => vec![
                paths.deadline_test.clone(),
                "-t".into(), a.threads.to_string(),
                "-i".into(), a.interval_us.to_string(),
                "-p".into(), a.bandwidth_pct.to_string(),
                "-P".into(), a.runtime_pct.to_string(),
            ],
            Self::StressVm(a) => {
                let mut v = vec![
                    paths.stress_ng.clone(),
                    "--vm".into(), a.workers.to_string(),
                    "--timeout".into(), format!("{}s", a.timeout_secs),
                    "--metrics-brief".into(),
                    "--vm-bytes".into(), a.vm_bytes.clone(),
                ];
                if let Some(cpus) = &a.taskset {
                    v.push("--taskset".into());
                    v.push(join_cpu_list(cpus));
                }
                v
            }
        }
    }
}

pub fn join_cpu_list(cpus: &[u32]) -> String {
    cpus.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",")
}

// CPU LIST PARSER: "0-3", "0,2,4-5". MALFORMED RANGES ARE SKIPPED.
pub fn parse_cpu_list(raw: &str) -> Vec<u32> {
    let mut cpus = Vec::new();
    for range in raw.trim().split(',') {
        let parts: Vec<&str> = range.trim().split('-').collect();
        match parts.len() {
            1 => {
                if let Ok(c) = parts[0].parse::<u32>() {
                    cpus.push(c);
                }
            }
            2 => {
                if let (Ok(lo), Ok(hi)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
                    cpus.extend(lo..=hi);
                }
            }
            _ => {}
        }
    }
    cpus.sort_unstable();
    cpus.dedup();
    cpus
}
