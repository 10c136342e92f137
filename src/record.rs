// SCHEDBENCH RECORDS
// RawCapture: ONE BENCHMARK INVOCATION'S OUTPUT, READ-ONLY AFTER CAPTURE.
// MetricsRecord: ONE CANONICAL ROW. ABSENT = UNKNOWN, NEVER A FAKE ZERO.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::workload::RunParameters;

#[derive(Clone, Debug)]
pub struct RawCapture {
    pub text: String,
    pub started_at: SystemTime,
    // NONE: PROCESS NEVER STARTED OR WAS KILLED BY A SIGNAL
    pub exit_code: Option<i32>,
    // HARNESS WALL CLOCK, NOT PARSED FROM TEXT
    pub elapsed_secs: Option<f64>,
    // PER-CPU BUSY JIFFIES DELTA ACROSS THE RUN (FROM /proc/stat)
    pub cpu_busy: BTreeMap<u32, u64>,
    pub log_path: Option<PathBuf>,
}

impl RawCapture {
    // WRAP TEXT THAT DID NOT COME FROM A LIVE RUN (SAVED LOGS, TESTS)
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            started_at: SystemTime::now(),
            exit_code: Some(0),
            elapsed_secs: None,
            cpu_busy: BTreeMap::new(),
            log_path: None,
        }
    }

    // PROCESS FAILED TO START: NO TEXT, NO STATUS
    pub fn failed(started_at: SystemTime) -> Self {
        Self {
            text: String::new(),
            started_at,
            exit_code: None,
            elapsed_secs: None,
            cpu_busy: BTreeMap::new(),
            log_path: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// HOW latency_us / throughput_ops_sec WERE OBTAINED. NEVER MIXED IN ONE RECORD.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Derivation {
    Measured,
    ConfigDerived,
}

impl Derivation {
    pub fn label(self) -> &'static str {
        match self {
            Self::Measured => "measured",
            Self::ConfigDerived => "config",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct MetricsRecord {
    pub params: RunParameters,
    pub latency_us: Option<f64>,
    pub throughput_ops_sec: Option<f64>,
    pub cpu_util_percent: Option<f64>,
    pub context_switches: Option<u64>,
    pub cpu_migrations: Option<u64>,
    pub missed_deadlines: Option<u64>,
    pub bandwidth_percent: Option<u32>,
    pub derivation: Option<Derivation>,
    pub per_cpu_cycles: BTreeMap<u32, u64>,
}

impl MetricsRecord {
    pub fn sparse(params: RunParameters) -> Self {
        Self {
            params,
            latency_us: None,
            throughput_ops_sec: None,
            cpu_util_percent: None,
            context_switches: None,
            cpu_migrations: None,
            missed_deadlines: None,
            bandwidth_percent: None,
            derivation: None,
            per_cpu_cycles: BTreeMap::new(),
        }
    }

    // TRUE WHEN NOTHING COULD BE DERIVED FROM THE CAPTURE
    pub fn is_empty(&self) -> bool {
        self.latency_us.is_none()
            && self.throughput_ops_sec.is_none()
            && self.cpu_util_percent.is_none()
            && self.context_switches.is_none()
            && self.cpu_migrations.is_none()
            && self.missed_deadlines.is_none()
            && self.bandwidth_percent.is_none()
            && self.per_cpu_cycles.is_empty()
    }

    // MAX / MIN OVER PER-CPU PROXY VALUES. 1.0 = PERFECTLY BALANCED.
    pub fn imbalance_ratio(&self) -> Option<f64> {
        let min = *self.per_cpu_cycles.values().min()?;
        let max = *self.per_cpu_cycles.values().max()?;
        if min == 0 {
            return None;
        }
        Some(max as f64 / min as f64)
    }
}
