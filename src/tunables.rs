// SCHEDULER TUNABLES
// THE "CURRENT TUNABLE STATE" IS AN EXPLICIT VALUE (TunableState), NOT
// WHATEVER THE KERNEL HAPPENS TO HOLD. EVERY SWEEP POINT BUILDS ITS FULL
// STATE (ALL DEFAULTS + ONE OVERRIDE) AND HANDS IT TO A TunableSink.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_TUNABLE_DIR: &str = "/sys/kernel/debug/sched";

// FAIR-SHARE TUNABLES AND THEIR KERNEL DEFAULTS, IN SWEEP ORDER
pub const DEFAULT_TUNABLES: [(&str, u64); 4] = [
    ("base_slice_ns", 3_000_000),
    ("migration_cost_ns", 500_000),
    ("nr_migrate", 32),
    ("tunable_scaling", 1),
];

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TunableSet {
    entries: Vec<(String, u64)>,
}

impl Default for TunableSet {
    fn default() -> Self {
        Self::new(DEFAULT_TUNABLES.iter().map(|(n, v)| (n.to_string(), *v)))
    }
}

impl TunableSet {
    pub fn new(entries: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn defaults(&self) -> TunableState {
        TunableState { values: self.entries.clone() }
    }
}

// A COMPLETE ASSIGNMENT OF EVERY TUNABLE IN THE SET
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TunableState {
    values: Vec<(String, u64)>,
}

impl TunableState {
    // DEFAULTS WITH ONE TUNABLE REPLACED. UNKNOWN NAMES ARE APPENDED.
    pub fn with(mut self, name: &str, value: u64) -> Self {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

// OPAQUE EFFECTFUL COLLABORATOR. THE SWEEP NEVER VERIFIES A WRITE TOOK.
pub trait TunableSink {
    fn apply(&mut self, state: &TunableState) -> Result<()>;
}

// WRITES <dir>/<name> FOR EVERY TUNABLE (DEBUGFS ON 5.13+ KERNELS)
pub struct FsTunables {
    dir: PathBuf,
    verbose: bool,
}

impl FsTunables {
    pub fn new(dir: impl Into<PathBuf>, verbose: bool) -> Self {
        Self { dir: dir.into(), verbose }
    }
}

impl TunableSink for FsTunables {
    fn apply(&mut self, state: &TunableState) -> Result<()> {
        for (name, value) in state.iter() {
            let path = self.dir.join(name);
            if self.verbose {
                println!("  SET {} = {}", path.display(), value);
            }
            fs::write(&path, value.to_string())
                .with_context(|| format!("FAILED TO WRITE {}", path.display()))?;
        }
        Ok(())
    }
}

// PRINTS WHAT WOULD BE WRITTEN. FOR UNPRIVILEGED DRY RUNS.
pub struct DryRunTunables;

impl TunableSink for DryRunTunables {
    fn apply(&mut self, state: &TunableState) -> Result<()> {
        for (name, value) in state.iter() {
            println!("  (DRY RUN) SET {} = {}", name, value);
        }
        Ok(())
    }
}
