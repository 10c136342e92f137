// PERF-STAT COUNTER SCAN
// SHARED BY EVERY TOOL WRAPPED IN `perf stat`. LINE-ORIENTED, ORDER-FREE.
// A LINE THAT MENTIONS A MARKER BUT CARRIES NO NUMBER IS SKIPPED.
// REPEATED MARKERS: LAST OCCURRENCE WINS.

const TASK_CLOCK: &str = "task-clock";
const CONTEXT_SWITCHES: &str = "context-switches";
const CPU_MIGRATIONS: &str = "cpu-migrations";
const TIME_ELAPSED: &str = "seconds time elapsed";

#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct PerfCounters {
    pub task_clock_ms: Option<f64>,
    pub context_switches: Option<u64>,
    pub cpu_migrations: Option<u64>,
    pub elapsed_secs: Option<f64>,
}

impl PerfCounters {
    pub fn parse(text: &str) -> Self {
        let mut c = Self::default();
        for raw in text.lines() {
            // DROP perf's "# 3.9 CPUs utilized" STYLE ANNOTATIONS
            let line = raw.split('#').next().unwrap_or_default();
            if line.contains(TASK_CLOCK) {
                if let Some(v) = first_number(line) {
                    c.task_clock_ms = Some(v);
                }
            } else if line.contains(CONTEXT_SWITCHES) {
                if let Some(v) = first_count(line) {
                    c.context_switches = Some(v);
                }
            } else if line.contains(CPU_MIGRATIONS) {
                if let Some(v) = first_count(line) {
                    c.cpu_migrations = Some(v);
                }
            } else if line.contains(TIME_ELAPSED) {
                if let Some(v) = first_number(line) {
                    c.elapsed_secs = Some(v);
                }
            }
        }
        c
    }

    // task_clock / (elapsed x 1000 x cpu_count) x 100
    // task-clock IS IN MSEC, ELAPSED IN SECONDS. NEVER DIVIDES BY AN ABSENT VALUE.
    pub fn cpu_util_percent(&self, cpu_count: u32) -> Option<f64> {
        let task_clock = self.task_clock_ms?;
        let elapsed = self.elapsed_secs?;
        if elapsed <= 0.0 || cpu_count == 0 {
            return None;
        }
        Some(task_clock / (elapsed * 1000.0 * cpu_count as f64) * 100.0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// FIRST WHITESPACE TOKEN THAT PARSES AS A FINITE NUMBER ONCE THOUSANDS
// SEPARATORS ARE STRIPPED. HANDLES "5,000.12 msec task-clock" AND
// "task-clock 5000000" ALIKE.
fn first_number(line: &str) -> Option<f64> {
    line.split_whitespace()
        .filter_map(|tok| tok.replace(',', "").parse::<f64>().ok())
        .find(|v| v.is_finite())
}

fn first_count(line: &str) -> Option<u64> {
    line.split_whitespace()
        .find_map(|tok| tok.replace(',', "").parse::<u64>().ok())
}
