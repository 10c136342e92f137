// SCHEDBENCH RESULT TABLE
// ONE ROW PER RECORD, IN THE ORDER RECEIVED. FIXED COLUMN ORDER:
// DOWNSTREAM PLOTTERS ADDRESS COLUMNS BY NAME AND POSITION.
// ABSENT VALUES ARE EMPTY CELLS, NEVER 0.

use std::fmt::Display;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::MetricsRecord;
use crate::workload::Framing;

pub const BASE_COLUMNS: [&str; 15] = [
    "Scheduler",
    "Workload",
    "Tunable",
    "Setting",
    "Value",
    "Run",
    "Latency_us",
    "Throughput_ops_sec",
    "CPUUtil_percent",
    "ContextSwitches",
    "CpuMigrations",
    "MissedDeadlines",
    "Bandwidth_percent",
    "Derivation",
    "Imbalance_ratio",
];

pub fn header(cpus: &[u32]) -> Vec<String> {
    let mut cols: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    cols.extend(sorted(cpus).iter().map(|c| format!("cpu{}_cycles", c)));
    cols
}

fn sorted(cpus: &[u32]) -> Vec<u32> {
    let mut v = cpus.to_vec();
    v.sort_unstable();
    v.dedup();
    v
}

fn cell<T: Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

pub fn row(rec: &MetricsRecord, cpus: &[u32]) -> Vec<String> {
    let (workload, tunable, setting, value) = match &rec.params.framing {
        Framing::PolicyComparison => (String::new(), String::new(), String::new(), String::new()),
        Framing::TunableSweep { workload, tunable, setting, value } => (
            workload.label().to_string(),
            tunable.clone(),
            setting.label().to_string(),
            value.to_string(),
        ),
    };
    let mut cells = vec![
        rec.params.policy.label().to_string(),
        workload,
        tunable,
        setting,
        value,
        rec.params.repetition.to_string(),
        cell(rec.latency_us),
        cell(rec.throughput_ops_sec),
        cell(rec.cpu_util_percent),
        cell(rec.context_switches),
        cell(rec.cpu_migrations),
        cell(rec.missed_deadlines),
        cell(rec.bandwidth_percent),
        cell(rec.derivation.map(|d| d.label())),
        cell(rec.imbalance_ratio()),
    ];
    cells.extend(sorted(cpus).iter().map(|c| cell(rec.per_cpu_cycles.get(c))));
    cells
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line(cells: &[String]) -> String {
    cells.iter().map(|c| escape(c)).collect::<Vec<_>>().join(",")
}

pub fn to_csv(records: &[MetricsRecord], cpus: &[u32]) -> String {
    let mut out = csv_line(&header(cpus));
    out.push('\n');
    for rec in records {
        out.push_str(&csv_line(&row(rec, cpus)));
        out.push('\n');
    }
    out
}

pub fn write_csv(path: &Path, records: &[MetricsRecord], cpus: &[u32]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("MKDIR FAILED: {}", dir.display()))?;
    }
    fs::write(path, to_csv(records, cpus))
        .with_context(|| format!("WRITE FAILED: {}", path.display()))?;
    Ok(())
}

fn num(v: Option<f64>, width: usize) -> String {
    match v {
        Some(v) => format!("{:>width$.2}", v, width = width),
        None => format!("{:>width$}", "-", width = width),
    }
}

fn count<T: Display>(v: Option<T>, width: usize) -> String {
    match v {
        Some(v) => format!("{:>width$}", v, width = width),
        None => format!("{:>width$}", "-", width = width),
    }
}

// FIXED-WIDTH TERMINAL SUMMARY
pub fn summary_lines(records: &[MetricsRecord]) -> Vec<String> {
    let sep = "=".repeat(108);
    let mut lines = vec![
        sep.clone(),
        "SCHEDBENCH SUMMARY".to_string(),
        sep.clone(),
        format!(
            "{:<9} {:<30} {:>12} {:>14} {:>10} {:>10} {:>8} {:>8}",
            "SCHED", "POINT", "LAT_US", "OPS/S", "UTIL%", "CS", "MIGR", "MISSED"
        ),
        format!(
            "{} {} {} {} {} {} {} {}",
            "-".repeat(9),
            "-".repeat(30),
            "-".repeat(12),
            "-".repeat(14),
            "-".repeat(10),
            "-".repeat(10),
            "-".repeat(8),
            "-".repeat(8),
        ),
    ];
    for rec in records {
        let point = match &rec.params.framing {
            Framing::PolicyComparison => format!("run {}", rec.params.repetition),
            Framing::TunableSweep { workload, tunable, setting, .. } => format!(
                "{}/{}/{}",
                workload.label(), tunable, setting.label()
            ),
        };
        lines.push(format!(
            "{:<9} {:<30} {} {} {} {} {} {}",
            rec.params.policy.label(),
            point,
            num(rec.latency_us, 12),
            num(rec.throughput_ops_sec, 14),
            num(rec.cpu_util_percent, 10),
            count(rec.context_switches, 10),
            count(rec.cpu_migrations, 8),
            count(rec.missed_deadlines, 8),
        ));
    }
    lines.push(sep);
    lines.push(format!("ROWS: {}", records.len()));
    lines
}
