// BENCHMARK INVOCATION
// RUNS ONE EXTERNAL TOOL TO COMPLETION (BLOCKING), STDOUT+STDERR INTO ONE
// LOG FILE, THEN READS THE LOG BACK AS THE CAPTURE TEXT.
// NEVER FAILS: A TOOL THAT CANNOT START YIELDS AN EMPTY CAPTURE.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime};

use crate::record::RawCapture;
use crate::workload::{Benchmark, ToolPaths, PERF_EVENTS};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Invocation {
    pub label: String,
    pub argv: Vec<String>,
}

pub trait Runner {
    fn run(&mut self, inv: &Invocation) -> RawCapture;
}

// PRIVILEGE + perf stat WRAPPING AROUND A TOOL'S OWN ARGV
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Launcher {
    pub tools: ToolPaths,
    pub sudo: bool,
    // NONE: RUN THE TOOL BARE
    pub perf: Option<String>,
}

impl Launcher {
    pub fn invocation(&self, label: String, bench: &Benchmark) -> Invocation {
        let tool = bench.argv(&self.tools);
        let mut argv = Vec::with_capacity(tool.len() + 8);
        // perf -a IS SYSTEM-WIDE AND NEEDS ROOT REGARDLESS OF THE TOOL
        if self.sudo && (self.perf.is_some() || bench.needs_privilege()) {
            argv.push("sudo".to_string());
        }
        if let Some(perf) = &self.perf {
            argv.extend([
                perf.clone(),
                "stat".to_string(),
                "-e".to_string(),
                PERF_EVENTS.to_string(),
                "-a".to_string(),
                "--".to_string(),
            ]);
        }
        argv.extend(tool);
        Invocation { label, argv }
    }
}

pub struct ProcessRunner {
    out_dir: PathBuf,
    verbose: bool,
}

impl ProcessRunner {
    pub fn new(out_dir: impl Into<PathBuf>, verbose: bool) -> Self {
        Self { out_dir: out_dir.into(), verbose }
    }
}

impl Runner for ProcessRunner {
    fn run(&mut self, inv: &Invocation) -> RawCapture {
        let started_at = SystemTime::now();
        let log_path = self.out_dir.join(format!("{}.log", inv.label));

        println!("{}", inv.argv.join(" "));

        let Some((program, args)) = inv.argv.split_first() else {
            eprintln!("WARNING: EMPTY COMMAND FOR {}", inv.label);
            return RawCapture::failed(started_at);
        };

        // ONE FILE DESCRIPTION FOR BOTH STREAMS: LINES INTERLEAVE AS EMITTED
        let (out, err) = match File::create(&log_path).and_then(|f| {
            let dup = f.try_clone()?;
            Ok((f, dup))
        }) {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("WARNING: CANNOT CREATE {}: {}", log_path.display(), e);
                return RawCapture::failed(started_at);
            }
        };

        let before = read_cpu_busy();
        let t0 = Instant::now();
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(out)
            .stderr(err)
            .status();
        let elapsed = t0.elapsed().as_secs_f64();
        let after = read_cpu_busy();

        let status = match status {
            Ok(s) => s,
            Err(e) => {
                eprintln!("WARNING: FAILED TO START {}: {}", program, e);
                let mut cap = RawCapture::failed(started_at);
                cap.log_path = Some(log_path);
                return cap;
            }
        };
        if !status.success() {
            eprintln!("WARNING: {} EXITED WITH {}", inv.label, status);
        }

        let text = match fs::read(&log_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                eprintln!("WARNING: CANNOT READ {}: {}", log_path.display(), e);
                String::new()
            }
        };
        if self.verbose {
            println!("  CAPTURED {} BYTES IN {:.2}s", text.len(), elapsed);
        }
        println!("SAVED LOG TO {}", log_path.display());

        RawCapture {
            text,
            started_at,
            exit_code: status.code(),
            elapsed_secs: Some(elapsed),
            cpu_busy: busy_delta(&before, &after),
            log_path: Some(log_path),
        }
    }
}

// PER-CPU BUSY JIFFIES: TOTAL MINUS (idle + iowait). AGGREGATE "cpu " LINE SKIPPED.
pub fn parse_proc_stat(raw: &str) -> BTreeMap<u32, u64> {
    let mut cpus = BTreeMap::new();
    for line in raw.lines() {
        let mut fields = line.split_whitespace();
        let Some(cpu) = fields
            .next()
            .and_then(|head| head.strip_prefix("cpu"))
            .and_then(|id| id.parse::<u32>().ok())
        else {
            continue;
        };
        let vals: Vec<u64> = fields.filter_map(|s| s.parse().ok()).collect();
        if vals.len() < 4 {
            continue;
        }
        let idle = vals[3] + vals.get(4).copied().unwrap_or(0);
        let total: u64 = vals.iter().sum();
        cpus.insert(cpu, total.saturating_sub(idle));
    }
    cpus
}

pub fn busy_delta(before: &BTreeMap<u32, u64>, after: &BTreeMap<u32, u64>) -> BTreeMap<u32, u64> {
    after
        .iter()
        .filter_map(|(cpu, a)| before.get(cpu).map(|b| (*cpu, a.saturating_sub(*b))))
        .collect()
}

fn read_cpu_busy() -> BTreeMap<u32, u64> {
    parse_proc_stat(&fs::read_to_string("/proc/stat").unwrap_or_default())
}

pub fn online_cpu_count() -> u32 {
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n < 1 { 1 } else { n as u32 }
}
