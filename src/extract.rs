// SCHEDBENCH METRICS EXTRACTOR
// (BENCHMARK, RUN PARAMETERS, RAW CAPTURE) -> MetricsRecord
//
// PURE: NO I/O, NO HIDDEN STATE. SAME INPUT, BIT-IDENTICAL OUTPUT.
// NEVER FAILS: A LINE THAT DOES NOT MATCH ITS MICRO-GRAMMAR IS SKIPPED,
// A METRIC WHOSE SOURCE NEVER APPEARS STAYS ABSENT.
//
// GRAMMARS:
//   hackbench      "Time: <float>"                   (ONCE)
//   cyclictest     "T: n ... Min: a ... Avg: b ... Max: c"  (PER THREAD)
//   deadline_test  "avg_time: <float>us"             (PER THREAD, OPTIONAL)
//   perf stat      SEE perf.rs                       (ANY TOOL)

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::perf::PerfCounters;
use crate::record::{Derivation, MetricsRecord, RawCapture};
use crate::workload::{
    parse_cpu_list, Benchmark, CyclictestArgs, DeadlineArgs, Framing, HackbenchArgs,
    RunParameters,
};

static HACKBENCH_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Time:\s*([0-9]+(?:\.[0-9]+)?)").unwrap());
static CYCLIC_TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Min:\s*(\d+).*?Avg:\s*(\d+).*?Max:\s*(\d+)").unwrap());
static CYCLIC_THREAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"T:\s*(\d+)").unwrap());
static DEADLINE_AVG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"avg_time:\s*([0-9]+(?:\.[0-9]+)?)us").unwrap());

// ONE CYCLICTEST SUMMARY LINE
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CyclicLine {
    pub thread: Option<u32>,
    pub min_us: u64,
    pub avg_us: u64,
    pub max_us: u64,
}

pub fn extract(
    bench: &Benchmark,
    params: RunParameters,
    capture: &RawCapture,
    cpu_count: u32,
) -> MetricsRecord {
    let text = capture.text.as_str();
    let sweep = matches!(params.framing, Framing::TunableSweep { .. });
    let mut rec = MetricsRecord::sparse(params);

    let perf = PerfCounters::parse(text);
    rec.context_switches = perf.context_switches;
    rec.cpu_migrations = perf.cpu_migrations;
    rec.cpu_util_percent = perf.cpu_util_percent(cpu_count);

    match bench {
        Benchmark::Hackbench(args) => {
            if let Some((lat, thr)) = fair_share(text, args) {
                rec.latency_us = Some(lat);
                rec.throughput_ops_sec = Some(thr);
                rec.derivation = Some(Derivation::Measured);
            }
        }
        Benchmark::Cyclictest(args) => {
            let lines = parse_cyclictest(text);
            // PERF'S CLOCK IS TIGHTER THAN THE HARNESS'S (NO sudo/perf STARTUP)
            let elapsed = perf.elapsed_secs.or(capture.elapsed_secs);
            let (lat, thr) = fixed_priority(&lines, args, elapsed);
            rec.latency_us = lat;
            rec.throughput_ops_sec = thr;
            if lat.is_some() || thr.is_some() {
                rec.derivation = Some(Derivation::Measured);
            }
            if sweep {
                let cpus = args.affinity.as_deref().map(parse_cpu_list).unwrap_or_default();
                rec.per_cpu_cycles = per_cpu_avg_sum(&lines, &cpus);
            }
        }
        Benchmark::DeadlineTest(args) => {
            rec.bandwidth_percent = Some(args.bandwidth_pct);
            if !text.trim().is_empty() {
                rec.missed_deadlines = Some(count_missed(text));
            }
            match deadline_measured(text) {
                Some((lat, thr)) => {
                    rec.latency_us = Some(lat);
                    rec.throughput_ops_sec = thr;
                    rec.derivation = Some(Derivation::Measured);
                }
                // ESTIMATES ONLY FOR RUNS THAT COMPLETED CLEANLY WITH OUTPUT
                None if capture.succeeded() && !text.trim().is_empty() => {
                    let (lat, thr) = deadline_configured(args);
                    rec.latency_us = lat;
                    rec.throughput_ops_sec = thr;
                    if lat.is_some() || thr.is_some() {
                        rec.derivation = Some(Derivation::ConfigDerived);
                    }
                }
                None => {}
            }
        }
        Benchmark::StressVm(args) => {
            // stress-ng REPORTS NO LATENCY: ONLY THE HARNESS'S PER-CPU SAMPLE
            rec.per_cpu_cycles = capture
                .cpu_busy
                .iter()
                .filter(|(cpu, _)| args.taskset.as_ref().map_or(true, |set| set.contains(*cpu)))
                .map(|(cpu, busy)| (*cpu, *busy))
                .collect();
        }
    }

    rec
}

// FAIR-SHARE: latency = time / messages x 1e6, throughput = messages / time
pub fn fair_share(text: &str, args: &HackbenchArgs) -> Option<(f64, f64)> {
    let caps = HACKBENCH_TIME.captures(text)?;
    let total: f64 = caps[1].parse().ok()?;
    let messages = args.message_count()?;
    if total <= 0.0 || messages == 0 {
        return None;
    }
    let messages = messages as f64;
    Some((total / messages * 1e6, messages / total))
}

pub fn parse_cyclictest(text: &str) -> Vec<CyclicLine> {
    text.lines()
        .filter_map(|line| {
            let caps = CYCLIC_TRIPLE.captures(line)?;
            let min_us = caps[1].parse().ok()?;
            let avg_us = caps[2].parse().ok()?;
            let max_us = caps[3].parse().ok()?;
            let thread = CYCLIC_THREAD
                .captures(line)
                .and_then(|t| t[1].parse().ok());
            Some(CyclicLine { thread, min_us, avg_us, max_us })
        })
        .collect()
}

// FIXED-PRIORITY: latency = MEAN OF EVERY Avg, throughput = loops x threads / elapsed
pub fn fixed_priority(
    lines: &[CyclicLine],
    args: &CyclictestArgs,
    elapsed_secs: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    if lines.is_empty() {
        return (None, None);
    }
    // f64 ACCUMULATOR: HUGE Avg VALUES MUST NOT OVERFLOW
    let sum: f64 = lines.iter().map(|l| l.avg_us as f64).sum();
    let latency = sum / lines.len() as f64;
    let throughput = match (args.total_loops(), elapsed_secs) {
        (Some(loops), Some(e)) if e > 0.0 => Some(loops as f64 / e),
        _ => None,
    };
    (Some(latency), throughput)
}

// PER-CPU PROXY: SUM OF Avg PER CPU. -a <list> PINS THREAD i TO THE i-TH
// CPU OF THE (ASCENDING) LIST. NO LIST: THREAD INDEX IS THE CPU.
fn per_cpu_avg_sum(lines: &[CyclicLine], cpus: &[u32]) -> BTreeMap<u32, u64> {
    let mut cycles = BTreeMap::new();
    for line in lines {
        let Some(t) = line.thread else { continue };
        let cpu = if cpus.is_empty() {
            t
        } else {
            cpus[t as usize % cpus.len()]
        };
        let slot = cycles.entry(cpu).or_insert(0u64);
        *slot = slot.saturating_add(line.avg_us);
    }
    cycles
}

// DEADLINE STRATEGY (a): EXPLICIT PER-THREAD avg_time TOKENS
pub fn deadline_measured(text: &str) -> Option<(f64, Option<f64>)> {
    let samples: Vec<f64> = DEADLINE_AVG
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .collect();
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().sum();
    let latency = sum / samples.len() as f64;
    let throughput = if sum > 0.0 {
        Some(samples.len() as f64 / (sum / 1e6))
    } else {
        None
    };
    Some((latency, throughput))
}

// DEADLINE STRATEGY (b): ESTIMATE FROM THE CONFIGURED INTERVAL
pub fn deadline_configured(args: &DeadlineArgs) -> (Option<f64>, Option<f64>) {
    if args.interval_us == 0 {
        return (None, None);
    }
    let interval_us = args.interval_us as f64;
    (Some(interval_us), Some(args.threads as f64 / (interval_us / 1e6)))
}

// CASE-INSENSITIVE OCCURRENCES OF "missed" ANYWHERE IN THE LOG
pub fn count_missed(text: &str) -> u64 {
    text.to_lowercase().matches("missed").count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::Policy;

    fn params(policy: Policy) -> RunParameters {
        RunParameters::comparison(policy, 0)
    }

    #[test]
    fn hackbench_time_line() {
        let args = HackbenchArgs { groups: 2, fds: 20, loops: 100 };
        let (lat, thr) = fair_share("Running in process mode with 2 groups\nTime: 0.250\n", &args).unwrap();
        assert_eq!(lat, 0.25 / 4000.0 * 1e6);
        assert_eq!(thr, 4000.0 / 0.25);
    }

    #[test]
    fn hackbench_zero_time_is_absent() {
        let args = HackbenchArgs::default();
        assert_eq!(fair_share("Time: 0.000\n", &args), None);
        assert_eq!(fair_share("no timing here\n", &args), None);
    }

    #[test]
    fn cyclictest_lines_with_thread_ids() {
        let text = "\
# /dev/cpu_dma_latency set to 0us
T: 0 ( 4242) P:80 I:1000 C:   2000 Min:      3 Act:    5 Avg:    6 Max:      21
T: 1 ( 4243) P:80 I:1500 C:   1334 Min:      2 Act:    4 Avg:    9 Max:      30
";
        let lines = parse_cyclictest(text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CyclicLine { thread: Some(0), min_us: 3, avg_us: 6, max_us: 21 });
        assert_eq!(lines[1].thread, Some(1));
        assert_eq!(lines[1].avg_us, 9);
    }

    #[test]
    fn cyclictest_malformed_line_skipped() {
        let text = "T: 0 Min: 3 Avg: x Max: 9\nT: 1 Min: 1 Avg: 4 Max: 8\n";
        let lines = parse_cyclictest(text);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].avg_us, 4);
    }

    #[test]
    fn fixed_priority_needs_elapsed_for_throughput() {
        let lines = parse_cyclictest("Min: 1 Avg: 4 Max: 8\n");
        let args = CyclictestArgs::default();
        let (lat, thr) = fixed_priority(&lines, &args, None);
        assert_eq!(lat, Some(4.0));
        assert_eq!(thr, None);
        let (_, thr) = fixed_priority(&lines, &args, Some(2.0));
        assert_eq!(thr, Some(4000.0 / 2.0));
    }

    #[test]
    fn huge_avg_values_do_not_overflow() {
        let text = "\
T: 0 ( 1) P:0 I:10000 C: 10 Min: 1 Act: 2 Avg: 18446744073709551615 Max: 18446744073709551615
T: 1 ( 2) P:0 I:10000 C: 10 Min: 1 Act: 2 Avg: 18446744073709551615 Max: 18446744073709551615
";
        let lines = parse_cyclictest(text);
        let (lat, _) = fixed_priority(&lines, &CyclictestArgs::default(), Some(1.0));
        assert_eq!(lat, Some(u64::MAX as f64));

        // BOTH THREADS FOLD ONTO ONE CPU: SUM SATURATES
        let cycles = per_cpu_avg_sum(&lines, &[5]);
        assert_eq!(cycles, BTreeMap::from([(5, u64::MAX)]));
    }

    #[test]
    fn overflowing_loop_count_leaves_throughput_absent() {
        let lines = parse_cyclictest("Min: 1 Avg: 4 Max: 8\n");
        let args = CyclictestArgs { threads: 3, loops: u64::MAX, ..CyclictestArgs::default() };
        assert_eq!(fixed_priority(&lines, &args, Some(1.0)), (Some(4.0), None));

        let hb = HackbenchArgs { groups: u32::MAX, fds: u32::MAX, loops: u32::MAX };
        assert_eq!(fair_share("Time: 1.0\n", &hb), None);
    }

    #[test]
    fn per_cpu_proxy_follows_affinity_list() {
        let lines = parse_cyclictest(
            "T: 0 ( 1) Min: 1 Avg: 8 Max: 9\nT: 1 ( 2) Min: 1 Avg: 4 Max: 9\nT: 2 ( 3) Min: 1 Avg: 2 Max: 9\n",
        );
        assert_eq!(per_cpu_avg_sum(&lines, &[2, 5]), BTreeMap::from([(2, 10), (5, 4)]));
        assert_eq!(per_cpu_avg_sum(&lines, &[]), BTreeMap::from([(0, 8), (1, 4), (2, 2)]));
    }

    #[test]
    fn deadline_configured_estimate() {
        let args = DeadlineArgs { threads: 2, interval_us: 2000, bandwidth_pct: 50, runtime_pct: 100 };
        assert_eq!(deadline_configured(&args), (Some(2000.0), Some(2.0 / 0.002)));
        let zero = DeadlineArgs { interval_us: 0, ..args };
        assert_eq!(deadline_configured(&zero), (None, None));
    }

    #[test]
    fn missed_is_case_insensitive() {
        assert_eq!(count_missed("Missed deadline\nMISSED\nall good\nmissed x2 missed"), 4);
        assert_eq!(count_missed("nothing"), 0);
    }

    #[test]
    fn deadline_fallback_is_tagged() {
        let bench = Benchmark::DeadlineTest(DeadlineArgs::default());
        let cap = RawCapture::from_text("deadline_test: 2 threads finished\n");
        let rec = extract(&bench, params(Policy::Deadline), &cap, 4);
        assert_eq!(rec.derivation, Some(Derivation::ConfigDerived));
        assert_eq!(rec.latency_us, Some(2000.0));
        assert_eq!(rec.missed_deadlines, Some(0));
        assert_eq!(rec.bandwidth_percent, Some(50));
    }

    #[test]
    fn deadline_no_estimate_for_failed_run() {
        let bench = Benchmark::DeadlineTest(DeadlineArgs::default());
        let mut cap = RawCapture::from_text("sched_setattr: Operation not permitted\n");
        cap.exit_code = Some(1);
        let rec = extract(&bench, params(Policy::Deadline), &cap, 4);
        assert_eq!(rec.latency_us, None);
        assert_eq!(rec.throughput_ops_sec, None);
        assert_eq!(rec.derivation, None);
    }

    #[test]
    fn stress_takes_harness_cpu_sample() {
        let bench = Benchmark::StressVm(crate::workload::StressVmArgs {
            workers: 2,
            timeout_secs: 1,
            vm_bytes: "1M".to_string(),
            taskset: Some(vec![0, 1]),
        });
        let mut cap = RawCapture::from_text("stress-ng: info: passed: 2\n");
        cap.cpu_busy = BTreeMap::from([(0, 90), (1, 45), (2, 1)]);
        let rec = extract(&bench, params(Policy::FairShare), &cap, 2);
        assert_eq!(rec.latency_us, None);
        assert_eq!(rec.throughput_ops_sec, None);
        assert_eq!(rec.imbalance_ratio(), Some(2.0));
    }
}
