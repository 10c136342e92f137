// SCHEDBENCH EXTRACTION TESTS
// PERF COUNTERS, PER-POLICY GRAMMARS, SPARSITY, PURITY
//
// ALL TESTS USE PURE-RUST TYPES FROM schedbench::{extract, record, workload}.
// NO PROCESSES, NO ROOT. RUN OFFLINE.

use std::collections::BTreeMap;

use schedbench::extract::{count_missed, extract, parse_cyclictest};
use schedbench::record::{Derivation, MetricsRecord, RawCapture};
use schedbench::workload::{
    Benchmark, CyclictestArgs, DeadlineArgs, Framing, HackbenchArgs, Policy, RunParameters,
    Setting, WorkloadKind,
};

fn comparison(bench: &Benchmark, text: &str, cpus: u32) -> MetricsRecord {
    let policy = match bench {
        Benchmark::Hackbench(_) | Benchmark::StressVm(_) => Policy::FairShare,
        Benchmark::Cyclictest(_) => Policy::FixedPriority,
        Benchmark::DeadlineTest(_) => Policy::Deadline,
    };
    extract(bench, RunParameters::comparison(policy, 0), &RawCapture::from_text(text), cpus)
}

fn hackbench(groups: u32, fds: u32, loops: u32) -> Benchmark {
    Benchmark::Hackbench(HackbenchArgs { groups, fds, loops })
}

// === PERF COUNTERS ===

#[test]
fn perf_scenario_end_to_end() {
    let text = "task-clock 5000000\n2000 context-switches\n1.0 seconds time elapsed\n";
    let rec = comparison(&hackbench(2, 20, 100), text, 4);
    assert_eq!(rec.context_switches, Some(2000));
    assert_eq!(rec.cpu_util_percent, Some(5000000.0 / (1.0 * 1000.0 * 4.0) * 100.0));
    assert_eq!(rec.cpu_util_percent, Some(125000.0));
    assert_eq!(rec.cpu_migrations, None);
    // NO "Time:" LINE: FAIR-SHARE METRICS STAY ABSENT
    assert_eq!(rec.latency_us, None);
    assert_eq!(rec.throughput_ops_sec, None);
}

#[test]
fn perf_util_formula_over_grid() {
    for (t, e, c) in [(1234.5, 0.75, 1u32), (98765.0, 12.5, 8), (16012.45, 4.005123456, 4)] {
        let text = format!("{} msec task-clock\n{} seconds time elapsed\n", t, e);
        let rec = comparison(&hackbench(1, 1, 1), &text, c);
        assert_eq!(rec.cpu_util_percent, Some(t / (e * 1000.0 * c as f64) * 100.0));
    }
}

#[test]
fn perf_thousands_separators() {
    let text = "   1,234,567      context-switches\n      12,345      cpu-migrations\n";
    let rec = comparison(&hackbench(1, 1, 1), text, 4);
    assert_eq!(rec.context_switches, Some(1_234_567));
    assert_eq!(rec.cpu_migrations, Some(12_345));
    assert_eq!(rec.cpu_util_percent, None);
}

// === FAIR-SHARE ===

#[test]
fn fair_share_formulas() {
    for (g, p, l, total) in [(2u32, 20u32, 100u32, 0.25f64), (4, 10, 2000, 3.125), (1, 1, 1, 0.001)] {
        let text = format!("Running in process mode with {} groups using {} file descriptors each\nTime: {}\n", g, p * 2, total);
        let rec = comparison(&hackbench(g, p, l), &text, 4);
        let messages = (g * p * l) as f64;
        assert_eq!(rec.throughput_ops_sec, Some(messages / total));
        assert_eq!(rec.latency_us, Some(total / messages * 1e6));
        assert_eq!(rec.derivation, Some(Derivation::Measured));
    }
}

#[test]
fn fair_share_message_count_tracks_invocation() {
    let text = "Time: 2.0\n";
    let small = comparison(&hackbench(2, 20, 100), text, 4);
    let large = comparison(&hackbench(2, 20, 2000), text, 4);
    assert_eq!(small.throughput_ops_sec, Some(2000.0));
    assert_eq!(large.throughput_ops_sec, Some(40000.0));
}

// === FIXED-PRIORITY ===

const CYCLICTEST_OUT: &str = "\
# /dev/cpu_dma_latency set to 0us
policy: fifo: loadavg: 0.52 0.31 0.20 1/412 9812

T: 0 ( 9811) P:80 I:1000 C:   2000 Min:      2 Act:    3 Avg:    4 Max:      17
T: 1 ( 9812) P:79 I:1500 C:   1334 Min:      3 Act:    6 Avg:    7 Max:      29
    2.004113209 seconds time elapsed
";

#[test]
fn fixed_priority_mean_of_all_avgs() {
    let bench = Benchmark::Cyclictest(CyclictestArgs::default());
    let rec = comparison(&bench, CYCLICTEST_OUT, 4);
    assert_eq!(rec.latency_us, Some((4.0 + 7.0) / 2.0));
    assert_eq!(rec.throughput_ops_sec, Some((2000.0 * 2.0) / 2.004113209));
    // COMPARISON FRAMING: NO PER-CPU PROXY
    assert!(rec.per_cpu_cycles.is_empty());
}

#[test]
fn fixed_priority_n_lines() {
    let avgs = [5u64, 9, 11, 2, 40];
    let text: String = avgs
        .iter()
        .enumerate()
        .map(|(i, a)| format!("T: {} ( 100) P:80 I:1000 C: 10 Min: 1 Act: 2 Avg: {} Max: 50\n", i, a))
        .collect();
    assert_eq!(parse_cyclictest(&text).len(), avgs.len());
    let rec = comparison(&Benchmark::Cyclictest(CyclictestArgs::default()), &text, 4);
    let mean = avgs.iter().sum::<u64>() as f64 / avgs.len() as f64;
    assert_eq!(rec.latency_us, Some(mean));
}

#[test]
fn fixed_priority_absent_without_triples() {
    let rec = comparison(&Benchmark::Cyclictest(CyclictestArgs::default()), "cyclictest: permission denied\n", 4);
    assert_eq!(rec.latency_us, None);
    assert_eq!(rec.throughput_ops_sec, None);
    assert_eq!(rec.derivation, None);
}

#[test]
fn fixed_priority_falls_back_to_harness_clock() {
    let bench = Benchmark::Cyclictest(CyclictestArgs { threads: 1, loops: 500, ..CyclictestArgs::default() });
    let mut cap = RawCapture::from_text("T: 0 ( 1) P:80 I:1000 C: 500 Min: 1 Act: 1 Avg: 3 Max: 9\n");
    cap.elapsed_secs = Some(0.5);
    let rec = extract(&bench, RunParameters::comparison(Policy::FixedPriority, 0), &cap, 4);
    assert_eq!(rec.throughput_ops_sec, Some(1000.0));
}

#[test]
fn sweep_cyclictest_fills_per_cpu_proxy() {
    let params = RunParameters {
        policy: Policy::FairShare,
        framing: Framing::TunableSweep {
            workload: WorkloadKind::CpuBound,
            tunable: "base_slice_ns".to_string(),
            setting: Setting::Default,
            value: 3_000_000,
        },
        repetition: 0,
    };
    let bench = Benchmark::Cyclictest(CyclictestArgs::default());
    let rec = extract(&bench, params, &RawCapture::from_text(CYCLICTEST_OUT), 4);
    assert_eq!(rec.per_cpu_cycles, BTreeMap::from([(0, 4), (1, 7)]));
    assert_eq!(rec.imbalance_ratio(), Some(7.0 / 4.0));
}

// === DEADLINE ===

#[test]
fn deadline_scenario_end_to_end() {
    let text = "\
thread 0: avg_time: 10.0us
thread 1: avg_time: 20.0us
thread 2: avg_time: 30.0us
Missed deadline on thread 2
";
    let rec = comparison(&Benchmark::DeadlineTest(DeadlineArgs::default()), text, 4);
    assert_eq!(rec.latency_us, Some(20.0));
    assert_eq!(rec.missed_deadlines, Some(1));
    assert_eq!(rec.throughput_ops_sec, Some(3.0 / (60.0 / 1e6)));
    assert_eq!(rec.bandwidth_percent, Some(50));
    assert_eq!(rec.derivation, Some(Derivation::Measured));
}

#[test]
fn deadline_bandwidth_from_invocation() {
    let bench = Benchmark::DeadlineTest(DeadlineArgs { bandwidth_pct: 35, ..DeadlineArgs::default() });
    let rec = comparison(&bench, "avg_time: 5.0us\n", 4);
    assert_eq!(rec.bandwidth_percent, Some(35));
    assert_eq!(rec.missed_deadlines, Some(0));
}

#[test]
fn deadline_fallback_never_mixes() {
    let bench = Benchmark::DeadlineTest(DeadlineArgs { threads: 4, interval_us: 500, ..DeadlineArgs::default() });
    let rec = comparison(&bench, "runtime done\nmissed 3 of 400\n", 4);
    assert_eq!(rec.derivation, Some(Derivation::ConfigDerived));
    assert_eq!(rec.latency_us, Some(500.0));
    assert_eq!(rec.throughput_ops_sec, Some(4.0 / (500.0 / 1e6)));
    assert_eq!(rec.missed_deadlines, Some(1));
}

#[test]
fn deadline_empty_output_is_sparse() {
    let bench = Benchmark::DeadlineTest(DeadlineArgs::default());
    let rec = extract(
        &bench,
        RunParameters::comparison(Policy::Deadline, 0),
        &RawCapture::failed(std::time::SystemTime::now()),
        4,
    );
    assert_eq!(rec.latency_us, None);
    assert_eq!(rec.throughput_ops_sec, None);
    assert_eq!(rec.missed_deadlines, None);
    // CONFIGURED RESERVATION IS KNOWN WITHOUT ANY OUTPUT
    assert_eq!(rec.bandwidth_percent, Some(50));
}

#[test]
fn missed_counts_substrings() {
    assert_eq!(count_missed("MISSED\nMissed\nmissed"), 3);
    assert_eq!(count_missed("dismissed"), 1);
}

// === ROBUSTNESS / PURITY ===

#[test]
fn garbage_yields_sparse_record() {
    let text = "\u{0}\u{1}binary junk\nTime: abc\nMin: x Avg: y Max: z\navg_time: us\n -- context-switches\n";
    let hb = comparison(&hackbench(2, 20, 100), text, 4);
    assert!(hb.is_empty());
    let rt = comparison(&Benchmark::Cyclictest(CyclictestArgs::default()), text, 4);
    assert!(rt.is_empty());
}

#[test]
fn extraction_is_idempotent() {
    let text = format!("{}Time: 0.5\n", CYCLICTEST_OUT);
    for bench in [
        hackbench(2, 20, 100),
        Benchmark::Cyclictest(CyclictestArgs::default()),
        Benchmark::DeadlineTest(DeadlineArgs::default()),
    ] {
        let a = comparison(&bench, &text, 4);
        let b = comparison(&bench, &text, 4);
        assert_eq!(a, b);
        assert_eq!(
            a.latency_us.map(f64::to_bits),
            b.latency_us.map(f64::to_bits)
        );
    }
}
