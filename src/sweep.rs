// SCHEDBENCH SWEEP ORCHESTRATOR
// ENUMERATE POINTS -> (APPLY TUNABLES) -> RUN -> EXTRACT -> APPEND
//
// STRICTLY SEQUENTIAL: CONCURRENT RUNS WOULD CONTEND FOR THE CPUs UNDER TEST.
// ROWS ARE APPENDED IN ENUMERATION ORDER. NO DEDUP, NO AVERAGING.
// A FAILED POINT STILL PRODUCES A (SPARSE) ROW. NOTHING HERE IS FATAL.
// THE STOP FLAG IS CHECKED BETWEEN POINTS, NEVER DURING A RUN.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::extract::extract;
use crate::invoke::{Launcher, Runner};
use crate::record::MetricsRecord;
use crate::tunables::{TunableSet, TunableSink};
use crate::workload::{
    join_cpu_list, Benchmark, CyclictestArgs, DeadlineArgs, Framing, HackbenchArgs, Policy,
    RunParameters, Setting, StressVmArgs, WorkloadKind, DEFAULT_STRESS_SECS,
    DEFAULT_STRESS_VM_BYTES, DEFAULT_SWEEP_INTERVAL_US, DEFAULT_SWEEP_LOOPS,
};

#[derive(Clone, Debug)]
pub struct CompareConfig {
    pub hackbench: HackbenchArgs,
    pub cyclictest: CyclictestArgs,
    pub deadline: DeadlineArgs,
    pub runs: u32,
    pub cpu_count: u32,
}

impl CompareConfig {
    // EACH POLICY HAS ONE FIXED INVOCATION
    pub fn benchmark(&self, policy: Policy) -> Benchmark {
        match policy {
            Policy::FairShare => Benchmark::Hackbench(self.hackbench.clone()),
            Policy::FixedPriority => Benchmark::Cyclictest(self.cyclictest.clone()),
            Policy::Deadline => Benchmark::DeadlineTest(self.deadline.clone()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub tunables: TunableSet,
    pub cpus: Vec<u32>,
    pub interval_us: u64,
    pub loops: u64,
    pub stress_secs: u64,
    pub vm_bytes: String,
    pub runs: u32,
    pub cpu_count: u32,
}

impl SweepConfig {
    pub fn new(cpus: Vec<u32>) -> Self {
        let cpu_count = cpus.len().max(1) as u32;
        Self {
            tunables: TunableSet::default(),
            cpus,
            interval_us: DEFAULT_SWEEP_INTERVAL_US,
            loops: DEFAULT_SWEEP_LOOPS,
            stress_secs: DEFAULT_STRESS_SECS,
            vm_bytes: DEFAULT_STRESS_VM_BYTES.to_string(),
            runs: 1,
            cpu_count,
        }
    }

    // ONE THREAD PER CPU, PINNED, SCHED_OTHER (PRIORITY 0)
    pub fn benchmark(&self, workload: WorkloadKind) -> Benchmark {
        let n = self.cpus.len() as u32;
        match workload {
            WorkloadKind::CpuBound => Benchmark::Cyclictest(CyclictestArgs {
                threads: n,
                priority: 0,
                interval_us: self.interval_us,
                loops: self.loops,
                affinity: Some(join_cpu_list(&self.cpus)),
                mlockall: true,
            }),
            WorkloadKind::MemoryBound => Benchmark::StressVm(StressVmArgs {
                workers: n,
                timeout_secs: self.stress_secs,
                vm_bytes: self.vm_bytes.clone(),
                taskset: Some(self.cpus.clone()),
            }),
        }
    }

    // TUNABLES x SETTINGS x WORKLOADS x RUNS, IN THAT NESTING ORDER
    pub fn points(&self) -> Vec<RunParameters> {
        let mut points = Vec::new();
        for (tunable, default) in self.tunables.iter() {
            for setting in Setting::ALL {
                for workload in WorkloadKind::ALL {
                    for repetition in 0..self.runs {
                        points.push(RunParameters {
                            policy: Policy::FairShare,
                            framing: Framing::TunableSweep {
                                workload,
                                tunable: tunable.to_string(),
                                setting,
                                value: setting.value(default),
                            },
                            repetition,
                        });
                    }
                }
            }
        }
        points
    }
}

pub struct Orchestrator<'a> {
    launcher: &'a Launcher,
    runner: &'a mut dyn Runner,
    stop: &'a AtomicBool,
    verbose: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        launcher: &'a Launcher,
        runner: &'a mut dyn Runner,
        stop: &'a AtomicBool,
        verbose: bool,
    ) -> Self {
        Self { launcher, runner, stop, verbose }
    }

    fn stopped(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            println!("INTERRUPTED -- STOPPING AFTER LAST COMPLETED POINT");
            return true;
        }
        false
    }

    // RUN ONE POINT AND REDUCE IT TO A RECORD. ALWAYS RETURNS A RECORD.
    fn run_point(
        &mut self,
        index: usize,
        bench: &Benchmark,
        params: RunParameters,
        cpu_count: u32,
    ) -> MetricsRecord {
        let label = format!("{:03}_{}", index, params.log_label());
        let inv = self.launcher.invocation(label, bench);
        let capture = self.runner.run(&inv);
        let rec = extract(bench, params, &capture, cpu_count);
        if rec.is_empty() {
            eprintln!("WARNING: NO METRICS FROM {} (RECORDED AS EMPTY ROW)", inv.label);
        }
        rec
    }

    pub fn compare_policies(&mut self, cfg: &CompareConfig) -> Vec<MetricsRecord> {
        let mut records = Vec::with_capacity(Policy::ALL.len() * cfg.runs as usize);
        for policy in Policy::ALL {
            let bench = cfg.benchmark(policy);
            for repetition in 0..cfg.runs {
                if self.stopped() {
                    return records;
                }
                println!("\n=== RUNNING {} ({}) ===", policy, bench.tool_name());
                let params = RunParameters::comparison(policy, repetition);
                let index = records.len();
                records.push(self.run_point(index, &bench, params, cfg.cpu_count));
            }
        }
        records
    }

    pub fn sweep_tunables(
        &mut self,
        cfg: &SweepConfig,
        sink: &mut dyn TunableSink,
    ) -> Vec<MetricsRecord> {
        let points = cfg.points();
        let mut records = Vec::with_capacity(points.len());
        let mut current_tunable = String::new();

        for params in points {
            if self.stopped() {
                break;
            }
            let Framing::TunableSweep { workload, tunable, setting, value } = &params.framing
            else {
                continue;
            };

            if *tunable != current_tunable {
                let default = cfg.tunables.defaults().get(tunable).unwrap_or(*value);
                println!("\n##### TESTING TUNABLE {} (DEFAULT={}) #####", tunable, default);
                current_tunable = tunable.clone();
            }
            println!(
                "\n[INFO] WORKLOAD={} TUNABLE={} SETTING={} VALUE={} RUN={}",
                workload.label(), tunable, setting.label(), value, params.repetition
            );

            // RESTORE EVERY DEFAULT, THEN APPLY THE ONE UNDER TEST, AS ONE STATE
            let state = cfg.tunables.defaults().with(tunable, *value);
            if self.verbose {
                for (name, v) in state.iter() {
                    println!("  STATE {} = {}", name, v);
                }
            }
            if let Err(e) = sink.apply(&state) {
                eprintln!("WARNING: {:#}", e);
            }

            let bench = cfg.benchmark(*workload);
            let index = records.len();
            records.push(self.run_point(index, &bench, params, cfg.cpu_count));
        }
        records
    }
}
