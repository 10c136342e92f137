use std::io::Read;
use std::path::Path;
use std::process::Command;

use anyhow::Result;

use super::ToolArgs;

// DEBUGFS SCHED TUNABLES + perf stat
const KERNEL_OPTIONS: [&str; 3] = ["CONFIG_SCHED_DEBUG", "CONFIG_DEBUG_FS", "CONFIG_PERF_EVENTS"];

fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// MISSING OR UNREADABLE /proc/config.gz IS SKIPPED, NOT A FAILURE
fn check_kernel_config() -> bool {
    let file = match std::fs::File::open("/proc/config.gz") {
        Ok(f) => f,
        Err(_) => {
            println!("  /proc/config.gz         NOT FOUND (SKIPPED)");
            return true;
        }
    };
    let mut decoder = flate2::read::GzDecoder::new(file);
    let mut config = String::new();
    if decoder.read_to_string(&mut config).is_err() {
        println!("  /proc/config.gz         UNREADABLE (SKIPPED)");
        return true;
    }
    let mut ok = true;
    for opt in KERNEL_OPTIONS {
        if kernel_option_enabled(&config, opt) {
            println!("  {:<24}OK", opt);
        } else {
            println!("  {:<24}NOT FOUND", opt);
            ok = false;
        }
    }
    ok
}

fn kernel_option_enabled(config: &str, opt: &str) -> bool {
    config.lines().any(|line| {
        line.strip_prefix(opt)
            .is_some_and(|rest| rest == "=y" || rest == "=m")
    })
}

pub fn run_check(tools: &ToolArgs, tunable_dir: &Path) -> Result<()> {
    println!("SCHEDBENCH DEPENDENCY CHECK");
    println!();

    let mut ok = true;
    let required = [
        tools.perf.as_str(),
        tools.hackbench_bin.as_str(),
        tools.cyclictest_bin.as_str(),
        tools.deadline_bin.as_str(),
        tools.stress_bin.as_str(),
        "sudo",
    ];
    for tool in &required {
        if check_tool(tool) {
            println!("  {:<24}OK", tool);
        } else {
            println!("  {:<24}MISSING", tool);
            ok = false;
        }
    }
    println!();

    println!("KERNEL CONFIG:");
    if !check_kernel_config() {
        ok = false;
    }
    println!();

    if tunable_dir.is_dir() {
        println!("  {:<24}PRESENT ({})", "tunables", tunable_dir.display());
    } else {
        println!(
            "  {:<24}NOT FOUND ({}) -- mount debugfs or use --dry-run",
            "tunables",
            tunable_dir.display()
        );
        ok = false;
    }
    println!();

    if ok {
        println!("ALL CHECKS PASSED");
    } else {
        println!("SOME CHECKS FAILED");
        if [&tools.hackbench_bin, &tools.cyclictest_bin, &tools.deadline_bin]
            .iter()
            .any(|t| !check_tool(t))
        {
            println!("  Install rt-tests: https://git.kernel.org/pub/scm/utils/rt-tests/rt-tests.git");
        }
        std::process::exit(1);
    }

    Ok(())
}
