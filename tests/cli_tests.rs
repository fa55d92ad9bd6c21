//! Integration tests for the cagebench CLI.
//!
//! `run` tests replace the analysis tool with a small shell script that picks
//! its exit status from the target address.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cagebench() -> Command {
    Command::cargo_bin("cagebench").unwrap()
}

const DATASET: &str = "target,base,pair,chain,blocknum\n\
                       0xsuccess,0xweth,0xpair1,eth,100\n\
                       0xpanic,0xweth,0xpair2,eth,200\n\
                       0xslow,0xwbnb,0xpair3,bsc,300\n\
                       0xbroken,0xwbnb,0xpair4,bsc,400\n\
                       0xnothing,0xweth,0xpair5,eth,500\n\
                       0xodd,0xweth,0xpair6,eth,600\n";

/// Stand-in for `forge`: `$3` is the target address, the last argument the
/// fork block.
const FAKE_FORGE: &str = r#"#!/bin/sh
case "$3" in
  0xsuccess) echo "fork block ${10}"; echo "Exploit found!"; exit 0 ;;
  0xpanic) echo "thread 'main' panicked" >&2; exit 134 ;;
  0xslow) echo "fuzzing"; sleep 30; exit 0 ;;
  0xbroken) exit 136 ;;
  0xnothing) exit 135 ;;
  0xsleeper) sleep 30 & echo $! > "$SLEEPER_PID_FILE"; wait ;;
  *) exit 7 ;;
esac
"#;

#[cfg(unix)]
fn fake_forge(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("forge");
    fs::write(&path, FAKE_FORGE).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_help_flag() {
    cagebench()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("parse"));
}

#[test]
fn test_zero_time_limit_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("targets.csv");
    fs::write(&dataset, DATASET).unwrap();

    cagebench()
        .args(["run", dataset.to_str().unwrap(), "0"])
        .arg(temp_dir.path().join("results"))
        .assert()
        .failure();
}

#[test]
fn test_dry_run_checks_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("targets.csv");
    fs::write(&dataset, DATASET).unwrap();
    let results = temp_dir.path().join("results");

    cagebench()
        .args(["run", "--dry-run", dataset.to_str().unwrap(), "60"])
        .arg(&results)
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run: 6 targets checked"));

    assert!(!results.exists());
}

#[test]
fn test_bad_dataset_fails() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("targets.csv");
    fs::write(&dataset, "target,base,pair,chain,blocknum\n0xa,0xb,0xc,sol,1\n").unwrap();

    cagebench()
        .args(["run", dataset.to_str().unwrap(), "60"])
        .arg(temp_dir.path().join("results"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown chain"));
}

#[cfg(unix)]
#[test]
fn test_run_classifies_every_target() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("targets.csv");
    fs::write(&dataset, DATASET).unwrap();
    let forge = fake_forge(temp_dir.path());
    let results = temp_dir.path().join("results");

    cagebench()
        .args(["run", dataset.to_str().unwrap(), "2"])
        .arg(&results)
        .arg("--forge-bin")
        .arg(&forge)
        .args(["--workers", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed all tasks"));

    let read = |name: &str| fs::read_to_string(results.join(name)).unwrap();

    let success = read("success_file.result");
    assert!(success.contains("Result for token: 0xsuccess base: 0xweth pair: 0xpair1"));
    assert!(success.contains("fork block 99"));
    assert!(success.contains("Exploit found!"));

    let panic = read("panic_file.result");
    assert!(panic.contains("0xpanic"));
    assert!(panic.contains("thread 'main' panicked"));

    assert_eq!(read("timeout.csv"), "target,base,pair\n0xslow,0xwbnb,0xpair3\n");
    assert_eq!(
        read("invariant_broken_but_not_profitable.csv"),
        "target,base,pair\n0xbroken,0xwbnb,0xpair4\n"
    );
    assert_eq!(read("etc.csv"), "target,base,pair\n0xodd,0xweth,0xpair6\n");

    let everything = [
        "success_file.result",
        "panic_file.result",
        "timeout.csv",
        "invariant_broken_but_not_profitable.csv",
        "etc.csv",
    ]
    .map(read)
    .concat();
    assert!(!everything.contains("0xnothing"));

    // Raw tool logs, including the one cut short by the timeout.
    assert_eq!(read("0xslow.result"), "fuzzing\n");
    assert!(results.join("0xnothing.result").exists());
}

#[cfg(unix)]
#[test]
fn test_rerun_does_not_duplicate_headers() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("targets.csv");
    fs::write(
        &dataset,
        "target,base,pair,chain,blocknum\n0xodd,0xweth,0xpair6,eth,600\n",
    )
    .unwrap();
    let forge = fake_forge(temp_dir.path());
    let results = temp_dir.path().join("results");

    for _ in 0..2 {
        cagebench()
            .args(["run", dataset.to_str().unwrap(), "10"])
            .arg(&results)
            .arg("--forge-bin")
            .arg(&forge)
            .assert()
            .success();
    }

    let etc = fs::read_to_string(results.join("etc.csv")).unwrap();
    assert_eq!(etc, "target,base,pair\n0xodd,0xweth,0xpair6\n0xodd,0xweth,0xpair6\n");
    let timeouts = fs::read_to_string(results.join("timeout.csv")).unwrap();
    assert_eq!(timeouts, "target,base,pair\n");
}

#[test]
fn test_missing_tool_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("targets.csv");
    fs::write(&dataset, DATASET).unwrap();

    cagebench()
        .args(["run", dataset.to_str().unwrap(), "5"])
        .arg(temp_dir.path().join("results"))
        .args(["--timeout-bin", "/nonexistent/timeout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to launch"));
}

#[test]
fn test_parse_single_ours_log() {
    let temp_dir = TempDir::new().unwrap();
    let log = temp_dir.path().join("0xabc.result");
    fs::write(
        &log,
        "time elapsed: Duration { secs: 45, nanos: 500000000 }\nExploit found\n",
    )
    .unwrap();

    cagebench()
        .args(["parse", "ours", log.to_str().unwrap()])
        .assert()
        .success()
        .stdout("detected: true, seconds_to_bug: 45.5\n");
}

#[test]
fn test_parse_malformed_log_is_a_warning() {
    let temp_dir = TempDir::new().unwrap();
    let log = temp_dir.path().join("0xabc.result");
    fs::write(&log, "nothing to see\n").unwrap();

    cagebench()
        .args(["parse", "ityfuzz", log.to_str().unwrap()])
        .assert()
        .success()
        .stdout("detected: false, execution_time: unresolved\n");
}

#[test]
fn test_parse_directory() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    fs::write(dir.join("0xB.result"), "run time: 0h-2m-0s, x\nFound vulnerabilities!\n").unwrap();
    fs::write(dir.join("0xa.result"), "run time: 0h-20m-30s, x\n").unwrap();
    fs::write(dir.join("0xc.result"), "garbage\n").unwrap();
    fs::write(dir.join("success_file.result"), "Found vulnerabilities!\n").unwrap();

    let output = cagebench()
        .args(["parse", "ityfuzz", dir.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("0xa.result, false, 1230"));
    assert!(lines[1].ends_with("0xB.result, true, 120"));
    assert!(lines[2].starts_with("parsed: 2, malformed: 1, failed: 0, detected: 1, exhausted: 1"));
    assert!(!stdout.contains("success_file"));
}

#[test]
fn test_parse_missing_path_fails() {
    cagebench()
        .args(["parse", "midas", "/nonexistent/results"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_interrupt_kills_running_tools() {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::time::{Duration, Instant};

    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("targets.csv");
    fs::write(
        &dataset,
        "target,base,pair,chain,blocknum\n0xsleeper,0xweth,0xpair,eth,100\n",
    )
    .unwrap();
    let forge = fake_forge(temp_dir.path());
    let pid_file = temp_dir.path().join("sleeper.pid");

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("cagebench"))
        .args(["run", dataset.to_str().unwrap(), "60"])
        .arg(temp_dir.path().join("results"))
        .arg("--forge-bin")
        .arg(&forge)
        .env("SLEEPER_PID_FILE", &pid_file)
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let sleeper: u32 = loop {
        if let Some(pid) = fs::read_to_string(&pid_file)
            .ok()
            .and_then(|text| text.trim().parse().ok())
        {
            break pid;
        }
        assert!(Instant::now() < deadline, "tool never started");
        std::thread::sleep(Duration::from_millis(50));
    };

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    let status = child.wait().unwrap();
    assert!(!status.success());

    let stat = format!("/proc/{sleeper}/stat");
    let deadline = Instant::now() + Duration::from_secs(5);
    while fs::read_to_string(&stat).is_ok_and(|s| {
        s.rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z" && state != "X")
    }) {
        assert!(Instant::now() < deadline, "tool {sleeper} outlived the interrupt");
        std::thread::sleep(Duration::from_millis(50));
    }
}
