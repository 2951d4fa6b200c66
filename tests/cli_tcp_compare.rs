use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "tcpcmp-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ))
}

fn tcp_compare(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tcp_compare"))
        .args(args)
        .arg("--results-dir")
        .arg(root)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run tcp_compare")
}

#[test]
fn tcp_compare_writes_results_under_scenario_variant_and_run() {
    let root = unique_temp_dir("cli-ok");
    let output = tcp_compare(
        &root,
        &["--scenario", "S1", "--tcp", "TcpNewReno", "--time", "0.5", "--run", "3"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("done @"), "stdout: {stdout}");
    assert!(stdout.contains("scenario=S1 tcp=TcpNewReno run=3"), "stdout: {stdout}");

    let dir = root.join("S1").join("TcpNewReno").join("run-3");
    assert!(dir.join("cwnd.csv").exists());
    assert!(dir.join("flowmon.xml").exists());
    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("run.json")).expect("read run.json"))
            .expect("parse run.json");
    assert_eq!(manifest["run"], 3);
    assert_eq!(manifest["duration_s"], 0.5);
    assert_eq!(manifest["warmup_s"], 20.0);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn tcp_compare_can_skip_the_flow_monitor() {
    let root = unique_temp_dir("cli-nofm");
    let output = tcp_compare(
        &root,
        &["--scenario", "S3", "--time", "0.5", "--loss", "0.01", "--flowMonitor", "false"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let dir = root.join("S3").join("TcpCubic").join("run-1");
    assert!(dir.join("cwnd.csv").exists());
    assert!(!dir.join("flowmon.xml").exists());
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn tcp_compare_rejects_unknown_variant() {
    let root = unique_temp_dir("cli-badtcp");
    let output = tcp_compare(&root, &["--tcp", "TcpBogus", "--time", "0.5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TcpBogus"), "stderr: {stderr}");
    assert!(!root.exists());
}

#[test]
fn tcp_compare_rejects_unsupported_scenario() {
    let root = unique_temp_dir("cli-s9");
    let output = tcp_compare(&root, &["--scenario", "S9", "--time", "0.5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("S9"), "stderr: {stderr}");
    assert!(!root.exists());
}
