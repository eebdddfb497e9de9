//! CLI smoke tests against the demo modules.

use std::path::PathBuf;
use std::process::Command;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

fn pcc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pcc"))
}

#[test]
fn instrument_then_run() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested.instrumented.pir");

    let status = pcc()
        .args(["instrument", "-o"])
        .arg(&out)
        .arg(demo("nested.pir"))
        .status()
        .unwrap();
    assert!(status.success());

    let output = pcc()
        .arg("run")
        .arg(&out)
        .args(["--entry", "main"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("call @work"), "missing trace: {stdout}");
    assert!(stdout.contains("context at exit"), "missing summary: {stdout}");
}

#[test]
fn run_can_instrument_on_the_fly() {
    let output = pcc()
        .arg("run")
        .arg(demo("external.pir"))
        .arg("--instrument")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("call @host_hook"), "missing trace: {stdout}");
}

#[test]
fn dump_is_stable() {
    let first = pcc().arg("dump").arg(demo("nested.pir")).output().unwrap();
    assert!(first.status.success());

    let dir = tempfile::tempdir().unwrap();
    let normalized = dir.path().join("normalized.pir");
    std::fs::write(&normalized, &first.stdout).unwrap();

    let second = pcc().arg("dump").arg(&normalized).output().unwrap();
    assert!(second.status.success());
    assert_eq!(first.stdout, second.stdout);
}
