use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

// Fast, noiseless simulator; `simulator` lines go into [simulator], `extra` is appended
fn write_config(dir: &TempDir, simulator: &str, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[pins]
data = 5
clock = 6

[hx711]
ready_timeout_ms = 200
poll_interval_us = 200

[sampling]
inter_read_delay_ms = 1
average_window = 3
tare_window = 3
calibrate_window = 3
read_interval_ms = 5

[diagnostics]
attempts = 2
settle_ms = 1
format_samples = 3

[simulator]
noise_counts = 0
conversion_ms = 10
{simulator}

{extra}
"#
    );
    let path = dir.path().join("scale.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn scale(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("scale").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

const RESTORED: &str = "[calibration]\noffset = 8000.0\nscale = 420.0\n";

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["read", "--count", "3"], 0, "0x001F40", "stdout")]
#[case(&["read", "--count", "1"], 0, "00000000 00011111 01000000", "stdout")]
#[case(&["self-check"], 0, "self-check ok: DOUT=GPIO5 SCK=GPIO6", "stdout")]
#[case(&["weigh"], 0, "Tare offset: 8000.0 counts", "stdout")]
#[case(&["formats"], 0, "<- selected", "stdout")]
#[case(&["read", "--follow", "--strict"], 2, "cannot be used with", "stderr")]
#[case(&["--data-pin", "6", "read"], 1, "Configuration is invalid", "stderr")]
#[case(&["--gain", "100", "read"], 1, "hx711.gain must be one of", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "", "");

    let assert = scale(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn read_prints_one_json_object_per_exchange() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "", "");
    let out = scale(&cfg)
        .args(["--json", "read", "--count", "2"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let lines: Vec<serde_json::Value> = String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).expect("stdout line is JSON"))
        .collect();
    assert_eq!(lines.len(), 3);
    for row in &lines[..2] {
        assert_eq!(row["value"], 8000);
        assert_eq!(row["hex"], "0x001F40");
        assert_eq!(row["status"], "ok");
    }
    assert_eq!(lines[2]["summary"]["valid"], 2);
    assert_eq!(lines[2]["summary"]["stability"], "stable");
}

#[test]
fn new_gain_applies_from_the_second_read() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "", "");
    scale(&cfg)
        .args(["--gain", "64", "read", "--count", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8000").and(predicate::str::contains("4000")));
}

#[rstest]
#[case("load_grams = 100.0", "Weight: 100.0 g")]
#[case("load_grams = 5000.0", "Weight: 5.000 kg")]
fn restored_calibration_weighs_without_tare(#[case] sim: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, sim, RESTORED);
    scale(&cfg)
        .args(["weigh", "--skip-tare"])
        .assert()
        .success()
        .stdout(predicate::str::contains(needle));
}

#[test]
fn weigh_json_reports_grams() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "load_grams = 10.0", RESTORED);
    let out = scale(&cfg)
        .args(["--json", "weigh", "--skip-tare", "--window", "2"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8(out.stdout).unwrap().trim()).unwrap();
    assert_eq!(v["grams"], 10.0);
    assert_eq!(v["samples"], 2);
}

#[test]
fn calibrating_against_an_unchanged_load_fails_with_hint() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "", "");
    scale(&cfg)
        .args(["weigh", "--known-grams", "100", "--place-delay-ms", "0"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("did not change"));
}

#[test]
fn diagnose_finds_swapped_wiring() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "fault = \"swapped-wiring\"", "");
    scale(&cfg)
        .arg("diagnose")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("data ready:      never")
                .and(predicate::str::contains("Working wiring: DOUT=GPIO6 SCK=GPIO5")),
        );
}

#[test]
fn diagnose_reports_dead_device() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "fault = \"unpowered\"", "");
    scale(&cfg)
        .args(["diagnose", "--skip-line-checks"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("check VCC/GND first"))
        .stderr(predicate::str::contains("No candidate pin assignment"));
}

#[test]
fn timeouts_show_up_in_the_table_and_exit_code() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "fault = \"unpowered\"", "");
    scale(&cfg)
        .args(["read", "--count", "2"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("timeout"))
        .stderr(predicate::str::contains("never signalled data-ready"));
}

#[test]
fn strict_self_check_rejects_shorted_data_line() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "fault = \"data-shorted\"", "");
    scale(&cfg)
        .arg("self-check")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Every bit read back LOW"));
}

#[test]
fn formats_gives_no_verdict_for_a_shorted_data_line() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "fault = \"data-shorted\"", "");
    scale(&cfg)
        .arg("formats")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("check wiring")
                .and(predicate::str::contains("<- selected").not())
                .and(predicate::str::contains("Use in [hx711]").not()),
        );
}

#[test]
fn json_mode_prints_structured_errors() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "fault = \"unpowered\"", "");
    let out = scale(&cfg)
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "Timeout");
    assert_eq!(v["exit_code"], 3);
}

#[test]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[pins]\ndata = 7\nclock = 7\n").unwrap();
    scale(&path)
        .arg("read")
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("Configuration is invalid")
                .and(predicate::str::contains("must differ")),
        );
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempdir().unwrap();
    scale(&dir.path().join("nope.toml"))
        .arg("read")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be read"));
}

#[cfg(not(feature = "hardware"))]
#[test]
fn gpio_backend_needs_the_hardware_feature() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "", "");
    scale(&cfg)
        .args(["--backend", "gpio", "self-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not compiled in"));
}

#[test]
fn log_file_receives_json_lines() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("scale.log");
    let logging = format!("[logging]\nfile = {:?}\nlevel = \"debug\"\n", log.display().to_string());
    let cfg = write_config(&dir, "", &logging);
    scale(&cfg).args(["read", "--count", "1"]).assert().success();
    let text = fs::read_to_string(&log).unwrap();
    let first = text.lines().next().expect("log has lines");
    let v: serde_json::Value = serde_json::from_str(first).unwrap();
    assert!(v["level"].is_string());
}
