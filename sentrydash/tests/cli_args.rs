//! CLI arg parsing tests for sentrydash, run against the built binary.
use assert_cmd::Command;

fn run(args: &[&str]) -> (bool, Option<i32>, String) {
    let td = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("sentrydash")
        .unwrap()
        .args(args)
        // keep any real profiles out of the way
        .env("XDG_CONFIG_HOME", td.path())
        .output()
        .expect("run sentrydash");
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    (out.status.success(), out.status.code(), text)
}

#[test]
fn test_help_exits_zero() {
    Command::cargo_bin("sentrydash")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn test_help_mentions_short_and_long_flags() {
    let (_, _, text) = run(&["--help"]);
    for flag in ["--tls-ca", "-t", "--profile", "-P", "--headless", "--hours", "-H", "--dry-run"] {
        assert!(text.contains(flag), "help text missing {flag}\n{text}");
    }
}

#[test]
fn test_flags_accepted_before_help() {
    for args in [
        ["--tls-ca", "/tmp/cert.pem", "--help"],
        ["-t", "/tmp/cert.pem", "--help"],
        ["--profile", "dev", "--help"],
        ["--hours", "12", "--help"],
    ] {
        let (ok, _, text) = run(&args);
        assert!(ok, "{args:?} did not succeed");
        assert!(text.contains("Usage:"));
    }
}

#[test]
fn test_dry_run_prints_resolved_connection() {
    let (ok, _, text) = run(&["-H", "6", "--dry-run", "http://127.0.0.1:5000"]);
    assert!(ok);
    assert!(text.contains("url=http://127.0.0.1:5000"), "{text}");
    assert!(text.contains("hours=6"), "{text}");
}

#[test]
fn test_dry_run_defaults_to_24_hours() {
    let (_, _, text) = run(&["--dry-run", "http://127.0.0.1:5000"]);
    assert!(text.contains("hours=24"), "{text}");
}

#[test]
fn test_invalid_hours_exit_with_usage_error() {
    let (ok, code, text) = run(&["--hours", "7", "http://127.0.0.1:5000"]);
    assert!(!ok);
    assert_eq!(code, Some(2));
    assert!(text.contains("6, 12, 24"), "{text}");
}

#[test]
fn test_no_url_and_no_profiles_exits_cleanly() {
    let (ok, _, text) = run(&["--dry-run"]);
    assert!(ok);
    assert!(text.contains("No URL provided"), "{text}");
}
