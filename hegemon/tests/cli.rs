use assert_cmd::Command;
use predicates::prelude::*;

/// Run the binary with the advisory endpoint disabled so tests never touch
/// the network.
fn hegemon() -> Command {
    let mut cmd = Command::cargo_bin("hegemon").expect("binary builds");
    cmd.env_remove("HEGEMON_ADVISORY_ADDR");
    cmd.env_remove("HEGEMON_ADVISORY_KEY");
    cmd
}

#[test]
fn test_help_flag() {
    hegemon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--turns"));
}

#[test]
fn test_short_run_prints_standings_and_checksum() {
    hegemon()
        .args(["--turns", "3", "--log-level", "warn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Standings after 3 turns:"))
        .stdout(predicate::str::contains("Final checksum:"));
}

#[test]
fn test_same_seed_same_checksum() {
    let run = |seed: &str| {
        let output = hegemon()
            .args(["--turns", "5", "--seed", seed, "--log-level", "error"])
            .output()
            .expect("failed to execute");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        stdout
            .lines()
            .find(|l| l.starts_with("Final checksum:"))
            .expect("checksum line present")
            .to_string()
    };

    assert_eq!(run("7"), run("7"));
    assert_ne!(run("7"), run("8"));
}
