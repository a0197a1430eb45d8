//! CLI integration tests

use std::process::Command;

fn run(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "spectra-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("SPECTRA"), "Should show app name");
    for command in ["instances", "regions", "migrate", "history", "jobs", "budgets", "dashboard", "admin"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("spectra"), "Should show binary name");
}

#[test]
fn test_instances_list_help() {
    let output = run(&["instances", "list", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--region"), "Should show region option");
    assert!(stdout.contains("--risk"), "Should show risk option");
    assert!(stdout.contains("--search"), "Should show search option");
}

#[test]
fn test_migrate_help() {
    let output = run(&["migrate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--from"));
    assert!(stdout.contains("--to"));
}

#[test]
fn test_admin_tick_help() {
    let output = run(&["admin", "tick", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--hours"));
}

#[test]
fn test_budgets_export_help() {
    let output = run(&["budgets", "export", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--quarter"));
    assert!(stdout.contains("--output"));
}

/// Test format option is accepted
#[test]
fn test_format_option() {
    let output = run(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

/// Test invalid command handling
#[test]
fn test_invalid_command() {
    let output = run(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

/// Test missing required argument
#[test]
fn test_missing_argument() {
    let output = run(&["migrate", "--from", "US"]);
    assert!(!output.status.success(), "Missing --to should fail");
}

#[test]
fn test_invalid_format_value() {
    let output = run(&["--format", "yaml", "dashboard"]);
    assert!(!output.status.success(), "Unknown format should fail");
}
