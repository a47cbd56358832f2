//! CLI integration tests

use std::process::{Command, Output};

fn bigml(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "bigml-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = bigml(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("BigML prediction service"), "Should show app name");
    let commands = [
        "get", "list", "rename", "delete", "predict", "ensemble", "anomaly", "centroid",
    ];
    for command in commands {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = bigml(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("bigml"), "Should show binary name");
}

/// Test global connection options
#[test]
fn test_connection_options() {
    let output = bigml(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--dev-mode"), "Should show dev-mode option");
    assert!(stdout.contains("--username"), "Should show username option");
    assert!(stdout.contains("--api-key"), "Should show api-key option");
    assert!(stdout.contains("--storage"), "Should show storage option");
    assert!(stdout.contains("BIGML_USERNAME"), "Should name the env var");
}

/// Test format option
#[test]
fn test_format_option() {
    let output = bigml(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test list subcommand help
#[test]
fn test_list_help() {
    let output = bigml(&["list", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "List help should succeed");
    assert!(stdout.contains("<KIND>"), "Should show kind argument");
    assert!(stdout.contains("--name"), "Should show name option");
    assert!(stdout.contains("--offset"), "Should show offset option");
    assert!(stdout.contains("--limit"), "Should show limit option");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = bigml(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--input"), "Should show input option");
    assert!(stdout.contains("--remote"), "Should show remote option");
    assert!(stdout.contains("--multiple"), "Should show multiple option");
    assert!(stdout.contains("proportional"), "Should list missing strategies");
}

/// Test ensemble subcommand help
#[test]
fn test_ensemble_help() {
    let output = bigml(&["ensemble", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Ensemble help should succeed");
    assert!(stdout.contains("--method"), "Should show method option");
    assert!(stdout.contains("probability"), "Should list combination methods");
    assert!(stdout.contains("--threshold"), "Should show threshold option");
    assert!(stdout.contains("--category"), "Should show category option");
}

/// Test anomaly and centroid subcommand help
#[test]
fn test_anomaly_and_centroid_help() {
    for command in ["anomaly", "centroid"] {
        let output = bigml(&[command, "--help"]);
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert!(output.status.success(), "{} help should succeed", command);
        assert!(stdout.contains("--input"), "Should show input option");
        assert!(stdout.contains("--remote"), "Should show remote option");
    }
}

/// Test invalid command
#[test]
fn test_invalid_command() {
    let output = bigml(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

/// Test missing required argument
#[test]
fn test_missing_argument() {
    let output = bigml(&["predict", "model/563a1c7a3cd25747430023ce"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing --input should fail");
    assert!(stderr.contains("--input"), "Should name the missing option");
}

/// Test that commands fail cleanly without credentials
#[test]
fn test_missing_credentials() {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "bigml-cli", "--", "get", "model/563a1c7a3cd25747430023ce"])
        .env_remove("BIGML_USERNAME")
        .env_remove("BIGML_API_KEY")
        .output()
        .expect("Failed to execute command");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Should fail without credentials");
    assert!(stderr.contains("BIGML_USERNAME"), "Should explain which variables to set");
}
