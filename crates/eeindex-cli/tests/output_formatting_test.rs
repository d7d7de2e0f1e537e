//! Integration tests for the `eeindex` binary
//!
//! These run the real binary and cover paths that need neither network nor
//! database access: JSON output shape, argument validation, and exit codes.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn eeindex(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_eeindex"))
        .args(args)
        .env("EEINDEX_CONFIG", "/nonexistent/eeindex/config.toml")
        .env_remove("EEINDEX_REGIONS_FILE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute eeindex")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

fn stderr_error_json(output: &Output) -> serde_json::Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|value| value.get("status").and_then(|s| s.as_str()) == Some("error"))
        .expect("stderr should carry a JSON error")
}

#[test]
fn test_status_json_on_empty_memory_index() {
    let output = eeindex(&["status", "--json"]);
    assert!(output.status.success());

    let parsed = stdout_json(&output);
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"], serde_json::json!([]));
}

#[test]
fn test_status_unknown_product_fails() {
    let output = eeindex(&["status", "--product", "landsat_8", "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let error = stderr_error_json(&output);
    assert_eq!(error["message"], "Product not found");
}

#[test]
fn test_regions_json_from_config_file() {
    let dir = TempDir::new().unwrap();
    let regions = dir.path().join("regions.toml");
    fs::write(
        &regions,
        "[regions.java]\nlatitude = [-8.8, -5.9]\nlongitude = [105.0, 114.6]\n",
    )
    .unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, format!("regions_file = {:?}\n", regions.display().to_string())).unwrap();

    let output = eeindex(&["regions", "--json", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let parsed = stdout_json(&output);
    let data = parsed["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "java");
    assert_eq!(data[0]["min_lat"], -8.8);
    assert_eq!(data[0]["max_lon"], 114.6);
}

#[test]
fn test_regions_without_registry() {
    let output = eeindex(&["regions", "--json"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["data"], serde_json::json!([]));
}

#[test]
fn test_unpaired_resolution_rejected_before_any_request() {
    let output = eeindex(&[
        "index",
        "--asset",
        "COPERNICUS/S1_GRD",
        "--resolution",
        "-10",
        "10",
        "--no-confirm",
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let error = stderr_error_json(&output);
    assert_eq!(error["message"], "Invalid configuration");
}

#[test]
fn test_index_requires_product_or_asset() {
    let output = eeindex(&["index", "--time", "2020", "--no-confirm", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let error = stderr_error_json(&output);
    assert!(error["message"].as_str().unwrap().contains("--product or --asset"));
}

#[test]
fn test_half_open_interval_is_a_usage_error() {
    let output = eeindex(&["index", "--product", "s1", "--time", "2020-01-01/"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_concurrency_out_of_range() {
    let output = eeindex(&[
        "index",
        "--asset",
        "COPERNICUS/S1_GRD",
        "--concurrency",
        "8",
        "--no-confirm",
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let error = stderr_error_json(&output);
    assert!(error["context"].as_str().unwrap().contains("concurrency"));
}
