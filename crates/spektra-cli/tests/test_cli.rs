use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A 12-node ring with two labels under `<tmp>/ring`.
fn ring_dataset() -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let root = dir.path().join("ring");
    fs::create_dir_all(&root)?;

    let labels: String = (0..12).map(|i| format!("n{i:02} {}\n", if i < 6 { "left" } else { "right" })).collect();
    let edges: String = (0..12).map(|i| format!("n{i:02} n{:02}\n", (i + 1) % 12)).collect();
    fs::write(root.join("label.txt"), labels)?;
    fs::write(root.join("network.txt"), edges)?;
    Ok(dir)
}

#[test]
fn test_cli_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = ring_dataset()?;

    let mut cmd = Command::cargo_bin("spektra")?;
    cmd.arg("stats").arg(dir.path()).arg("ring");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nodes:          12"))
        .stdout(predicate::str::contains("Labels:         2"))
        .stdout(predicate::str::contains("Edges:          12"))
        .stdout(predicate::str::contains("Adjacency nnz:  24"));

    Ok(())
}

#[test]
fn test_cli_supports_chebyshev() -> Result<(), Box<dyn std::error::Error>> {
    let dir = ring_dataset()?;

    let mut cmd = Command::cargo_bin("spektra")?;
    cmd.arg("supports")
        .arg(dir.path())
        .arg("ring")
        .arg("--model")
        .arg("gcn_poly")
        .arg("--support-size")
        .arg("3");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Supports for gcn_poly (3 total)"))
        .stdout(predicate::str::contains("S_0: 12x12  nnz=12"))
        .stdout(predicate::str::contains("S_2: 12x12"));

    Ok(())
}

#[test]
fn test_cli_evaluate() -> Result<(), Box<dyn std::error::Error>> {
    let dir = ring_dataset()?;
    let config = dir.path().join("params.json");
    fs::write(&config, r#"{ "split_weights": [2.0, 1.0, 1.0], "hidden_layer1_size": 4 }"#)?;

    let mut cmd = Command::cargo_bin("spektra")?;
    cmd.arg("evaluate")
        .arg(dir.path())
        .arg("ring")
        .arg("--config")
        .arg(&config)
        .arg("--seed")
        .arg("7");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Model: gcn"))
        .stdout(predicate::str::contains("train      nodes=6"))
        .stdout(predicate::str::contains("validation nodes=3"))
        .stdout(predicate::str::contains("test       nodes=3"));

    Ok(())
}

#[test]
fn test_cli_unknown_model_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = ring_dataset()?;

    let mut cmd = Command::cargo_bin("spektra")?;
    cmd.arg("supports").arg(dir.path()).arg("ring").arg("--model").arg("gat");
    cmd.assert().failure().stderr(predicate::str::contains("unknown model kind"));

    Ok(())
}

#[test]
fn test_cli_missing_dataset() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("spektra")?;
    cmd.arg("stats").arg(dir.path()).arg("absent");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load dataset absent"));

    Ok(())
}
