//! Integration tests for CLI commands

#![allow(deprecated)]

use assert_cmd::{assert::OutputAssertExt, cargo::CommandCargoExt};
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("ecospatial").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_resolve_prints_canonical_location() {
    let mut cmd = Command::cargo_bin("ecospatial").unwrap();
    cmd.arg("resolve").arg("경기도 수원시");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"normalized_name\": \"수원\""))
        .stdout(predicate::str::contains("\"display_name\": \"수원시\""));
}

#[test]
fn test_resolve_unknown_place_fails() {
    let mut cmd = Command::cargo_bin("ecospatial").unwrap();
    cmd.arg("resolve").arg("부산");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown place"));
}

#[test]
fn test_layers_lists_every_kind() {
    let mut cmd = Command::cargo_bin("ecospatial").unwrap();
    cmd.arg("layers");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("flood_risk"))
        .stdout(predicate::str::contains("heatwave"))
        .stdout(predicate::str::contains("elderly"))
        .stdout(predicate::str::contains("parks"))
        .stdout(predicate::str::contains("air_quality"))
        .stdout(predicate::str::contains("weather"));
}

#[test]
fn test_ask_help() {
    let mut cmd = Command::cargo_bin("ecospatial").unwrap();
    cmd.arg("ask").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--format"));
}
