//! Integration tests for netdiag CLI functionality

#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::net::UdpSocket;
use std::thread;

#[test]
fn test_help_output() {
    let mut cmd = Command::cargo_bin("netdiag").expect("Failed to find netdiag binary");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Ping, traceroute, DNS and WHOIS"))
        .stdout(predicate::str::contains("ping"))
        .stdout(predicate::str::contains("trace"))
        .stdout(predicate::str::contains("dns"))
        .stdout(predicate::str::contains("whois"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version_output() {
    let mut cmd = Command::cargo_bin("netdiag").expect("Failed to find netdiag binary");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("netdiag "));
}

#[test]
fn test_dns_help_lists_options() {
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.args(["dns", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--reverse"))
        .stdout(predicate::str::contains("--type"));
}

#[test]
fn test_missing_subcommand_fails() {
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_invalid_trace_config() {
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.args(["trace", "-q", "0", "127.0.0.1"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_unknown_record_type() {
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.args(["dns", "-t", "BOGUS", "example.com", "--server", "127.0.0.1:9"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown record type"));
}

/// Answer one A query with 192.0.2.44
fn one_shot_dns_server() -> String {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap().to_string();
    thread::spawn(move || {
        let mut buf = [0u8; 512];
        let (len, from) = socket.recv_from(&mut buf).unwrap();
        let mut response = buf[..len].to_vec();
        response[2] |= 0x80;
        response[7] = 1;
        response.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0x0e, 0x10, 0, 4, 192, 0, 2, 44]);
        socket.send_to(&response, from).unwrap();
    });
    addr
}

#[test]
fn test_dns_against_local_server() {
    let server = one_shot_dns_server();
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.args(["dns", "example.com", "--server", &server]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("example.com\t3600\tIN\tA\t192.0.2.44"));
}

#[test]
fn test_dns_json_output() {
    let server = one_shot_dns_server();
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.args(["--json", "dns", "example.com", "--server", &server]);

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(json["name"], "example.com");
    assert_eq!(json["server"], server.as_str());
    assert_eq!(json["answer"][0]["value"], "192.0.2.44");
    assert_eq!(json["answer"][0]["record_type"], "A");
    assert_eq!(json["answer"][0]["ttl"], 3600);
}
