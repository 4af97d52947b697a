//! Integration tests for the `boycivenga` CLI binary.
//!
//! Argument parsing, dry-run, input errors and the CI gate run without a
//! controller; plan and apply run against a wiremock controller.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const NETWORKCONF: &str = "/proxy/network/api/s/default/rest/networkconf";

/// Build a command for the binary with env isolation.
///
/// Clears every variable the tool reads and points config directories at
/// a nonexistent path so tests never touch the user's real configuration.
fn boycivenga_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("boycivenga");
    cmd.env("HOME", "/tmp/boycivenga-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/boycivenga-cli-test-nonexistent")
        .env("USER", "tester");
    for key in [
        "CI",
        "GITHUB_ACTIONS",
        "GITHUB_ACTOR",
        "RUST_LOG",
        "BOYCIVENGA_PROFILE",
        "UNIFI_SITE",
        "UNIFI_CONTROLLER_URL",
        "UNIFI_USERNAME",
        "UNIFI_PASSWORD",
        "UNIFI_ALLOW_INSECURE",
        "TF_VAR_unifi_username",
        "TF_VAR_unifi_password",
        "TF_VAR_unifi_allow_insecure",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Command wired to a mock controller with env credentials.
fn controller_cmd(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = boycivenga_cmd();
    cmd.env("UNIFI_CONTROLLER_URL", server.uri())
        .env("UNIFI_USERNAME", "admin")
        .env("UNIFI_PASSWORD", "secret");
    cmd
}

fn write_input(dir: &Path, doc: &serde_json::Value) -> PathBuf {
    let path = dir.join("site.json");
    std::fs::write(&path, serde_json::to_vec_pretty(doc).unwrap()).unwrap();
    path
}

fn lab_input() -> serde_json::Value {
    json!({
        "site_name": "Lab",
        "site_slug": "lab",
        "vlans": [
            { "vlan_id": 10, "name": "lan", "status": "active" },
            { "vlan_id": 20, "name": "iot", "status": "active" }
        ],
        "prefixes": [
            { "cidr": "10.1.0.0/24", "vlan_id": 10 },
            { "cidr": "10.2.0.0/24", "vlan_id": 20 }
        ],
        "tags": []
    })
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": data }))
}

async fn mount_unifi_os_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(405))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-CSRF-Token", "tok")
                .set_body_json(json!({})),
        )
        .mount(server)
        .await;
}

/// Run a blocking command from inside an async test.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = boycivenga_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_help_flag() {
    boycivenga_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("apply")
            .and(predicate::str::contains("plan"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    boycivenga_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("boycivenga"));
}

#[test]
fn test_completions_bash() {
    boycivenga_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Input handling ──────────────────────────────────────────────────

#[test]
fn test_dry_run_lists_networks_offline() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &lab_input());
    let state = dir.path().join("state.json");

    boycivenga_cmd()
        .args(["apply", "--dry-run", "--color", "never", "--input"])
        .arg(&input)
        .arg("--state-file")
        .arg(&state)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("  - lan (VLAN 10): 10.1.0.1/24")
                .and(predicate::str::contains("  - iot (VLAN 20): 10.2.0.1/24"))
                .and(predicate::str::contains("No changes applied (dry-run mode)")),
        );

    assert!(!state.exists());
}

#[test]
fn test_missing_input_file() {
    boycivenga_cmd()
        .args(["apply", "--dry-run", "--input", "/nonexistent/site.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_invalid_cidr_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        &json!({
            "vlans": [{ "vlan_id": 10, "name": "lan" }],
            "prefixes": [{ "cidr": "10.1.0.300/24", "vlan_id": 10 }]
        }),
    );

    boycivenga_cmd()
        .args(["apply", "--dry-run", "--input"])
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("10.1.0.300/24"));
}

#[test]
fn test_undersized_subnet_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        &json!({
            "vlans": [{ "vlan_id": 10, "name": "p2p" }],
            "prefixes": [{ "cidr": "10.9.0.0/30", "vlan_id": 10 }]
        }),
    );

    boycivenga_cmd()
        .args(["plan", "--input"])
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too small"));
}

// ── CI transport gate ───────────────────────────────────────────────

#[test]
fn test_ci_gate_rejects_insecure_env_before_reading_input() {
    boycivenga_cmd()
        .env("GITHUB_ACTIONS", "true")
        .env("UNIFI_ALLOW_INSECURE", "true")
        .args(["apply", "--dry-run", "--input", "/nonexistent/site.json"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("UNIFI_ALLOW_INSECURE")
                .and(predicate::str::contains("Input file not found").not()),
        );
}

#[test]
fn test_ci_gate_rejects_insecure_flag() {
    boycivenga_cmd()
        .env("CI", "TRUE")
        .args(["plan", "--insecure", "--input", "/nonexistent/site.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--insecure"));
}

// ── Against a controller ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_first_run_reports_pending_creates() {
    let server = MockServer::start().await;
    mount_unifi_os_login(&server).await;
    Mock::given(method("GET"))
        .and(path(NETWORKCONF))
        .respond_with(ok(json!([{ "_id": "d1", "name": "Default", "purpose": "corporate" }])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &lab_input());

    let mut cmd = controller_cmd(&server);
    cmd.args(["plan", "--output", "json", "--input"])
        .arg(&input)
        .arg("--state-dir")
        .arg(dir.path());
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(2), "{}", stdout_of(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(report["status"], "changes_pending");
    assert_eq!(report["summary"]["create"], 2);
    assert_eq!(report["summary"]["delete"], 0);
    assert!(report["last_apply"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_records_state_then_plan_is_clean() {
    let server = MockServer::start().await;
    mount_unifi_os_login(&server).await;
    Mock::given(method("GET"))
        .and(path(NETWORKCONF))
        .respond_with(ok(json!([
            {
                "_id": "n1", "name": "lan", "purpose": "corporate", "vlan": "10",
                "ip_subnet": "10.1.0.1/24", "dhcpd_enabled": true,
                "dhcpd_start": "10.1.0.6", "dhcpd_stop": "10.1.0.254"
            },
            {
                "_id": "n2", "name": "iot", "purpose": "corporate", "vlan": 20,
                "ip_subnet": "10.2.0.1/24", "dhcpd_enabled": true,
                "dhcpd_start": "10.2.0.6", "dhcpd_stop": "10.2.0.254"
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(NETWORKCONF))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &lab_input());
    let state = dir.path().join("lab-state.json");

    let mut apply = controller_cmd(&server);
    apply
        .args(["apply", "--color", "never", "--input"])
        .arg(&input)
        .arg("--state-file")
        .arg(&state);
    let output = run(apply).await;
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    assert!(stdout_of(&output).contains("Unchanged: 2"));

    let recorded: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&state).unwrap()).unwrap();
    assert_eq!(recorded["format_version"], "1.0");
    assert_eq!(recorded["applied_by"], "tester");
    assert_eq!(recorded["networks"][0]["id"], "n1");
    assert!(
        recorded["tfvars_checksum"]
            .as_str()
            .unwrap()
            .starts_with("sha256:")
    );

    let mut plan = controller_cmd(&server);
    plan.args(["plan", "--color", "never", "--input"])
        .arg(&input)
        .arg("--state-file")
        .arg(&state);
    let output = run(plan).await;
    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    let text = stdout_of(&output);
    assert!(text.contains("Last apply:"));
    assert!(text.contains("Input unchanged since last apply"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_partial_failure_exits_one_and_records_successes() {
    let server = MockServer::start().await;
    mount_unifi_os_login(&server).await;
    Mock::given(method("GET"))
        .and(path(NETWORKCONF))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(NETWORKCONF))
        .and(body_partial_json(json!({ "name": "lan" })))
        .respond_with(ok(json!([{ "_id": "n1", "name": "lan", "vlan": 10, "ip_subnet": "10.1.0.1/24" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(NETWORKCONF))
        .and(body_partial_json(json!({ "name": "iot" })))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "meta": { "rc": "error", "msg": "api.err.VlanUsed" }, "data": [] })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &lab_input());
    let state = dir.path().join("state.json");

    let mut cmd = controller_cmd(&server);
    cmd.args(["apply", "--color", "never", "--input"])
        .arg(&input)
        .arg("--state-file")
        .arg(&state);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    let text = stdout_of(&output);
    assert!(text.contains("Created:   1"), "{text}");
    assert!(text.contains("✗ iot (VLAN 20) [create]"), "{text}");

    let recorded: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&state).unwrap()).unwrap();
    let networks = recorded["networks"].as_array().unwrap();
    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0]["name"], "lan");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_reads_state_with_string_vlan_tags() {
    let server = MockServer::start().await;
    mount_unifi_os_login(&server).await;
    Mock::given(method("GET"))
        .and(path(NETWORKCONF))
        .respond_with(ok(json!([
            {
                "_id": "n1", "name": "lan", "purpose": "corporate", "vlan": "10",
                "ip_subnet": "10.1.0.1/24", "dhcpd_enabled": true,
                "dhcpd_start": "10.1.0.6", "dhcpd_stop": "10.1.0.254"
            },
            {
                "_id": "n2", "name": "iot", "purpose": "corporate", "vlan": 20,
                "ip_subnet": "10.2.0.1/24", "dhcpd_enabled": true,
                "dhcpd_start": "10.2.0.6", "dhcpd_stop": "10.2.0.254"
            }
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &lab_input());
    let state = dir.path().join("state.json");
    let written_by_older_tooling = json!({
        "format_version": "1.0",
        "applied_at": "2024-11-02T08:30:00.512345Z",
        "applied_by": "github-actions",
        "site": "default",
        "tfvars_checksum": "sha256:0000",
        "networks": [
            { "id": "n1", "name": "lan", "vlan_id": "10", "subnet": "10.1.0.1/24",
              "created_at": "2024-11-02T08:30:00.512345Z", "source": "netbox" },
            { "id": "n2", "name": "iot", "vlan_id": 20, "subnet": "10.2.0.1/24",
              "created_at": "2024-11-02T08:30:00.512345Z", "source": "netbox" }
        ]
    });
    std::fs::write(&state, written_by_older_tooling.to_string()).unwrap();

    let mut cmd = controller_cmd(&server);
    cmd.args(["plan", "--output", "json", "--input"])
        .arg(&input)
        .arg("--state-file")
        .arg(&state);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(0), "{}", stdout_of(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(report["status"], "clean");
    assert_eq!(report["diff"]["is_clean"], true);
    assert_eq!(report["last_apply"]["applied_by"], "github-actions");
    assert_eq!(report["last_apply"]["input_matches"], false);
}
