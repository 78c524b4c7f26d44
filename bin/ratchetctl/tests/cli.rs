//! ---
//! ratchet_section: "06-interfaces"
//! ratchet_subsection: "tests"
//! ratchet_type: "test"
//! ratchet_scope: "code"
//! ratchet_description: "Drive the ratchetctl binary against a scratch SQLite database."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(scripts: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script_dir = dir.path().join("scripts");
        fs::create_dir_all(&script_dir).unwrap();
        for (name, body) in scripts {
            fs::write(script_dir.join(name), body).unwrap();
        }
        fs::write(
            dir.path().join("ratchet.toml"),
            r#"
[target]
database = "app.db"

[journal]
kind = "table"

[[sources]]
path = "scripts"

[logging]
directory = "logs"
"#,
        )
        .unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("ratchet.toml")
    }

    fn ratchetctl(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("ratchetctl").unwrap();
        cmd.env("RATCHET_LOG", "off")
            .env_remove("RATCHET_CONFIG")
            .arg("--config")
            .arg(self.config())
            .args(args);
        cmd
    }

    fn status(&self) -> serde_json::Value {
        let output = self.ratchetctl(&["status", "--json"]).output().unwrap();
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn database_exists(fixture: &Fixture) -> bool {
    fixture.dir.path().join("app.db").exists()
}

#[test]
fn upgrade_applies_pending_scripts_once() {
    let fixture = Fixture::new(&[
        ("001_users.sql", "CREATE TABLE users (id INTEGER PRIMARY KEY);"),
        ("002_orders.sql", "CREATE TABLE orders (id INTEGER PRIMARY KEY);"),
    ]);

    fixture.ratchetctl(&["upgrade"]).assert().success();
    assert!(database_exists(&fixture));

    let status = fixture.status();
    assert_eq!(status["upgrade_required"], false);
    assert_eq!(
        status["executed"],
        serde_json::json!(["001_users.sql", "002_orders.sql"])
    );

    let output = fixture.ratchetctl(&["upgrade", "--json"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["results"][0]["skip_reason"], "already-executed");
}

#[test]
fn failed_script_sets_exit_status() {
    let fixture = Fixture::new(&[
        ("001_ok.sql", "CREATE TABLE ok (id INTEGER);"),
        ("002_broken.sql", "CREATE TABLE broken ("),
    ]);

    let output = fixture.ratchetctl(&["upgrade"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("upgrade failed"));

    let status = fixture.status();
    assert_eq!(status["executed"], serde_json::json!(["001_ok.sql"]));
    assert_eq!(status["pending"][0]["name"], "002_broken.sql");
}

#[test]
fn dry_run_leaves_journal_empty() {
    let fixture = Fixture::new(&[("001_users.sql", "CREATE TABLE users (id INTEGER);")]);

    fixture.ratchetctl(&["upgrade", "--dry-run"]).assert().success();

    let status = fixture.status();
    assert_eq!(status["upgrade_required"], true);
    assert_eq!(status["executed"], serde_json::json!([]));
}

#[test]
fn mark_executed_skips_execution() {
    let fixture = Fixture::new(&[("001_users.sql", "CREATE TABLE users (id INTEGER);")]);

    fixture.ratchetctl(&["mark-executed"]).assert().success();
    fixture.ratchetctl(&["upgrade"]).assert().success();

    let status = fixture.status();
    assert_eq!(status["executed"], serde_json::json!(["001_users.sql"]));
}

#[test]
fn version_flag_prints_banner() {
    let output = Command::cargo_bin("ratchetctl")
        .unwrap()
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Ratchet v"));
}
