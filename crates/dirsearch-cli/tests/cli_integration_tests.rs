//! CLI integration tests for dirsearch
//!
//! Runs the dirsearch binary end-to-end against a temporary database and
//! config directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const FIXTURE: &str = r#"{
    "realms": [
        {
            "name": "acme",
            "groups": ["empty"],
            "principals": [
                {
                    "username": "alice",
                    "email": "alice@example.com",
                    "attributes": { "city": ["Moscow"], "role": ["admin"] },
                    "groups": ["admins"]
                },
                {
                    "username": "bob",
                    "email": "bob@example.com",
                    "attributes": { "city": ["Saint Petersburg"] },
                    "groups": ["admins"]
                },
                {
                    "username": "carol",
                    "attributes": { "city": ["Kazan"] }
                }
            ]
        }
    ]
}"#;

/// Temporary config directory and database shared by one test
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("directory.db")
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("dirsearch").unwrap();
        cmd.env("DIRSEARCH_CONFIG_DIR", self.dir.path().join("config"));
        cmd.env("RUST_LOG", "off");
        cmd.arg("--database").arg(self.database());
        cmd
    }

    /// Sandbox with the fixture already imported
    fn imported() -> Self {
        let sandbox = Self::new();
        let fixture = sandbox.dir.path().join("fixture.json");
        std::fs::write(&fixture, FIXTURE).unwrap();

        sandbox
            .cmd()
            .arg("import")
            .arg(&fixture)
            .assert()
            .success()
            .stdout(predicate::str::contains("Principals: 3"));
        sandbox
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .cmd()
            .args(["--format", "json"])
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

#[test]
fn test_info_command() {
    Sandbox::new()
        .cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("dirsearch"));
}

#[test]
fn test_import_json_reports_counts() {
    let sandbox = Sandbox::new();
    let fixture = sandbox.dir.path().join("fixture.json");
    std::fs::write(&fixture, FIXTURE).unwrap();

    let result = sandbox.json(&["import", fixture.to_str().unwrap()]);
    assert_eq!(result["realms"], 1);
    assert_eq!(result["principals"], 3);
    assert_eq!(result["memberships"], 2);
}

#[test]
fn test_import_missing_fixture_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["import", "no-such-file.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_search_by_attribute() {
    let sandbox = Sandbox::imported();

    sandbox
        .cmd()
        .args(["search", "--realm", "acme", "city=Moscow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 principal(s)"))
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("bob").not());
}

#[test]
fn test_search_json_response() {
    let sandbox = Sandbox::imported();

    let response = sandbox.json(&["search", "-r", "acme", "city=Moscow||Kazan"]);
    assert_eq!(response["totalSize"], 2);
    let names: Vec<&str> = response["principals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "carol"]);
}

#[test]
fn test_search_paging_and_direction() {
    let sandbox = Sandbox::imported();

    let response = sandbox.json(&[
        "search",
        "-r",
        "acme",
        "_orderDirect=desc",
        "_first=1",
        "_max=1",
    ]);
    assert_eq!(response["totalSize"], 3);
    assert_eq!(response["principals"][0]["username"], "bob");
}

#[test]
fn test_search_uses_default_realm_from_config() {
    let sandbox = Sandbox::imported();

    sandbox
        .cmd()
        .args(["search", "group=admins"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No realm given"));

    sandbox
        .cmd()
        .args(["config", "set", "search.default_realm", "acme"])
        .assert()
        .success();

    let response = sandbox.json(&["search", "group=admins"]);
    assert_eq!(response["totalSize"], 2);
}

#[test]
fn test_unknown_realm_reports_error_code() {
    let sandbox = Sandbox::imported();

    sandbox
        .cmd()
        .args(["search", "--realm", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001"));
}

#[test]
fn test_count_command() {
    let sandbox = Sandbox::imported();

    sandbox
        .cmd()
        .args(["count", "--realm", "acme", "group=admins"])
        .assert()
        .success()
        .stdout("2\n");

    let response = sandbox.json(&["count", "--realm", "acme", "email=%@example.com"]);
    assert_eq!(response["totalSize"], 2);
}

#[test]
fn test_index_command() {
    let sandbox = Sandbox::imported();

    let response = sandbox.json(&["index", "--realm", "acme", "--label", "city"]);
    assert_eq!(response["totalSize"], 3);
    assert_eq!(
        response["values"],
        serde_json::json!(["Kazan", "Moscow", "Saint Petersburg"])
    );

    let response = sandbox.json(&["index", "--realm", "acme", "_label=city", "group=admins"]);
    assert_eq!(
        response["values"],
        serde_json::json!(["Moscow", "Saint Petersburg"])
    );
}

#[test]
fn test_index_without_label_fails() {
    let sandbox = Sandbox::imported();

    sandbox
        .cmd()
        .args(["index", "--realm", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("_label"));
}

#[test]
fn test_classify_command() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["classify", "lastName"])
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in field"));

    sandbox
        .cmd()
        .args(["classify", "group"])
        .assert()
        .success()
        .stdout(predicate::str::contains("group membership"));

    sandbox
        .cmd()
        .args(["classify", "city"])
        .assert()
        .success()
        .stdout(predicate::str::contains("attribute 'city'"));
}

#[test]
fn test_config_set_get_and_reset() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "set", "search.default_page_size", "25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set search.default_page_size = 25"));

    sandbox
        .cmd()
        .args(["config", "get", "search.default_page_size"])
        .assert()
        .success()
        .stdout("25\n");

    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_page_size = 25"));

    sandbox.cmd().args(["config", "reset"]).assert().success();

    sandbox
        .cmd()
        .args(["config", "get", "search.default_page_size"])
        .assert()
        .success()
        .stdout("15\n");
}

#[test]
fn test_config_rejects_unknown_key() {
    Sandbox::new()
        .cmd()
        .args(["config", "set", "search.colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_path_uses_override_dir() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains(
            sandbox.dir.path().to_str().unwrap(),
        ));
}

#[test]
fn test_doctor_command() {
    let sandbox = Sandbox::imported();

    sandbox
        .cmd()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Database: Connected"))
        .stdout(predicate::str::contains("acme (3 principals)"))
        .stdout(predicate::str::contains("All checks passed!"));
}
