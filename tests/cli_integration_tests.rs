// CLI integration tests: drive the binary against a scratch data directory

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("form-approval.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[reviewers]
validator_identities = ["siva"]
recommender_identities = ["gunaseelan"]
approver_roles = ["Admin"]

[storage]
data_dir = "{}"
submissions_file = "forms.json"
summary_file = "summary.json"
"#,
            dir.join("data").display()
        ),
    )
    .unwrap();
    path
}

fn run_cli(dir: &Path, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("form-approval").unwrap();
    cmd.current_dir(dir).arg("--config").arg(config);
    cmd
}

fn only_id(dir: &Path) -> String {
    let content = std::fs::read_to_string(dir.join("data/forms.json")).unwrap();
    let records: serde_json::Value = serde_json::from_str(&content).unwrap();
    records[0]["id"].as_str().unwrap().to_string()
}

#[test]
fn test_help_lists_review_commands() {
    let mut cmd = Command::cargo_bin("form-approval").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("approve"))
        .stdout(predicate::str::contains("finalize"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn test_submit_requires_user() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    run_cli(dir.path(), &config)
        .args(["submit", "-f", "factUserId=FU-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

#[test]
fn test_review_flow_from_the_command_line() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    run_cli(dir.path(), &config)
        .args(["--user", "alice", "submit", "-f", "factUserId=FU-1", "-f", "entityName=[\"Acme\"]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Request created"));
    let id = only_id(dir.path());

    // Wrong reviewer is refused and nothing changes
    run_cli(dir.path(), &config)
        .args(["--user", "alice", "approve", &id, "--stage", "validator"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("not authorized"));

    run_cli(dir.path(), &config)
        .args(["--user", "siva", "approve", &id, "--stage", "validator"])
        .assert()
        .success();
    run_cli(dir.path(), &config)
        .args(["--user", "gunaseelan", "approve", &id, "--stage", "recommender"])
        .assert()
        .success();

    run_cli(dir.path(), &config)
        .args(["--user", "root", "--role", "Admin", "finalize", &id, "approve"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("approved file"));

    run_cli(dir.path(), &config)
        .args(["--user", "root", "--role", "Admin", "attach", &id, "sig.pdf"])
        .assert()
        .success();
    run_cli(dir.path(), &config)
        .args(["--user", "root", "--role", "Admin", "finalize", &id, "approve"])
        .assert()
        .success();

    run_cli(dir.path(), &config)
        .args(["list", "--view", "approved"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()));

    run_cli(dir.path(), &config)
        .args(["summary", "sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 new row(s) added"));
    run_cli(dir.path(), &config)
        .args(["summary", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FU-1 | Acme"));
}
