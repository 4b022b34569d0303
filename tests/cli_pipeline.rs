use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

/// Get a Command for deadmap-check with ambient configuration stripped
fn deadmap() -> Command {
    let mut cmd = Command::cargo_bin("deadmap-check").unwrap();
    cmd.env_remove("DEADMAP_BOOKKEEPING_URL")
        .env_remove("DEADMAP_TOKEN_FILE")
        .env_remove("DEADMAP_OUTPUT_ROOT")
        .env_remove("DEADMAP_QA_MACRO")
        .env_remove("DEADMAP_QA_TIMEOUT")
        .env_remove("DEADMAP_LOG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_run_zero_is_a_usage_error() {
    deadmap().arg("0").assert().failure().code(2);
}

#[test]
fn test_non_numeric_run_is_a_usage_error() {
    deadmap().arg("not-a-run").assert().failure().code(2);
}

#[test]
fn test_qa_only_without_run_directory_is_fatal() {
    let dir = tempdir().unwrap();

    deadmap()
        .current_dir(dir.path())
        .args(["123456", "--qa-only"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("run directory not found"));

    // fatal before any run directory is created
    assert!(!dir.path().join("output/123456").exists());
}

#[test]
fn test_fresh_run_with_unreadable_token_relocates_log() {
    let dir = tempdir().unwrap();

    deadmap()
        .current_dir(dir.path())
        .arg("123456")
        .env("DEADMAP_TOKEN_FILE", "missing-token.txt")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("bookkeeping"));

    // the working directory survives the fatal exit and holds the log
    let workdir = dir.path().join("output/123456");
    assert!(workdir.is_dir());
    assert!(workdir.join("main.log").exists());
    assert!(!dir.path().join("output/123456.log").exists());
}

#[test]
fn test_fresh_run_replaces_stale_directory() {
    let dir = tempdir().unwrap();
    let workdir = dir.path().join("output/123456");
    std::fs::create_dir_all(&workdir).unwrap();
    std::fs::write(workdir.join("orbits.svg"), "stale artifact").unwrap();

    deadmap()
        .current_dir(dir.path())
        .arg("123456")
        .env("DEADMAP_TOKEN_FILE", "missing-token.txt")
        .assert()
        .failure()
        .code(3);

    assert!(!workdir.join("orbits.svg").exists());
}

#[test]
fn test_bad_config_file_is_a_generic_failure() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("deadmap.toml");
    std::fs::write(&config, "qa_timeout_secs = \"not a number\"").unwrap();

    deadmap()
        .current_dir(dir.path())
        .args(["123456", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_help_mentions_qa_only_mode() {
    deadmap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--qa-only"));
}
