use assert_cmd::Command;

#[test]
fn test_binary_help() {
    let mut cmd = Command::cargo_bin("deadmap-check").unwrap();
    cmd.arg("--help").assert().success();
}

#[test]
fn test_binary_version() {
    let mut cmd = Command::cargo_bin("deadmap-check").unwrap();
    cmd.arg("--version").assert().success();
}

#[test]
fn test_binary_requires_run_number() {
    let mut cmd = Command::cargo_bin("deadmap-check").unwrap();
    cmd.assert().failure().code(2);
}
