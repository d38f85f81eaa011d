mod common;

use common::*;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// `glue` running in `dir`, with history and credentials kept inside it
fn cli_command(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_glue"));
    cmd.current_dir(dir)
        .env("GLUE_HISTORY_DIR", dir.join("history"))
        .env("GLUE_AUTH_DIR", dir.join("auth"))
        .env("GLUE_NO_KEYRING", "1")
        .env_remove("GLUE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn project(content: &str) -> TempDir {
    let dir = create_test_dir();
    write_workflow(dir.path(), content);
    dir
}

#[test]
fn test_cli_help() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Glue local commands and external services into workflows"));
    for command in ["run", "list", "history", "auth", "init"] {
        assert!(stdout.contains(command), "missing {}", command);
    }
}

#[test]
fn test_cli_version() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("--version").output().unwrap();

    assert!(output.status.success());
    assert!(stdout(&output).contains("glue"));
}

#[test]
fn test_cli_history_help() {
    let dir = create_test_dir();
    let output = cli_command(dir.path())
        .args(["history", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("--limit"));
    assert!(stdout.contains("--clear"));
}

#[cfg(unix)]
#[test]
fn test_cli_run_success() {
    let dir = project(&local_workflow("build", &["true", "echo built"]));
    let output = cli_command(dir.path()).args(["run", "build"]).output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("✓ step-1"));
    assert!(stdout.contains("✓ step-2"));
    assert!(stdout.contains("built"));
    assert!(stdout.contains("Workflow completed successfully"));
}

#[cfg(unix)]
#[test]
fn test_cli_run_failure_exit_code() {
    let dir = project(&local_workflow("build", &["false", "touch should-not-exist"]));
    let output = cli_command(dir.path()).args(["run", "build"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("✗ step-1"));
    assert!(stderr(&output).contains("Command exited with code 1"));
    assert!(!dir.path().join("should-not-exist").exists());
}

#[cfg(unix)]
#[test]
fn test_cli_run_records_history() {
    let dir = project(&local_workflow("build", &["true"]));
    let run = cli_command(dir.path()).args(["run", "build"]).output().unwrap();
    assert!(run.status.success());
    let run_log = dir.path().join("history").join("glue.log");
    assert!(std::fs::read_to_string(&run_log).unwrap().contains("\"workflow\":\"build\""));

    let output = cli_command(dir.path()).arg("history").output().unwrap();
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Workflow Execution History"));
    assert!(stdout.contains("✓ build"));

    let cleared = cli_command(dir.path())
        .args(["history", "--clear"])
        .output()
        .unwrap();
    assert!(self::stdout(&cleared).contains("History cleared"));
    assert!(!run_log.exists());

    let output = cli_command(dir.path()).arg("history").output().unwrap();
    assert!(self::stdout(&output).contains("No workflow executions found"));
}

#[test]
fn test_cli_run_unknown_workflow() {
    let dir = project(&local_workflow("build", &["true"]));
    let output = cli_command(dir.path()).args(["run", "deploy"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Workflow \"deploy\" not found. Available workflows: build"));
}

#[test]
fn test_cli_run_without_config() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).args(["run", "build"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to read workflow file"));
}

#[test]
fn test_cli_run_invalid_step() {
    let dir = project(
        r#"
build:
  when: build
  steps:
    - name: Ambiguous
      run: "true"
      adapter: slack
"#,
    );
    let output = cli_command(dir.path()).args(["run", "build"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to parse workflow file"));
}

#[test]
fn test_cli_run_adapter_not_authenticated() {
    let dir = project(
        r##"
notify:
  when: notify
  steps:
    - name: Tell the team
      adapter: slack
      action: notify
      options:
        channel: "#ops"
        message: hello
"##,
    );
    let output = cli_command(dir.path()).args(["run", "notify"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Slack not authenticated. Run: glue auth slack"));
}

#[test]
fn test_cli_list() {
    let dir = project(
        r##"
deploy:
  when: deploy
  steps:
    - name: Build
      run: make
    - name: Announce
      adapter: slack
      action: notify
      options:
        channel: "#deploys"
        message: shipped
"##,
    );
    let output = cli_command(dir.path()).arg("list").output().unwrap();

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("deploy"));
    assert!(stdout.contains("Steps: 2"));
    assert!(stdout.contains("- Build (local)"));
    assert!(stdout.contains("- Announce (slack:notify)"));
}

#[test]
fn test_cli_config_flag() {
    let dir = create_test_dir();
    std::fs::write(
        dir.path().join("ci.yaml"),
        local_workflow("lint", &["true"]),
    )
    .unwrap();

    let output = cli_command(dir.path())
        .args(["--config", "ci.yaml", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("lint"));
}

#[test]
fn test_cli_init() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("init").output().unwrap();

    assert!(output.status.success());
    assert!(stdout(&output).contains("Created glue.yaml"));

    let config = glue::WorkflowLoader::load_file(&dir.path().join("glue.yaml")).unwrap();
    assert!(config.contains_key("deploy"));
    assert!(config.contains_key("ci-fail"));

    let again = cli_command(dir.path()).arg("init").output().unwrap();
    assert_eq!(again.status.code(), Some(1));
    assert!(stdout(&again).contains("already exists"));
}

#[test]
fn test_cli_auth_unknown_adapter() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).args(["auth", "jira"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Adapter \"jira\" not found"));
}

#[test]
fn test_cli_auth_saves_credential() {
    use std::io::Write;
    use std::process::Stdio;

    let dir = create_test_dir();
    let mut child = cli_command(dir.path())
        .args(["auth", "github"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"ghp_from_terminal\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Successfully authenticated with github"));

    let store = glue::CredentialStore::file_only(glue::FileStore::new(dir.path().join("auth")));
    assert_eq!(
        store.get("github", "token").as_deref(),
        Some("ghp_from_terminal")
    );
}
