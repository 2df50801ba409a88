//! Integration tests for the sdm-invoke binary: exit codes and file logging.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn sdm_invoke(temp_dir: &TempDir) -> Command {
    let config_home = temp_dir.path().join("config");
    let home = temp_dir.path().join("home");
    fs::create_dir_all(&config_home).unwrap();
    fs::create_dir_all(&home).unwrap();

    let mut command = Command::new(env!("CARGO_BIN_EXE_sdm-invoke"));
    command
        .env("XDG_CONFIG_HOME", config_home.as_os_str())
        .env("HOME", home.as_os_str())
        .env_remove("SDM_INVOKE_LOG")
        .env_remove("SDM_INVOKE_ENV");
    command
}

#[test]
fn test_config_show_prints_effective_config() {
    let temp_dir = TempDir::new().unwrap();
    let output = sdm_invoke(&temp_dir)
        .env("SDM_INVOKE__CLIENT__TAG", "ci")
        .arg("--workspace")
        .arg(temp_dir.path())
        .args(["config", "show"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "config show should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tag = \"ci\""));
}

#[test]
fn test_missing_endpoint_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let output = sdm_invoke(&temp_dir)
        .env("SDM_INVOKE__ENDPOINT__BASE_URL", "")
        .arg("--workspace")
        .arg(temp_dir.path())
        .args(["run", "deploy", "--no-prompt"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("endpoint.base_url"), "stderr={}", stderr);
}

#[test]
fn test_file_logging_from_workspace_config() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    let log_file = temp_dir.path().join("sdm-invoke.log");
    fs::create_dir_all(workspace.join(".sdm")).unwrap();
    fs::write(
        workspace.join(".sdm").join("config.toml"),
        format!(
            "[logging]\nlevel = \"info\"\noutput = \"file\"\nfile = {:?}\n",
            log_file.to_string_lossy()
        ),
    )
    .unwrap();

    let output = sdm_invoke(&temp_dir)
        .arg("--workspace")
        .arg(&workspace)
        .args(["config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let contents = fs::read_to_string(&log_file).unwrap();
    assert!(contents.contains("sdm-invoke starting"), "log={}", contents);
}
