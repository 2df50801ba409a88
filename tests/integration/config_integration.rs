//! Integration tests for configuration layering

use super::test_utils::with_isolated_env;
use sdm_invoke::config::{global_config_path, workspace_config_dir, ConfigLoader};
use sdm_invoke::error::InvokeError;
use tempfile::TempDir;

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_isolated_env(&test_dir, &[], || {
        let global = global_config_path().unwrap();
        std::fs::create_dir_all(global.parent().unwrap()).unwrap();
        std::fs::write(
            &global,
            r#"
[endpoint]
base_url = "http://global.example:2866"

[client]
tag = "global"
"#,
        )
        .unwrap();

        let ws_dir = workspace_config_dir(workspace.path());
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(
            ws_dir.join("config.toml"),
            r#"
[endpoint]
base_url = "http://workspace.example:2866"

[workspace]
id = "T1"
name = "acme"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert_eq!(config.endpoint.base_url, "http://workspace.example:2866");
        assert_eq!(config.client.tag, "global");
        assert_eq!(config.workspace.id, "T1");
        assert_eq!(config.listener.port_lower_bound, 10000);
    });
}

#[test]
fn test_environment_profile_and_variables() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    with_isolated_env(
        &test_dir,
        &[
            ("SDM_INVOKE_ENV", "ci"),
            ("SDM_INVOKE__LISTENER__STOP_GRACE_MS", "50"),
        ],
        || {
            let ws_dir = workspace_config_dir(workspace.path());
            std::fs::create_dir_all(&ws_dir).unwrap();
            std::fs::write(
                ws_dir.join("ci.toml"),
                "[listener]\nport_lower_bound = 40000\n",
            )
            .unwrap();

            let config = ConfigLoader::load(workspace.path()).unwrap();
            assert_eq!(config.listener.port_lower_bound, 40000);
            assert_eq!(config.listener.stop_grace_ms, 50);
        },
    );
}

#[test]
fn test_missing_explicit_file_is_configuration_error() {
    let err = ConfigLoader::load_from_file(std::path::Path::new("/nonexistent/sdm.toml"))
        .unwrap_err();
    assert!(matches!(err, InvokeError::Configuration(_)));
}

#[test]
fn test_explicit_file_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("sdm.toml");
    std::fs::write(
        &config_file,
        r#"
[listener]
port_lower_bound = 50000
port_upper_bound = 40000
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let problems = config.validate().unwrap_err();
    assert_eq!(problems.len(), 1);
    assert!(config.ensure_valid().is_err());
}
