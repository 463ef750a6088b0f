//! Tests for configuration loading and graceful degradation
//!
//! Covers:
//! - Missing config files SHALL NOT cause termination (defaults are used)
//! - Priority order: CLI argument, then SIMS_CONFIG, then platform locations
//! - Malformed files are reported as configuration errors
//!
//! Tests that touch SIMS_CONFIG are marked #[serial] so they don't race on
//! the process environment.

use serial_test::serial;
use sims_common::config::{load_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use sims_common::key::KeyEncoding;
use sims_common::rows::RowKind;
use sims_common::Error;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_full_config_parses() {
    let file = write_config(
        r#"
host = "0.0.0.0"
port = 6100
event_capacity = 250

[upstream]
base_url = "https://erp.school.example/api"
timeout_secs = 20
class_entitlements_path = "entitlements/bulk"

[consolidation]
key_encoding = "legacy-joined"

[logging]
level = "debug"
"#,
    );

    let config = TomlConfig::from_file(file.path()).unwrap();
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 6100);
    assert_eq!(config.event_capacity, 250);
    assert_eq!(config.upstream.timeout_secs, Some(20));
    assert_eq!(
        config.upstream.endpoint_url(RowKind::ClassEntitlement),
        "https://erp.school.example/api/entitlements/bulk"
    );
    // Unset path keeps its default
    assert_eq!(
        config.upstream.endpoint_url(RowKind::StudentIssue),
        "https://erp.school.example/api/student-inventory/bulk-upsert"
    );
    assert_eq!(config.consolidation.key_encoding, KeyEncoding::LegacyJoined);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_config_is_error() {
    let file = write_config("port = \"not a number\"");
    let result = TomlConfig::from_file(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unknown_key_encoding_is_error() {
    let result = TomlConfig::from_toml_str("[consolidation]\nkey_encoding = \"dashes\"\n");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_argument_takes_precedence_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/sims-from-env.toml");

    let cli = PathBuf::from("/tmp/sims-from-cli.toml");
    let resolved = resolve_config_path(Some(&cli));
    assert_eq!(resolved, Some(cli));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/sims-from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/sims-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let missing = PathBuf::from(format!(
        "/tmp/sims-missing-config-{}.toml",
        std::process::id()
    ));
    let config = load_config(Some(&missing)).expect("missing file must not be fatal");
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_load_config_from_env_file() {
    let file = write_config("port = 6200\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = load_config(None).unwrap();
    assert_eq!(config.port, 6200);

    env::remove_var(CONFIG_ENV_VAR);
}
