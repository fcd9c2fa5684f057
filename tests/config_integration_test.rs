//! Configuration loading integration tests

use eventvault::config::{load_config, InitialPosition};
use secrecy::ExposeSecret;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const FULL_CONFIG: &str = r#"
[application]
log_level = "debug"

[query]
tenant = "acme01"
page_size = 500
max_polls = 10
request_timeout_millis = 60000

[oauth]
token_url = "https://sso.example.com/oauth2/token"
client_id = "client"
client_secret = "${EVENTVAULT_IT_CLIENT_SECRET}"
scope = "storage:events:read"
resource_urn = "urn:example:tenant:acme01"

[storage]
region = "eu-west-1"
data_bucket = "events-archive"
checkpoint_bucket = "events-checkpoints"
endpoint = "http://localhost:4566"
force_path_style = true
data_role_arn = "arn:aws:iam::123456789012:role/archive-writer"

[export]
staging_dir = "/tmp/eventvault-test"
max_part_bytes = 1048576
initial_position = "epoch"
max_parallel = 2
max_duration_hours = 3
drain_delay_seconds = 5
"#;

#[test]
fn full_config_round_trips_with_env_substitution() {
    std::env::set_var("EVENTVAULT_IT_CLIENT_SECRET", "sub-secret");
    let file = write_config(FULL_CONFIG);

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.query.tenant, "acme01");
    assert_eq!(config.query.page_size, 500);
    assert_eq!(config.query.max_polls, 10);
    assert_eq!(
        config.oauth.client_secret.expose_secret().as_ref(),
        "sub-secret"
    );
    assert_eq!(config.storage.region, "eu-west-1");
    assert!(config.storage.force_path_style);
    assert_eq!(
        config.storage.data_role_arn.as_deref(),
        Some("arn:aws:iam::123456789012:role/archive-writer")
    );
    assert!(config.storage.checkpoint_role_arn.is_none());
    assert_eq!(config.export.initial_position, InitialPosition::Epoch);
    assert_eq!(config.export.max_part_bytes, 1_048_576);
    assert_eq!(config.export.max_duration_hours, 3);
    // unset sections fall back to defaults
    assert!(!config.logging.local_enabled);

    std::env::remove_var("EVENTVAULT_IT_CLIENT_SECRET");
}

#[test]
fn missing_substitution_variable_is_rejected() {
    std::env::remove_var("EVENTVAULT_IT_UNSET_SECRET");
    let file = write_config(
        r#"
[query]
tenant = "acme01"

[oauth]
token_url = "https://sso.example.com/oauth2/token"
client_id = "client"
client_secret = "${EVENTVAULT_IT_UNSET_SECRET}"
scope = "s"
resource_urn = "urn:example"

[storage]
region = "us-east-1"
data_bucket = "d"
checkpoint_bucket = "c"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("EVENTVAULT_IT_UNSET_SECRET"));
}

#[test]
fn validation_failure_surfaces_section_and_field() {
    let file = write_config(
        r#"
[query]
tenant = ""

[oauth]
token_url = "https://sso.example.com/oauth2/token"
client_id = "client"
client_secret = "secret"
scope = "s"
resource_urn = "urn:example"

[storage]
region = "us-east-1"
data_bucket = "d"
checkpoint_bucket = "c"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("query.tenant"));
}

#[test]
fn env_override_wins_over_file_value() {
    // staging_dir is not asserted by any other test in this binary, so the
    // override cannot race with tests running in parallel
    std::env::set_var("EVENTVAULT_EXPORT_STAGING_DIR", "/var/tmp/eventvault-override");
    let file = write_config(
        r#"
[query]
tenant = "acme01"

[oauth]
token_url = "https://sso.example.com/oauth2/token"
client_id = "client"
client_secret = "secret"
scope = "s"
resource_urn = "urn:example"

[storage]
region = "us-east-1"
data_bucket = "d"
checkpoint_bucket = "c"

[export]
staging_dir = "/tmp/from-file"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.export.staging_dir, "/var/tmp/eventvault-override");

    std::env::remove_var("EVENTVAULT_EXPORT_STAGING_DIR");
}
