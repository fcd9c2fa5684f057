//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{InitialPosition, VaultConfig};
use crate::config::secret::secret_from;
use crate::domain::errors::ExportError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into VaultConfig
/// 4. Applies environment variable overrides (EVENTVAULT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, TOML parsing fails, a
/// referenced environment variable is missing, or validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<VaultConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ExportError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ExportError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: VaultConfig = toml::from_str(&contents)
        .map_err(|e| ExportError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        ExportError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. Missing variables are collected and
/// reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ExportError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the EVENTVAULT_* prefix
///
/// Variables follow the pattern EVENTVAULT_<SECTION>_<KEY>, for example
/// EVENTVAULT_QUERY_TENANT or EVENTVAULT_STORAGE_DATA_BUCKET.
fn apply_env_overrides(config: &mut VaultConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("EVENTVAULT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Query overrides
    if let Ok(val) = std::env::var("EVENTVAULT_QUERY_TENANT") {
        config.query.tenant = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_QUERY_BASE_URL") {
        config.query.base_url = Some(val);
    }
    if let Ok(val) = std::env::var("EVENTVAULT_QUERY_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.query.page_size = size;
        }
    }
    if let Ok(val) = std::env::var("EVENTVAULT_QUERY_MAX_POLLS") {
        if let Ok(polls) = val.parse() {
            config.query.max_polls = polls;
        }
    }
    if let Ok(val) = std::env::var("EVENTVAULT_QUERY_REQUEST_TIMEOUT_MILLIS") {
        if let Ok(millis) = val.parse() {
            config.query.request_timeout_millis = millis;
        }
    }

    // OAuth overrides
    if let Ok(val) = std::env::var("EVENTVAULT_OAUTH_TOKEN_URL") {
        config.oauth.token_url = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_OAUTH_CLIENT_ID") {
        config.oauth.client_id = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_OAUTH_CLIENT_SECRET") {
        config.oauth.client_secret = secret_from(val);
    }
    if let Ok(val) = std::env::var("EVENTVAULT_OAUTH_SCOPE") {
        config.oauth.scope = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_OAUTH_RESOURCE_URN") {
        config.oauth.resource_urn = val;
    }

    // Storage overrides
    if let Ok(val) = std::env::var("EVENTVAULT_STORAGE_REGION") {
        config.storage.region = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_STORAGE_DATA_BUCKET") {
        config.storage.data_bucket = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_STORAGE_CHECKPOINT_BUCKET") {
        config.storage.checkpoint_bucket = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_STORAGE_ENDPOINT") {
        config.storage.endpoint = Some(val);
    }
    if let Ok(val) = std::env::var("EVENTVAULT_STORAGE_FORCE_PATH_STYLE") {
        config.storage.force_path_style = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("EVENTVAULT_STORAGE_DATA_ROLE_ARN") {
        config.storage.data_role_arn = Some(val);
    }
    if let Ok(val) = std::env::var("EVENTVAULT_STORAGE_CHECKPOINT_ROLE_ARN") {
        config.storage.checkpoint_role_arn = Some(val);
    }

    // Export overrides
    if let Ok(val) = std::env::var("EVENTVAULT_EXPORT_STAGING_DIR") {
        config.export.staging_dir = val;
    }
    if let Ok(val) = std::env::var("EVENTVAULT_EXPORT_INITIAL_POSITION") {
        match val.to_lowercase().as_str() {
            "lookback" => config.export.initial_position = InitialPosition::Lookback,
            "epoch" => config.export.initial_position = InitialPosition::Epoch,
            _ => {}
        }
    }
    if let Ok(val) = std::env::var("EVENTVAULT_EXPORT_LOOKBACK_HOURS") {
        if let Ok(hours) = val.parse() {
            config.export.lookback_hours = hours;
        }
    }
    if let Ok(val) = std::env::var("EVENTVAULT_EXPORT_MAX_PARALLEL") {
        if let Ok(parallel) = val.parse() {
            config.export.max_parallel = parallel;
        }
    }
    if let Ok(val) = std::env::var("EVENTVAULT_EXPORT_MAX_DURATION_HOURS") {
        if let Ok(hours) = val.parse() {
            config.export.max_duration_hours = hours;
        }
    }
    if let Ok(val) = std::env::var("EVENTVAULT_EXPORT_DRAIN_DELAY_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.export.drain_delay_seconds = secs;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("EVENTVAULT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("EVENTVAULT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("EVENTVAULT_TEST_VAR", "test_value");
        let input = "client_secret = \"${EVENTVAULT_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "client_secret = \"test_value\"\n");
        std::env::remove_var("EVENTVAULT_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("EVENTVAULT_MISSING_VAR");
        let input = "client_secret = \"${EVENTVAULT_MISSING_VAR}\"";
        assert!(substitute_env_vars(input).is_err());
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# uses ${EVENTVAULT_UNSET_COMMENT_VAR}\ntenant = \"t\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${EVENTVAULT_UNSET_COMMENT_VAR}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("nonexistent.toml").is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[query]
tenant = "acme01"

[oauth]
token_url = "https://sso.example.com/oauth2/token"
client_id = "client"
client_secret = "secret"
scope = "storage:events:read"
resource_urn = "urn:example:tenant:acme01"

[storage]
region = "us-east-1"
data_bucket = "events-archive"
checkpoint_bucket = "events-checkpoints"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.query.tenant, "acme01");
        assert_eq!(config.query.page_size, 1000);
        assert_eq!(config.storage.data_bucket, "events-archive");
    }
}
