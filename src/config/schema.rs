//! Configuration schema types
//!
//! Root configuration structure mapped from the TOML file, with serde
//! defaults and post-load validation.

use crate::config::SecretString;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

/// Where a freshly-created checkpoint starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InitialPosition {
    /// Start a fixed number of hours behind "now" (incremental deployments)
    #[default]
    Lookback,
    /// Start at the Unix epoch (full-backfill deployments)
    Epoch,
}

/// Main exporter configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Query service settings
    pub query: QueryConfig,

    /// OAuth client-credentials settings for the query service
    pub oauth: OAuthConfig,

    /// Object storage settings (archives and checkpoints)
    pub storage: StorageConfig,

    /// Export pipeline settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VaultConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.query.validate()?;
        self.oauth.validate()?;
        self.storage.validate()?;
        self.export.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Query service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Tenant name; the service URL is derived from it unless base_url is set
    pub tenant: String,

    /// Explicit base URL override (tests, alternate deployments)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Records fetched per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum poll attempts per query before the poll budget is exhausted
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Timeout applied to each individual poll request
    #[serde(default = "default_request_timeout_millis")]
    pub request_timeout_millis: u64,
}

impl QueryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.tenant.is_empty() {
            return Err("query.tenant cannot be empty".to_string());
        }
        if let Some(ref base_url) = self.base_url {
            Url::parse(base_url)
                .map_err(|e| format!("query.base_url is not a valid URL: {e}"))?;
        }
        if self.page_size == 0 {
            return Err("query.page_size must be greater than zero".to_string());
        }
        if self.max_polls == 0 {
            return Err("query.max_polls must be greater than zero".to_string());
        }
        if self.request_timeout_millis == 0 {
            return Err("query.request_timeout_millis must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// OAuth client-credentials configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Token endpoint URL
    pub token_url: String,

    /// Client identifier
    pub client_id: String,

    /// Client secret; zeroized on drop, redacted from Debug output
    pub client_secret: SecretString,

    /// Requested scope
    pub scope: String,

    /// Resource URN the token is scoped to
    pub resource_urn: String,
}

impl OAuthConfig {
    fn validate(&self) -> Result<(), String> {
        Url::parse(&self.token_url)
            .map_err(|e| format!("oauth.token_url is not a valid URL: {e}"))?;
        if self.client_id.is_empty() {
            return Err("oauth.client_id cannot be empty".to_string());
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err("oauth.client_secret cannot be empty".to_string());
        }
        if self.resource_urn.is_empty() {
            return Err("oauth.resource_urn cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage region
    pub region: String,

    /// Bucket receiving archive parts
    pub data_bucket: String,

    /// Bucket holding checkpoint documents
    pub checkpoint_bucket: String,

    /// Alternate store endpoint (local stacks, private gateways)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Use path-style addressing (required by most alternate endpoints)
    #[serde(default)]
    pub force_path_style: bool,

    /// Delegated role assumed for archive uploads
    #[serde(default)]
    pub data_role_arn: Option<String>,

    /// Delegated role assumed for checkpoint access
    #[serde(default)]
    pub checkpoint_role_arn: Option<String>,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.region.is_empty() {
            return Err("storage.region cannot be empty".to_string());
        }
        if self.data_bucket.is_empty() {
            return Err("storage.data_bucket cannot be empty".to_string());
        }
        if self.checkpoint_bucket.is_empty() {
            return Err("storage.checkpoint_bucket cannot be empty".to_string());
        }
        if let Some(ref endpoint) = self.endpoint {
            Url::parse(endpoint)
                .map_err(|e| format!("storage.endpoint is not a valid URL: {e}"))?;
        }
        Ok(())
    }
}

/// Export pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory for archive staging files
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,

    /// Size threshold at which an archive part is sealed and a new one opened
    #[serde(default = "default_max_part_bytes")]
    pub max_part_bytes: u64,

    /// Where a freshly-created checkpoint starts
    #[serde(default)]
    pub initial_position: InitialPosition,

    /// Lookback for new checkpoints when initial_position = "lookback"
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,

    /// Upper bound on concurrently running integration pipelines
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Overall run deadline, in hours
    #[serde(default = "default_max_duration_hours")]
    pub max_duration_hours: u64,

    /// Delay after the worker pool drains, letting run telemetry settle
    #[serde(default = "default_drain_delay_seconds")]
    pub drain_delay_seconds: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            max_part_bytes: default_max_part_bytes(),
            initial_position: InitialPosition::default(),
            lookback_hours: default_lookback_hours(),
            max_parallel: default_max_parallel(),
            max_duration_hours: default_max_duration_hours(),
            drain_delay_seconds: default_drain_delay_seconds(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.staging_dir.is_empty() {
            return Err("export.staging_dir cannot be empty".to_string());
        }
        if self.max_part_bytes == 0 {
            return Err("export.max_part_bytes must be greater than zero".to_string());
        }
        if self.initial_position == InitialPosition::Lookback && self.lookback_hours == 0 {
            return Err(
                "export.lookback_hours must be greater than zero when initial_position = 'lookback'"
                    .to_string(),
            );
        }
        if self.max_parallel == 0 {
            return Err("export.max_parallel must be greater than zero".to_string());
        }
        if self.max_duration_hours == 0 {
            return Err("export.max_duration_hours must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to a local rolling file in addition to the console
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for local log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy: "daily" or "hourly"
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_max_polls() -> u32 {
    100
}

fn default_request_timeout_millis() -> u64 {
    300_000
}

fn default_staging_dir() -> String {
    "/tmp/eventvault".to_string()
}

fn default_max_part_bytes() -> u64 {
    1024 * 1024 * 1024
}

fn default_lookback_hours() -> u32 {
    24
}

fn default_max_parallel() -> usize {
    4
}

fn default_max_duration_hours() -> u64 {
    6
}

fn default_drain_delay_seconds() -> u64 {
    60
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}
