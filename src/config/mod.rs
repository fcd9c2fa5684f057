//! Configuration management

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, ExportConfig, InitialPosition, LoggingConfig, OAuthConfig, QueryConfig,
    StorageConfig, VaultConfig,
};
pub use secret::{secret_from, SecretString, SecretValue};
