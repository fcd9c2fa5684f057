//! Validate-config command

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Validate the configuration file, returning the process exit code.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match load_config(config_path) {
            Ok(config) => {
                println!("Configuration is valid: {config_path}");
                println!("  tenant: {}", config.query.tenant);
                println!("  data bucket: {}", config.storage.data_bucket);
                println!("  checkpoint bucket: {}", config.storage.checkpoint_bucket);
                println!("  max parallel: {}", config.export.max_parallel);
                Ok(0)
            }
            Err(e) => {
                eprintln!("Configuration is invalid: {e}");
                Ok(1)
            }
        }
    }
}
