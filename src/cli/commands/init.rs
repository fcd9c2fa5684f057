//! Init command: write a starter configuration file

use clap::Args;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# eventvault configuration

[application]
log_level = "info"

[query]
tenant = "your-tenant"
# base_url = "https://your-tenant.apps.dynatrace.com"
page_size = 1000
max_polls = 100
request_timeout_millis = 300000

[oauth]
token_url = "https://sso.example.com/oauth2/token"
client_id = "your-client-id"
client_secret = "${EVENTVAULT_OAUTH_CLIENT_SECRET}"
scope = "storage:events:read"
resource_urn = "urn:example:tenant:your-tenant"

[storage]
region = "us-east-1"
data_bucket = "your-archive-bucket"
checkpoint_bucket = "your-checkpoint-bucket"
# endpoint = "http://localhost:4566"
# force_path_style = true
# data_role_arn = "arn:aws:iam::123456789012:role/archive-writer"
# checkpoint_role_arn = "arn:aws:iam::123456789012:role/checkpoint-writer"

[export]
staging_dir = "/tmp/eventvault"
max_part_bytes = 1073741824
initial_position = "lookback"
lookback_hours = 24
max_parallel = 4
max_duration_hours = 6
drain_delay_seconds = 60

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Output path for the configuration file
    #[arg(short, long, default_value = "eventvault.toml")]
    pub output: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Write the starter configuration, returning the exit code.
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let path = Path::new(&self.output);

        if path.exists() && !self.force {
            eprintln!(
                "Refusing to overwrite existing file {} (use --force)",
                path.display()
            );
            return Ok(1);
        }

        std::fs::write(path, SAMPLE_CONFIG)?;
        println!("Wrote starter configuration to {}", path.display());
        println!("Edit it, then check it with: eventvault validate-config");
        Ok(0)
    }
}
