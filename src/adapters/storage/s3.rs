//! S3-backed object store
//!
//! Builds S3 clients honoring the optional endpoint override, path-style
//! toggle and delegated-role credentials, and implements the opaque
//! [`ObjectStore`] interface over one bucket.

use super::traits::ObjectStore;
use crate::config::StorageConfig;
use crate::domain::{Result, StorageError};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

/// Session name recorded when assuming a delegated role.
const ROLE_SESSION_NAME: &str = "eventvault-export-session";

/// Build an S3 client for the configured store.
///
/// When `role_arn` is set, credentials come from assuming that role on top
/// of the ambient credential chain (the data and checkpoint buckets may use
/// different roles).
pub async fn build_client(config: &StorageConfig, role_arn: Option<&str>) -> Client {
    let region = Region::new(config.region.clone());

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());
    if let Some(arn) = role_arn {
        let provider = aws_config::sts::AssumeRoleProvider::builder(arn)
            .region(region)
            .session_name(ROLE_SESSION_NAME)
            .build()
            .await;
        loader = loader.credentials_provider(provider);
    }
    let shared = loader.load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared);
    if let Some(ref endpoint) = config.endpoint {
        builder = builder.endpoint_url(endpoint);
    }
    if config.force_path_style {
        builder = builder.force_path_style(true);
    }

    Client::from_conf(builder.build())
}

/// [`ObjectStore`] over a single S3 bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let body = ByteStream::from_path(path).await.map_err(|e| {
            StorageError::Upload {
                key: key.to_string(),
                message: format!("failed to read staging file {}: {e}", path.display()),
            }
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: format!("{}", DisplayErrorContext(&e)),
            })?;

        Ok(())
    }

    async fn put_bytes(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: format!("{}", DisplayErrorContext(&e)),
            })?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let data = output.body.collect().await.map_err(|e| {
                    StorageError::Download {
                        key: key.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Some(data.into_bytes().to_vec()))
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    == Some(true)
                {
                    return Ok(None);
                }
                Err(StorageError::Download {
                    key: key.to_string(),
                    message: format!("{}", DisplayErrorContext(&err)),
                }
                .into())
            }
        }
    }

    async fn list(&self, prefix: &str, max: usize) -> Result<Vec<String>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| StorageError::List {
                prefix: prefix.to_string(),
                message: format!("{}", DisplayErrorContext(&e)),
            })?;

        let mut entries: Vec<(String, i64)> = response
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let modified = object.last_modified().map(|t| t.secs()).unwrap_or(0);
                Some((key, modified))
            })
            .collect();

        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(entries.into_iter().take(max).map(|(key, _)| key).collect())
    }
}
