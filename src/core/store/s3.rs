//! S3 implementation of the object-store contract
//!
//! The AWS SDK is async while the lifecycle core blocks, so the store
//! owns a small current-thread runtime and drives each call to
//! completion. Credentials and region come from the default provider
//! chain.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::fs;
use std::path::Path;

use super::error::{StoreError, StoreResult};
use super::{object_key, ObjectMeta, ObjectStore};

pub struct S3Store {
    client: Client,
    bucket: String,
    runtime: tokio::runtime::Runtime,
}

impl S3Store {
    pub fn new(bucket: impl Into<String>) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let config =
            runtime.block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
        Ok(Self {
            client: Client::new(&config),
            bucket: bucket.into(),
            runtime,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl ObjectStore for S3Store {
    fn put(&self, local_path: &Path, backup_time: &str) -> StoreResult<()> {
        let key = object_key(local_path)?;
        let body = self
            .runtime
            .block_on(ByteStream::from_path(local_path))
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&key)
                    .metadata("backup_time", backup_time)
                    .body(body)
                    .send(),
            )
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(())
    }

    fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        let result = self.runtime.block_on(
            self.client
                .head_object()
                .bucket(&self.bucket)
                .key(key)
                .send(),
        );

        match result {
            Ok(output) => {
                let backup_time = output
                    .metadata()
                    .and_then(|meta| meta.get("backup_time"))
                    .cloned();
                Ok(Some(ObjectMeta { backup_time }))
            }
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(None)
                } else {
                    Err(StoreError::Transport(err.to_string()))
                }
            }
        }
    }

    fn get(&self, key: &str, local_path: &Path) -> StoreResult<bool> {
        let result = self.runtime.block_on(
            self.client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send(),
        );

        match result {
            Ok(output) => {
                let data = self
                    .runtime
                    .block_on(output.body.collect())
                    .map_err(|e| StoreError::Transport(e.to_string()))?;
                fs::write(local_path, data.into_bytes())?;
                Ok(true)
            }
            Err(err) => {
                let absent = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if absent {
                    Ok(false)
                } else {
                    Err(StoreError::Transport(err.to_string()))
                }
            }
        }
    }
}
