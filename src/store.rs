use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

/// Boundary to the external document store. `list` returns up to
/// `limit` stable keys, `delete` of an absent key is a no-op, and no
/// retries happen at this layer.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn list(&self, limit: usize) -> WorkerResult<Vec<String>>;
    async fn fetch(&self, key: &str) -> WorkerResult<Vec<u8>>;
    async fn delete(&self, key: &str) -> WorkerResult<()>;
}

/// S3-backed document store. Credentials and region come from the
/// ambient AWS environment.
#[derive(Clone)]
pub struct BucketStore {
    client: Client,
    bucket: String,
}

impl BucketStore {
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self { client: Client::new(&config), bucket: bucket.into() }
    }
}

impl ObjectStore for BucketStore {
    async fn list(&self, limit: usize) -> WorkerResult<Vec<String>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(limit.min(i32::MAX as usize) as i32)
            .send()
            .await?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect();

        debug!(bucket = %self.bucket, count = keys.len(), "listed pending documents");

        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> WorkerResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|err| WorkerError::Store(Box::new(err)))?;

        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> WorkerResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        Ok(())
    }
}
