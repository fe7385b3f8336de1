//! In-memory ephemeral storage client

use super::stream::{ensure_exhausted, read_part};
use super::traits::*;
use async_trait::async_trait;
use bucketeer_auth::{presign_get_url, PresignRequest};
use bucketeer_core::{check_part_size, validate_bucket_name, validate_object_key, MinioConfig};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use md5::{Digest, Md5};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// In-memory stored object
struct InMemoryObject {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

/// In-memory bucket
struct InMemoryBucket {
    objects: DashMap<String, InMemoryObject>,
    policy: RwLock<Option<String>>,
}

impl InMemoryBucket {
    fn new() -> Self {
        Self {
            objects: DashMap::new(),
            policy: RwLock::new(None),
        }
    }
}

/// Credentials used to sign presigned URLs
struct Signer {
    endpoint: String,
    region: String,
    access_key: String,
    secret_key: String,
}

/// Ephemeral (in-memory) storage client.
///
/// Behaves like a single MinIO server: policies are re-serialized when stored,
/// listings come back in key order, and presigned URLs are SigV4-signed.
pub struct EphemeralStorage {
    buckets: DashMap<String, Arc<InMemoryBucket>>,
    signer: Signer,
}

impl Default for EphemeralStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralStorage {
    pub fn new() -> Self {
        Self::with_config(&MinioConfig::new(
            "http://localhost:9000",
            "minioadmin",
            "minioadmin",
        ))
    }

    /// Sign presigned URLs with the endpoint and credentials of `config`
    pub fn with_config(config: &MinioConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            signer: Signer {
                endpoint: config.endpoint.clone(),
                region: config.region.clone(),
                access_key: config.access_key.clone(),
                secret_key: config.secret_key.clone(),
            },
        }
    }

    fn compute_etag(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        format!("\"{}\"", hex::encode(hasher.finalize()))
    }

    fn bucket(&self, bucket: &str) -> Result<Arc<InMemoryBucket>, StorageError> {
        self.buckets
            .get(bucket)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))
    }

    fn store(&self, bucket: &InMemoryBucket, key: &str, data: Bytes) {
        let etag = Self::compute_etag(&data);
        bucket.objects.insert(
            key.to_string(),
            InMemoryObject {
                data,
                etag,
                last_modified: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl StorageClient for EphemeralStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        validate_bucket_name(bucket)?;
        match self.buckets.entry(bucket.to_string()) {
            Entry::Occupied(_) => Err(StorageError::BucketAlreadyExists(bucket.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(InMemoryBucket::new()));
                Ok(())
            }
        }
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        let bucket_ref = self.bucket(bucket)?;
        let policy = bucket_ref.policy.read().clone();
        Ok(policy)
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError> {
        let bucket_ref = self.bucket(bucket)?;

        // An empty policy removes the installed one
        if policy.trim().is_empty() {
            *bucket_ref.policy.write() = None;
            return Ok(());
        }

        let parsed: serde_json::Value =
            serde_json::from_str(policy).map_err(|e| StorageError::Policy {
                bucket: bucket.to_string(),
                message: format!("policy has invalid JSON: {e}"),
            })?;
        if !parsed.is_object() {
            return Err(StorageError::Policy {
                bucket: bucket.to_string(),
                message: "policy must be a JSON object".to_string(),
            });
        }

        // Stored in the server's own serialization, not the caller's text
        *bucket_ref.policy.write() = Some(parsed.to_string());
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        validate_object_key(key)?;
        let bucket_ref = self.bucket(bucket)?;
        let data = tokio::fs::read(path).await?;
        self.store(&bucket_ref, key, Bytes::from(data));
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        reader: ObjectReader,
        total_size: u64,
        part_size: u64,
    ) -> Result<(), StorageError> {
        check_part_size(total_size, part_size)?;
        validate_object_key(key)?;
        let bucket_ref = self.bucket(bucket)?;

        let mut reader = reader;
        let data = read_part(&mut reader, total_size).await?;
        ensure_exhausted(&mut reader, total_size).await?;

        self.store(&bucket_ref, key, Bytes::from(data));
        Ok(())
    }

    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        let bucket_ref = self.bucket(bucket)?;
        let data = bucket_ref
            .objects
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;

        tokio::fs::write(path, &data).await?;
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let bucket_ref = self.bucket(bucket)?;
        bucket_ref.objects.remove(key);
        Ok(())
    }

    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        recursive: bool,
    ) -> BoxStream<'a, Result<ObjectSummary, StorageError>> {
        let bucket_ref = match self.bucket(bucket) {
            Ok(bucket_ref) => bucket_ref,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let mut objects: Vec<ObjectSummary> = bucket_ref
            .objects
            .iter()
            .filter(|entry| recursive || !entry.key().contains('/'))
            .map(|entry| ObjectSummary {
                key: entry.key().clone(),
                size: entry.data.len() as u64,
                last_modified: Some(entry.last_modified),
                etag: Some(entry.etag.clone()),
            })
            .collect();

        // Sort by key
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        stream::iter(objects.into_iter().map(Ok)).boxed()
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, StorageError> {
        validate_object_key(key)?;
        self.bucket(bucket)?;

        presign_get_url(&PresignRequest {
            endpoint: &self.signer.endpoint,
            region: &self.signer.region,
            access_key: &self.signer.access_key,
            secret_key: &self.signer.secret_key,
            bucket,
            key,
            expires_in: expiry,
            signed_at: Utc::now(),
        })
        .map_err(|e| StorageError::InvalidArgument(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_operations() {
        let storage = EphemeralStorage::new();

        // Create bucket
        storage.make_bucket("test-bucket").await.unwrap();
        assert!(storage.bucket_exists("test-bucket").await.unwrap());

        // Creating again reports the conflict
        let err = storage.make_bucket("test-bucket").await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_policy_is_reserialized() {
        let storage = EphemeralStorage::new();
        storage.make_bucket("test-bucket").await.unwrap();

        let text = "{ \"Version\" : \"2012-10-17\",\n  \"Statement\" : [ ] }";
        storage.set_bucket_policy("test-bucket", text).await.unwrap();

        let stored = storage.get_bucket_policy("test-bucket").await.unwrap().unwrap();
        assert_ne!(stored, text);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&stored).unwrap(),
            serde_json::from_str::<serde_json::Value>(text).unwrap()
        );
    }
}
