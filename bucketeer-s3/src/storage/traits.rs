//! Storage client trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncRead;

pub use bucketeer_core::StorageError;

/// Byte source for a streamed upload
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Summary of an object in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// An S3-compatible object store.
///
/// Every call is a remote round trip; dropping the returned future cancels it.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Check if a bucket exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;

    /// Create a bucket. Fails with `BucketAlreadyExists` if it is already there.
    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Installed bucket policy, `None` when the bucket has no policy
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, StorageError>;

    /// Install a bucket policy, replacing any previous one
    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError>;

    /// Upload a local file
    async fn upload_object(&self, bucket: &str, key: &str, path: &Path)
        -> Result<(), StorageError>;

    /// Upload exactly `total_size` bytes read from `reader`, in parts of `part_size`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        reader: ObjectReader,
        total_size: u64,
        part_size: u64,
    ) -> Result<(), StorageError>;

    /// Download an object into a local file
    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError>;

    /// Remove an object. Removing a missing key succeeds.
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Lazily list the objects of a bucket, in the order the server returns them.
    ///
    /// With `recursive`, keys under every prefix are flattened into the listing;
    /// otherwise only keys without a `/` are returned.
    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        recursive: bool,
    ) -> BoxStream<'a, Result<ObjectSummary, StorageError>>;

    /// URL granting anonymous GET access to an object for `expiry`
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, StorageError>;
}
