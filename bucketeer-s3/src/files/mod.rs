//! File operations over a storage client
//!
//! [`MinioFiles`] is returned only after the default bucket has been
//! provisioned, so no operation can run against a half-initialized store.

mod handle;


pub use handle::BucketHandle;

use bucketeer_core::{
    is_public_read, part_size_for, public_read_policy_json, BucketStatus, MinioConfig,
    StorageError, TimeUnit,
};
use futures::TryStreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, error, info};

use crate::storage::{ObjectSummary, SdkStorage, StorageClient};

/// Bucket and object operations with a preconfigured default bucket
#[derive(Clone)]
pub struct MinioFiles {
    config: Arc<MinioConfig>,
    storage: Arc<dyn StorageClient>,
}

impl MinioFiles {
    /// Provision the default bucket and return the ready façade.
    ///
    /// The default bucket is created if missing and made public-readable.
    /// A provisioning failure is logged and the façade is still returned,
    /// unless `strict_startup` is set, in which case the failure is returned.
    pub async fn start(
        config: MinioConfig,
        storage: Arc<dyn StorageClient>,
    ) -> Result<Self, StorageError> {
        let files = Self {
            config: Arc::new(config),
            storage,
        };

        let bucket = files.config.default_bucket_name.as_str();
        if let Err(e) = files.ensure_bucket(bucket, true).await {
            if files.config.strict_startup {
                return Err(e);
            }
            error!(bucket = %bucket, error = %e, "Failed to create default bucket");
        }

        Ok(files)
    }

    /// Validate `config`, connect to its endpoint and start
    pub async fn connect(config: MinioConfig) -> Result<Self, StorageError> {
        config.validate()?;
        let storage = Arc::new(SdkStorage::new(&config));
        Self::start(config, storage).await
    }

    pub fn config(&self) -> &MinioConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    /// Operations bound to `bucket`
    pub fn bucket<'a>(&'a self, bucket: &'a str) -> BucketHandle<'a> {
        BucketHandle::new(self, bucket)
    }

    /// Operations bound to the configured default bucket
    pub fn default_bucket(&self) -> BucketHandle<'_> {
        BucketHandle::new(self, &self.config.default_bucket_name)
    }

    /// Create `bucket` if it does not exist and, with `make_public`, install
    /// the public-read policy. Safe to repeat.
    pub async fn ensure_bucket(
        &self,
        bucket: &str,
        make_public: bool,
    ) -> Result<BucketStatus, StorageError> {
        let status = if self.storage.bucket_exists(bucket).await? {
            info!(bucket = %bucket, "Bucket already exists");
            BucketStatus::Exists
        } else {
            match self.storage.make_bucket(bucket).await {
                Ok(()) => {
                    info!(bucket = %bucket, "Bucket created");
                    BucketStatus::Created
                }
                // Lost a creation race against another process
                Err(e) if e.is_already_exists() => {
                    info!(bucket = %bucket, "Bucket already exists");
                    BucketStatus::Exists
                }
                Err(e) => return Err(e),
            }
        };

        if make_public {
            self.storage
                .set_bucket_policy(bucket, &public_read_policy_json(bucket))
                .await?;
            debug!(bucket = %bucket, "Public-read policy installed");
        }

        Ok(status)
    }

    /// Upload a local file. Returns the public URL of the object when the
    /// bucket is public-readable, `None` otherwise.
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<Option<String>, StorageError> {
        self.storage
            .upload_object(bucket, key, path.as_ref())
            .await?;
        info!(bucket = %bucket, key = %key, "File uploaded");

        self.public_url_for(bucket, key).await
    }

    /// Upload an open file. Returns the public URL as [`MinioFiles::upload_file`] does.
    pub async fn upload_handle(
        &self,
        bucket: &str,
        key: &str,
        file: tokio::fs::File,
    ) -> Result<Option<String>, StorageError> {
        let total_size = file.metadata().await?.len();
        self.storage
            .put_object(bucket, key, Box::pin(file), total_size, part_size_for(total_size))
            .await?;
        info!(bucket = %bucket, key = %key, "File uploaded");

        self.public_url_for(bucket, key).await
    }

    /// Upload `total_size` bytes from `reader` in parts of `part_size`.
    ///
    /// Never resolves a public URL; use [`MinioFiles::public_url_for`] when needed.
    pub async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        reader: impl AsyncRead + Send + 'static,
        total_size: u64,
        part_size: u64,
    ) -> Result<(), StorageError> {
        self.storage
            .put_object(bucket, key, Box::pin(reader), total_size, part_size)
            .await?;
        info!(bucket = %bucket, key = %key, total_size, "File updated");
        Ok(())
    }

    pub async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        self.storage
            .download_object(bucket, key, path.as_ref())
            .await?;
        info!(bucket = %bucket, key = %key, "File downloaded");
        Ok(())
    }

    pub async fn delete_file(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.storage.remove_object(bucket, key).await?;
        info!(bucket = %bucket, key = %key, "File deleted");
        Ok(())
    }

    /// Every object of `bucket`, including those under nested prefixes, in
    /// server order
    pub async fn list_files(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        self.storage.list_objects(bucket, true).try_collect().await
    }

    /// Temporary GET URL for an object, valid for `expiry` `unit`s
    pub async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: i64,
        unit: TimeUnit,
    ) -> Result<String, StorageError> {
        let expiry = unit.duration(expiry)?;
        debug!(bucket = %bucket, key = %key, expiry_secs = expiry.as_secs(), "Presigning GET URL");
        self.storage.presigned_get_url(bucket, key, expiry).await
    }

    /// The public URL of `bucket/key` if the bucket's installed policy is the
    /// public-read policy, `None` otherwise. Costs one policy read.
    pub async fn public_url_for(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        let Some(policy) = self.storage.get_bucket_policy(bucket).await? else {
            debug!(bucket = %bucket, "Bucket has no policy");
            return Ok(None);
        };

        if !is_public_read(bucket, &policy) {
            debug!(bucket = %bucket, "Bucket policy is not public-read");
            return Ok(None);
        }

        Ok(Some(self.public_url(bucket, key)))
    }

    /// `endpoint/bucket/key`, concatenated as-is: the endpoint is not
    /// normalized and the key is not URL-encoded
    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.config.endpoint, bucket, key)
    }
}
