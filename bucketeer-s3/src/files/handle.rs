//! Operations bound to one bucket

use bucketeer_core::{BucketStatus, StorageError, TimeUnit};
use std::path::Path;
use tokio::io::AsyncRead;

use super::MinioFiles;
use crate::storage::ObjectSummary;

/// [`MinioFiles`] with the bucket argument fixed
#[derive(Clone, Copy)]
pub struct BucketHandle<'a> {
    files: &'a MinioFiles,
    bucket: &'a str,
}

impl<'a> BucketHandle<'a> {
    pub(super) fn new(files: &'a MinioFiles, bucket: &'a str) -> Self {
        Self { files, bucket }
    }

    pub fn name(&self) -> &'a str {
        self.bucket
    }

    pub async fn ensure(&self, make_public: bool) -> Result<BucketStatus, StorageError> {
        self.files.ensure_bucket(self.bucket, make_public).await
    }

    pub async fn upload_file(
        &self,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<Option<String>, StorageError> {
        self.files.upload_file(self.bucket, key, path).await
    }

    pub async fn upload_handle(
        &self,
        key: &str,
        file: tokio::fs::File,
    ) -> Result<Option<String>, StorageError> {
        self.files.upload_handle(self.bucket, key, file).await
    }

    pub async fn put_stream(
        &self,
        key: &str,
        reader: impl AsyncRead + Send + 'static,
        total_size: u64,
        part_size: u64,
    ) -> Result<(), StorageError> {
        self.files
            .put_stream(self.bucket, key, reader, total_size, part_size)
            .await
    }

    pub async fn download_file(
        &self,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        self.files.download_file(self.bucket, key, path).await
    }

    pub async fn delete_file(&self, key: &str) -> Result<(), StorageError> {
        self.files.delete_file(self.bucket, key).await
    }

    pub async fn list_files(&self) -> Result<Vec<ObjectSummary>, StorageError> {
        self.files.list_files(self.bucket).await
    }

    pub async fn presigned_url(
        &self,
        key: &str,
        expiry: i64,
        unit: TimeUnit,
    ) -> Result<String, StorageError> {
        self.files
            .presigned_url(self.bucket, key, expiry, unit)
            .await
    }

    pub async fn public_url_for(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.files.public_url_for(self.bucket, key).await
    }
}
