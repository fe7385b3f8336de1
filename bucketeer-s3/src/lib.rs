//! MinIO file operations for Bucketeer
//!
//! This crate provides the [`MinioFiles`] façade over an S3-compatible
//! [`StorageClient`]: bucket provisioning, uploads that report a public URL
//! when the bucket is public-readable, and plain object operations.

pub mod files;
pub mod storage;

pub use files::{BucketHandle, MinioFiles};
pub use storage::{EphemeralStorage, ObjectReader, ObjectSummary, SdkStorage, StorageClient};

pub use bucketeer_core::{BucketStatus, MinioConfig, StorageError, TimeUnit};
