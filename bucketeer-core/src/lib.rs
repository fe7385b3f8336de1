//! Core types for Bucketeer
//!
//! This crate provides the configuration, error taxonomy and bucket policy
//! helpers shared by the storage clients and the file façade.

pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::{ConfigError, MinioConfig};
pub use error::{ErrorCode, ErrorKind, StorageError};
pub use policy::{is_public_read, public_read_policy, public_read_policy_json};
pub use types::{
    check_part_size, part_size_for, validate_bucket_name, validate_object_key, BucketStatus, TimeUnit,
    DEFAULT_PART_SIZE, MAX_PART_SIZE, MAX_PRESIGN_EXPIRY, MIN_PART_SIZE,
};
