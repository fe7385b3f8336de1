//! AWS authentication for Bucketeer
//!
//! Implements AWS Signature Version 4 query presigning, used to mint
//! time-limited GET URLs.

pub mod presign;
pub mod sigv4;

pub use presign::{presign_get_url, PresignError, PresignRequest};
