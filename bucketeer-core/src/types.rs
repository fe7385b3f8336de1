//! Bucket names, object keys, part sizes and expiry units

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::StorageError;

/// Smallest part size S3 accepts for a multipart upload
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Largest part size S3 accepts for a multipart upload
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Part size used when the caller does not choose one
pub const DEFAULT_PART_SIZE: u64 = 16 * 1024 * 1024;

const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024 * 1024;
const MAX_PARTS: u64 = 10_000;

/// Longest validity S3 allows for a presigned URL
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Outcome of ensuring a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    Exists,
}

/// Check a bucket name against the S3 naming rules
pub fn validate_bucket_name(bucket: &str) -> Result<(), StorageError> {
    let invalid = || StorageError::InvalidBucketName(bucket.to_string());

    if !(3..=63).contains(&bucket.len()) {
        return Err(invalid());
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-';
    if !bucket.chars().all(allowed) {
        return Err(invalid());
    }

    let edge = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge(bucket.chars().next()) || !edge(bucket.chars().last()) {
        return Err(invalid());
    }

    if bucket.contains("..") || bucket.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid());
    }

    Ok(())
}

pub fn validate_object_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidArgument(
            "object key must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Check the sizes of a streamed upload before any byte is sent
pub fn check_part_size(total_size: u64, part_size: u64) -> Result<(), StorageError> {
    if part_size < MIN_PART_SIZE {
        return Err(StorageError::InvalidArgument(format!(
            "part size {part_size} is not supported; minimum allowed 5MiB"
        )));
    }
    if part_size > MAX_PART_SIZE {
        return Err(StorageError::InvalidArgument(format!(
            "part size {part_size} is not supported; maximum allowed 5GiB"
        )));
    }
    if total_size > MAX_OBJECT_SIZE {
        return Err(StorageError::InvalidArgument(format!(
            "object size {total_size} is not supported; maximum allowed 5TiB"
        )));
    }
    if total_size.div_ceil(part_size) > MAX_PARTS {
        return Err(StorageError::InvalidArgument(format!(
            "object size {total_size} and part size {part_size} make more than {MAX_PARTS} parts"
        )));
    }
    Ok(())
}

/// Part size for an upload of `total_size` bytes that stays under the part-count limit
pub fn part_size_for(total_size: u64) -> u64 {
    let needed = total_size.div_ceil(MAX_PARTS).div_ceil(MIN_PART_SIZE) * MIN_PART_SIZE;
    DEFAULT_PART_SIZE.max(needed)
}

/// Unit of a presigned URL expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn millis(self) -> u64 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }

    /// Convert `count` units into a duration. Non-positive counts are rejected.
    pub fn duration(self, count: i64) -> Result<Duration, StorageError> {
        if count <= 0 {
            return Err(StorageError::InvalidArgument(format!(
                "expiry must be positive, got {count} {self}"
            )));
        }

        count
            .unsigned_abs()
            .checked_mul(self.millis())
            .map(Duration::from_millis)
            .ok_or_else(|| StorageError::InvalidArgument(format!("expiry {count} {self} overflows")))
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Milliseconds => "milliseconds",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        };
        f.write_str(name)
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ms" | "millis" | "milliseconds" => Ok(Self::Milliseconds),
            "s" | "sec" | "secs" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "mins" | "minutes" => Ok(Self::Minutes),
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            other => Err(format!("unknown time unit '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bucket_names() {
        for name in ["media", "my-test-bucket-123", "my.bucket.name", "abc"] {
            assert!(validate_bucket_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_bucket_names() {
        let too_long = "a".repeat(64);
        for name in [
            "",
            "ab",
            too_long.as_str(),
            "Media",
            "under_score",
            "-leading",
            "trailing.",
            "double..dot",
            "192.168.1.10",
        ] {
            assert!(
                matches!(validate_bucket_name(name), Err(StorageError::InvalidBucketName(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(validate_object_key("a/b.png").is_ok());
        assert!(matches!(
            validate_object_key(""),
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_part_size_bounds() {
        assert!(check_part_size(5, MIN_PART_SIZE).is_ok());
        assert!(check_part_size(MIN_PART_SIZE * 3, MIN_PART_SIZE).is_ok());
        assert!(check_part_size(5, MIN_PART_SIZE - 1).is_err());
        assert!(check_part_size(5, MAX_PART_SIZE + 1).is_err());
        assert!(check_part_size(MIN_PART_SIZE * (MAX_PARTS + 1), MIN_PART_SIZE).is_err());
    }

    #[test]
    fn test_part_size_for_large_objects() {
        assert_eq!(part_size_for(0), DEFAULT_PART_SIZE);
        assert_eq!(part_size_for(1024), DEFAULT_PART_SIZE);

        let huge = 1024 * 1024 * 1024 * 1024;
        let part_size = part_size_for(huge);
        assert_eq!(part_size % MIN_PART_SIZE, 0);
        assert!(check_part_size(huge, part_size).is_ok());
    }

    #[test]
    fn test_duration_conversion() {
        assert_eq!(TimeUnit::Seconds.duration(60).unwrap(), Duration::from_secs(60));
        assert_eq!(TimeUnit::Minutes.duration(2).unwrap(), Duration::from_secs(120));
        assert_eq!(TimeUnit::Days.duration(7).unwrap(), MAX_PRESIGN_EXPIRY);
        assert_eq!(
            TimeUnit::Milliseconds.duration(1500).unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        assert!(matches!(
            TimeUnit::Seconds.duration(0),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(matches!(
            TimeUnit::Hours.duration(-3),
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_time_unit() {
        assert_eq!("SECONDS".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert_eq!("h".parse::<TimeUnit>().unwrap(), TimeUnit::Hours);
        assert!("fortnights".parse::<TimeUnit>().is_err());
    }
}
