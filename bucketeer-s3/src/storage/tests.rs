//! Tests for the in-memory storage client

use super::*;
use bucketeer_core::{public_read_policy_json, MinioConfig, MIN_PART_SIZE};
use futures::TryStreamExt;
use std::io::Cursor;
use std::time::Duration;

/// Test helper to create storage
fn storage() -> EphemeralStorage {
    EphemeralStorage::new()
}

fn reader(data: &[u8]) -> ObjectReader {
    Box::pin(Cursor::new(data.to_vec()))
}

async fn put(s: &EphemeralStorage, bucket: &str, key: &str, data: &[u8]) {
    s.put_object(bucket, key, reader(data), data.len() as u64, MIN_PART_SIZE)
        .await
        .unwrap();
}

async fn list(s: &EphemeralStorage, bucket: &str, recursive: bool) -> Vec<String> {
    s.list_objects(bucket, recursive)
        .map_ok(|o| o.key)
        .try_collect()
        .await
        .unwrap()
}

// =============================================================================
// BUCKET OPERATIONS
// =============================================================================

mod bucket_tests {
    use super::*;

    #[tokio::test]
    async fn test_make_bucket() {
        let s = storage();
        assert!(!s.bucket_exists("my-bucket").await.unwrap());
        s.make_bucket("my-bucket").await.unwrap();
        assert!(s.bucket_exists("my-bucket").await.unwrap());
    }

    #[tokio::test]
    async fn test_make_bucket_already_exists() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        let result = s.make_bucket("my-bucket").await;
        assert!(matches!(result, Err(StorageError::BucketAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_make_bucket_invalid_name() {
        let s = storage();
        let result = s.make_bucket("My_Bucket").await;
        assert!(matches!(result, Err(StorageError::InvalidBucketName(_))));
        assert!(!s.bucket_exists("My_Bucket").await.unwrap());
    }
}

// =============================================================================
// POLICY OPERATIONS
// =============================================================================

mod policy_tests {
    use super::*;

    #[tokio::test]
    async fn test_new_bucket_has_no_policy() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        assert_eq!(s.get_bucket_policy("my-bucket").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_get_policy() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        let policy = public_read_policy_json("my-bucket");
        s.set_bucket_policy("my-bucket", &policy).await.unwrap();

        let stored = s.get_bucket_policy("my-bucket").await.unwrap().unwrap();
        assert!(bucketeer_core::is_public_read("my-bucket", &stored));
    }

    #[tokio::test]
    async fn test_empty_policy_removes() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        s.set_bucket_policy("my-bucket", &public_read_policy_json("my-bucket"))
            .await
            .unwrap();

        s.set_bucket_policy("my-bucket", "").await.unwrap();
        assert_eq!(s.get_bucket_policy("my-bucket").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_policy() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        for text in ["{not json", "[1, 2]"] {
            let result = s.set_bucket_policy("my-bucket", text).await;
            assert!(matches!(result, Err(StorageError::Policy { .. })), "{text}");
        }
    }

    #[tokio::test]
    async fn test_policy_bucket_not_found() {
        let s = storage();
        let result = s.get_bucket_policy("nonexistent").await;
        assert!(matches!(result, Err(StorageError::BucketNotFound(_))));

        let result = s.set_bucket_policy("nonexistent", "{}").await;
        assert!(matches!(result, Err(StorageError::BucketNotFound(_))));
    }
}

// =============================================================================
// OBJECT OPERATIONS
// =============================================================================

mod object_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_download() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let src = dir.path().join("src.txt");
        tokio::fs::write(&src, b"hello world").await.unwrap();
        s.upload_object("my-bucket", "docs/hello.txt", &src).await.unwrap();

        let dst = dir.path().join("dst.txt");
        s.download_object("my-bucket", "docs/hello.txt", &dst)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        put(&s, "my-bucket", "key", b"first").await;
        put(&s, "my-bucket", "key", b"second!").await;

        let objects: Vec<ObjectSummary> = s
            .list_objects("my-bucket", true)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].size, 7);
    }

    #[tokio::test]
    async fn test_put_etag_is_quoted_md5() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        put(&s, "my-bucket", "key", b"").await;

        let objects: Vec<ObjectSummary> = s
            .list_objects("my-bucket", true)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            objects[0].etag.as_deref(),
            Some("\"d41d8cd98f00b204e9800998ecf8427e\"")
        );
        assert!(objects[0].last_modified.is_some());
    }

    #[tokio::test]
    async fn test_put_long_stream() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        let result = s
            .put_object("my-bucket", "key", reader(b"0123456789"), 4, MIN_PART_SIZE)
            .await;
        assert!(matches!(
            result,
            Err(StorageError::Io(ref e)) if e.kind() == std::io::ErrorKind::InvalidData
        ));
        assert!(list(&s, "my-bucket", true).await.is_empty());
    }

    #[tokio::test]
    async fn test_put_short_stream() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        let result = s
            .put_object("my-bucket", "key", reader(b"abc"), 10, MIN_PART_SIZE)
            .await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(list(&s, "my-bucket", true).await.is_empty());
    }

    #[tokio::test]
    async fn test_put_empty_key() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        let result = s
            .put_object("my-bucket", "", reader(b"abc"), 3, MIN_PART_SIZE)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_put_bucket_not_found() {
        let s = storage();
        let result = s
            .put_object("nonexistent", "key", reader(b"abc"), 3, MIN_PART_SIZE)
            .await;
        assert!(matches!(result, Err(StorageError::BucketNotFound(_))));
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let result = s
            .download_object("my-bucket", "nonexistent", &dir.path().join("out"))
            .await;
        assert!(matches!(result, Err(StorageError::ObjectNotFound { .. })));
    }

    #[tokio::test]
    async fn test_remove_object() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        put(&s, "my-bucket", "key", b"data").await;

        s.remove_object("my-bucket", "key").await.unwrap();
        assert!(list(&s, "my-bucket", true).await.is_empty());

        // Removing a missing key succeeds
        s.remove_object("my-bucket", "key").await.unwrap();
    }
}

// =============================================================================
// LIST OPERATIONS
// =============================================================================

mod list_tests {
    use super::*;

    async fn populated() -> EphemeralStorage {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();
        for key in ["d/e/c", "b", "a", "d/b"] {
            put(&s, "my-bucket", key, b"x").await;
        }
        s
    }

    #[tokio::test]
    async fn test_list_recursive_sorted() {
        let s = populated().await;
        assert_eq!(list(&s, "my-bucket", true).await, ["a", "b", "d/b", "d/e/c"]);
    }

    #[tokio::test]
    async fn test_list_top_level_only() {
        let s = populated().await;
        assert_eq!(list(&s, "my-bucket", false).await, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_bucket_not_found() {
        let s = storage();
        let result: Result<Vec<ObjectSummary>, _> =
            s.list_objects("nonexistent", true).try_collect().await;
        assert!(matches!(result, Err(StorageError::BucketNotFound(_))));
    }
}

// =============================================================================
// PRESIGNED URLS
// =============================================================================

mod presign_tests {
    use super::*;

    #[tokio::test]
    async fn test_presigned_url_uses_configured_endpoint() {
        let config = MinioConfig::new("http://files.internal:9000", "AKID", "secret");
        let s = EphemeralStorage::with_config(&config);
        s.make_bucket("my-bucket").await.unwrap();

        let url = s
            .presigned_get_url("my-bucket", "a/b.txt", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(url.starts_with("http://files.internal:9000/my-bucket/a/b.txt?"));
        assert!(url.contains("X-Amz-Credential=AKID%2F"));
        assert!(url.contains("X-Amz-Expires=300"));
    }

    #[tokio::test]
    async fn test_presigned_url_does_not_require_object() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        let result = s
            .presigned_get_url("my-bucket", "not-yet-uploaded", Duration::from_secs(60))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_presigned_url_bucket_not_found() {
        let s = storage();
        let result = s
            .presigned_get_url("nonexistent", "key", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::BucketNotFound(_))));
    }

    #[tokio::test]
    async fn test_presigned_url_expiry_bounds() {
        let s = storage();
        s.make_bucket("my-bucket").await.unwrap();

        for expiry in [Duration::ZERO, Duration::from_secs(8 * 24 * 60 * 60)] {
            let result = s.presigned_get_url("my-bucket", "key", expiry).await;
            assert!(matches!(result, Err(StorageError::InvalidArgument(_))));
        }
    }
}
