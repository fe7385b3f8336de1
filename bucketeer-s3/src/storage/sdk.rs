//! Storage client for MinIO and other S3-compatible servers, backed by the AWS SDK

use super::stream::{ensure_exhausted, read_part};
use super::traits::*;
use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_bucket_policy::GetBucketPolicyError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
    Object,
};
use aws_sdk_s3::Client;
use bucketeer_core::{check_part_size, part_size_for, validate_object_key, MinioConfig};
use chrono::DateTime;
use futures::stream::{self, BoxStream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Storage client talking to a real server over HTTP
pub struct SdkStorage {
    client: Client,
    region: String,
}

impl SdkStorage {
    /// Build a client for the endpoint, credentials and region of `config`.
    ///
    /// Buckets are addressed path-style (`endpoint/bucket/key`).
    pub fn new(config: &MinioConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "bucketeer",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(true)
            .build();

        Self::with_client(Client::from_conf(s3_config), config.region.clone())
    }

    /// Wrap an already configured SDK client
    pub fn with_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        reader: &mut ObjectReader,
        total_size: u64,
        part_size: u64,
    ) -> Result<Vec<CompletedPart>, StorageError> {
        let mut parts = Vec::new();
        let mut remaining = total_size;
        let mut part_number = 1;

        while remaining > 0 {
            let len = remaining.min(part_size);
            let data = read_part(reader, len).await?;

            let output = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(output.e_tag().map(str::to_string))
                    .build(),
            );

            remaining -= len;
            part_number += 1;
        }

        ensure_exhausted(reader, total_size).await?;
        Ok(parts)
    }

    async fn put_multipart(
        &self,
        bucket: &str,
        key: &str,
        reader: &mut ObjectReader,
        total_size: u64,
        part_size: u64,
    ) -> Result<(), StorageError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::Service {
                code: "InvalidResponse".to_string(),
                message: "CreateMultipartUpload returned no upload id".to_string(),
                source: None,
            })?
            .to_string();

        let parts = match self
            .upload_parts(bucket, key, &upload_id, reader, total_size, part_size)
            .await
        {
            Ok(parts) => parts,
            Err(e) => {
                let abort = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await;
                if let Err(abort_err) = abort {
                    warn!(
                        bucket = %bucket,
                        key = %key,
                        upload_id = %upload_id,
                        error = %abort_err,
                        "Failed to abort multipart upload"
                    );
                }
                return Err(e);
            }
        };

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

        Ok(())
    }
}

#[async_trait]
impl StorageClient for SdkStorage {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(is_missing_bucket) => Ok(false),
            Err(err) => Err(map_sdk_error(err, bucket, None)),
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 is the implicit location and must not be sent
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, None))?;
        Ok(())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        match self.client.get_bucket_policy().bucket(bucket).send().await {
            Ok(output) => Ok(output.policy().map(str::to_string)),
            Err(err) if err.as_service_error().is_some_and(is_missing_policy) => Ok(None),
            Err(err) => Err(map_sdk_error(err, bucket, None)),
        }
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StorageError> {
        if policy.trim().is_empty() {
            self.client
                .delete_bucket_policy()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, bucket, None))?;
            return Ok(());
        }

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, None))?;
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        let file = tokio::fs::File::open(path).await?;
        let total_size = file.metadata().await?.len();
        self.put_object(bucket, key, Box::pin(file), total_size, part_size_for(total_size))
            .await
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
        let mut reader = reader;

        if total_size > part_size {
            debug!(bucket = %bucket, key = %key, total_size, part_size, "Multipart upload");
            return self
                .put_multipart(bucket, key, &mut reader, total_size, part_size)
                .await;
        }

        let data = read_part(&mut reader, total_size).await?;
        ensure_exhausted(&mut reader, total_size).await?;
        let content_length = i64::try_from(total_size).map_err(|_| {
            StorageError::InvalidArgument(format!("object size {total_size} too large"))
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(content_length)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;
        Ok(())
    }

    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        let mut output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

        // Written beside the target and renamed once complete
        let partial = partial_path(path);
        let mut file = tokio::fs::File::create(&partial).await?;

        let written: io::Result<()> = async {
            while let Some(chunk) = output.body.try_next().await.map_err(io::Error::other)? {
                file.write_all(&chunk).await?;
            }
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        drop(file);
        tokio::fs::rename(&partial, path).await?;
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;
        Ok(())
    }

    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        recursive: bool,
    ) -> BoxStream<'a, Result<ObjectSummary, StorageError>> {
        let pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_delimiter((!recursive).then(|| "/".to_string()))
            .into_paginator()
            .send();

        // Objects of the current page are drained before the next page is fetched
        let state = (pages, Vec::<Object>::new().into_iter());
        stream::unfold(state, move |(mut pages, mut objects)| async move {
            loop {
                if let Some(object) = objects.next() {
                    return Some((Ok(object_summary(object)), (pages, objects)));
                }
                match pages.next().await? {
                    Ok(page) => objects = page.contents.unwrap_or_default().into_iter(),
                    Err(e) => {
                        return Some((Err(map_sdk_error(e, bucket, None)), (pages, objects)));
                    }
                }
            }
        })
        .boxed()
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, StorageError> {
        validate_object_key(key)?;

        // Presigning is local; ask the server so a missing bucket is reported
        if !self.bucket_exists(bucket).await? {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }

        let presigning = PresigningConfig::expires_in(expiry)
            .map_err(|e| StorageError::InvalidArgument(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| map_sdk_error(e, bucket, Some(key)))?;

        Ok(request.uri().to_string())
    }
}

fn is_missing_bucket(err: &HeadBucketError) -> bool {
    err.is_not_found() || err.code() == Some("NoSuchBucket")
}

fn is_missing_policy(err: &GetBucketPolicyError) -> bool {
    err.code() == Some("NoSuchBucketPolicy")
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn object_summary(object: Object) -> ObjectSummary {
    ObjectSummary {
        key: object.key().unwrap_or_default().to_string(),
        size: object
            .size()
            .and_then(|size| u64::try_from(size).ok())
            .unwrap_or_default(),
        last_modified: object
            .last_modified()
            .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
        etag: object.e_tag().map(str::to_string),
    }
}

/// Error code implied by the HTTP status of a response without a body
fn code_for_status(response: Option<&HttpResponse>) -> Option<&'static str> {
    match response?.status().as_u16() {
        403 => Some("AccessDenied"),
        _ => None,
    }
}

/// Translate an SDK failure, keeping the SDK error as the cause
fn map_sdk_error<E>(
    err: SdkError<E, HttpResponse>,
    bucket: &str,
    key: Option<&str>,
) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let Some(service) = err.as_service_error() {
        // HEAD responses carry no error document
        let code = service
            .code()
            .or_else(|| code_for_status(err.raw_response()));
        let mapped = StorageError::from_service(code, service.message(), bucket, key);
        return mapped.with_source(err);
    }

    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => StorageError::Unavailable {
            message: format!("request for bucket {bucket} did not reach the server"),
            source: Some(Box::new(err)),
        },
        other => StorageError::Service {
            code: "ClientError".to_string(),
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::create_bucket::CreateBucketError;
    use aws_sdk_s3::operation::get_object::GetObjectError;
    use aws_sdk_s3::types::error::NotFound;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/b.png")),
            PathBuf::from("/tmp/b.png.part")
        );
    }

    #[test]
    fn test_object_summary_conversion() {
        let object = Object::builder()
            .key("d/e/c")
            .size(42)
            .e_tag("\"abc\"")
            .last_modified(aws_sdk_s3::primitives::DateTime::from_secs(1_700_000_000))
            .build();

        let summary = object_summary(object);
        assert_eq!(summary.key, "d/e/c");
        assert_eq!(summary.size, 42);
        assert_eq!(summary.etag.as_deref(), Some("\"abc\""));
        assert_eq!(summary.last_modified.unwrap().timestamp(), 1_700_000_000);
    }

    fn response(status: u16) -> HttpResponse {
        HttpResponse::new(
            status.try_into().unwrap(),
            ByteStream::from_static(b"").into_inner(),
        )
    }

    fn metadata(code: &str) -> ErrorMetadata {
        ErrorMetadata::builder()
            .code(code)
            .message("returned by the server")
            .build()
    }

    #[test]
    fn test_missing_bucket_detection() {
        let not_found = HeadBucketError::NotFound(NotFound::builder().build());
        assert!(is_missing_bucket(&not_found));
        assert!(is_missing_bucket(&HeadBucketError::generic(metadata("NoSuchBucket"))));
        assert!(!is_missing_bucket(&HeadBucketError::generic(metadata("AccessDenied"))));
    }

    #[test]
    fn test_missing_policy_detection() {
        assert!(is_missing_policy(&GetBucketPolicyError::generic(metadata(
            "NoSuchBucketPolicy"
        ))));
        assert!(!is_missing_policy(&GetBucketPolicyError::generic(metadata(
            "NoSuchBucket"
        ))));
    }

    #[test]
    fn test_bodyless_forbidden_is_access_denied() {
        let err = SdkError::service_error(
            HeadBucketError::generic(ErrorMetadata::builder().build()),
            response(403),
        );

        let mapped = map_sdk_error(err, "media", None);
        assert!(matches!(
            mapped,
            StorageError::AccessDenied { ref code, .. } if code == "AccessDenied"
        ));
    }

    #[test]
    fn test_owned_bucket_is_already_exists() {
        let err = SdkError::service_error(
            CreateBucketError::generic(metadata("BucketAlreadyOwnedByYou")),
            response(409),
        );

        let mapped = map_sdk_error(err, "media", None);
        assert!(matches!(mapped, StorageError::BucketAlreadyExists(ref b) if b == "media"));
        assert!(mapped.is_already_exists());
    }

    #[test]
    fn test_missing_key_is_object_not_found() {
        let err = SdkError::service_error(
            GetObjectError::generic(metadata("NoSuchKey")),
            response(404),
        );

        let mapped = map_sdk_error(err, "media", Some("a/b.png"));
        assert!(matches!(
            mapped,
            StorageError::ObjectNotFound { ref bucket, ref key }
                if bucket == "media" && key == "a/b.png"
        ));
    }

    #[test]
    fn test_unknown_code_keeps_sdk_error_as_source() {
        let err = SdkError::service_error(
            GetObjectError::generic(metadata("SlowDown")),
            response(503),
        );

        let mapped = map_sdk_error(err, "media", Some("k"));
        assert!(matches!(mapped, StorageError::Service { ref code, .. } if code == "SlowDown"));
        assert!(std::error::Error::source(&mapped).is_some());
    }

    #[test]
    fn test_timeout_is_unavailable() {
        let err: SdkError<GetObjectError, HttpResponse> =
            SdkError::timeout_error(io::Error::new(io::ErrorKind::TimedOut, "timed out"));

        let mapped = map_sdk_error(err, "media", Some("k"));
        assert_eq!(mapped.kind(), bucketeer_core::ErrorKind::Unavailable);
        assert!(std::error::Error::source(&mapped).is_some());
    }
}
