//! Storage error types and S3 error-code mapping

use thiserror::Error;

/// Boxed error kept as the original cause of a storage failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// S3 error codes that map to a dedicated error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AccessDenied,
    InvalidAccessKeyId,
    SignatureDoesNotMatch,
    NoSuchBucket,
    NoSuchKey,
    BucketAlreadyExists,
    BucketAlreadyOwnedByYou,
    InvalidBucketName,
    MalformedPolicy,
    NoSuchBucketPolicy,
    InvalidArgument,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketAlreadyOwnedByYou => "BucketAlreadyOwnedByYou",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::MalformedPolicy => "MalformedPolicy",
            Self::NoSuchBucketPolicy => "NoSuchBucketPolicy",
            Self::InvalidArgument => "InvalidArgument",
        }
    }

    /// Look up a code as returned by the server
    pub fn parse(code: &str) -> Option<Self> {
        let code = match code {
            "AccessDenied" => Self::AccessDenied,
            "InvalidAccessKeyId" => Self::InvalidAccessKeyId,
            "SignatureDoesNotMatch" => Self::SignatureDoesNotMatch,
            "NoSuchBucket" => Self::NoSuchBucket,
            "NoSuchKey" => Self::NoSuchKey,
            "BucketAlreadyExists" => Self::BucketAlreadyExists,
            "BucketAlreadyOwnedByYou" => Self::BucketAlreadyOwnedByYou,
            "InvalidBucketName" => Self::InvalidBucketName,
            "MalformedPolicy" => Self::MalformedPolicy,
            "NoSuchBucketPolicy" => Self::NoSuchBucketPolicy,
            "InvalidArgument" => Self::InvalidArgument,
            _ => return None,
        };
        Some(code)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccessDenied | Self::InvalidAccessKeyId | Self::SignatureDoesNotMatch => {
                ErrorKind::Auth
            }
            Self::NoSuchBucket | Self::NoSuchKey => ErrorKind::NotFound,
            Self::BucketAlreadyExists | Self::BucketAlreadyOwnedByYou => ErrorKind::AlreadyExists,
            Self::MalformedPolicy | Self::NoSuchBucketPolicy => ErrorKind::Policy,
            Self::InvalidBucketName | Self::InvalidArgument => ErrorKind::InvalidArgument,
        }
    }
}

/// Coarse classification of a [`StorageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Unavailable,
    Auth,
    NotFound,
    AlreadyExists,
    Policy,
    InvalidArgument,
    Io,
    Service,
}

/// Errors surfaced by storage clients and the file façade
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{code}: {message}")]
    AccessDenied { code: String, message: String },

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("Policy rejected for bucket {bucket}: {message}")]
    Policy { bucket: String, message: String },

    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{code}: {message}")]
    Service {
        code: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl StorageError {
    /// Build an error from a server error code and message.
    ///
    /// Codes without a dedicated variant are kept verbatim in
    /// [`StorageError::Service`].
    pub fn from_service(
        code: Option<&str>,
        message: Option<&str>,
        bucket: &str,
        key: Option<&str>,
    ) -> Self {
        let raw_code = code.unwrap_or("Unknown");
        let message = message.unwrap_or("no error message returned").to_string();

        let Some(code) = code.and_then(ErrorCode::parse) else {
            return Self::Service {
                code: raw_code.to_string(),
                message,
                source: None,
            };
        };

        match code {
            ErrorCode::AccessDenied
            | ErrorCode::InvalidAccessKeyId
            | ErrorCode::SignatureDoesNotMatch => Self::AccessDenied {
                code: code.as_str().to_string(),
                message,
            },
            ErrorCode::NoSuchBucket => Self::BucketNotFound(bucket.to_string()),
            ErrorCode::NoSuchKey => Self::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.unwrap_or_default().to_string(),
            },
            ErrorCode::BucketAlreadyExists | ErrorCode::BucketAlreadyOwnedByYou => {
                Self::BucketAlreadyExists(bucket.to_string())
            }
            ErrorCode::InvalidBucketName => Self::InvalidBucketName(bucket.to_string()),
            ErrorCode::MalformedPolicy | ErrorCode::NoSuchBucketPolicy => Self::Policy {
                bucket: bucket.to_string(),
                message,
            },
            ErrorCode::InvalidArgument => Self::InvalidArgument(message),
        }
    }

    /// Attach the original client error to a [`StorageError::Service`]
    #[must_use]
    pub fn with_source(self, cause: impl Into<BoxError>) -> Self {
        match self {
            Self::Service { code, message, .. } => Self::Service {
                code,
                message,
                source: Some(cause.into()),
            },
            Self::Unavailable { message, .. } => Self::Unavailable {
                message,
                source: Some(cause.into()),
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
            Self::AccessDenied { .. } => ErrorKind::Auth,
            Self::BucketNotFound(_) | Self::ObjectNotFound { .. } => ErrorKind::NotFound,
            Self::BucketAlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Policy { .. } => ErrorKind::Policy,
            Self::InvalidBucketName(_) | Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Io(_) => ErrorKind::Io,
            Self::Service { .. } => ErrorKind::Service,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }
}
