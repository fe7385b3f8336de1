//! Command-line subcommands

use bucketeer_core::{BucketStatus, TimeUnit, DEFAULT_PART_SIZE};
use bucketeer_s3::{BucketHandle, MinioFiles};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a bucket if it does not exist
    Ensure {
        bucket: String,

        /// Install the public-read policy
        #[arg(long)]
        public: bool,
    },

    /// Upload a file and print its public URL
    Upload {
        key: String,
        path: PathBuf,

        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// Stream a file up in parts of a chosen size
    Put {
        key: String,
        path: PathBuf,

        #[arg(short, long)]
        bucket: Option<String>,

        /// Part size in bytes
        #[arg(long, default_value_t = DEFAULT_PART_SIZE)]
        part_size: u64,
    },

    /// Download an object to a local file
    Download {
        key: String,
        path: PathBuf,

        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// Delete an object
    Delete {
        key: String,

        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// List every object in a bucket
    List {
        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// Print a temporary download URL
    Presign {
        key: String,

        #[arg(short, long)]
        bucket: Option<String>,

        #[arg(long, default_value_t = 60, allow_negative_numbers = true)]
        expiry: i64,

        /// ms, seconds, minutes, hours or days
        #[arg(long, default_value_t = TimeUnit::Seconds)]
        unit: TimeUnit,
    },

    /// Print the public URL of an object, if its bucket is public
    PublicUrl {
        key: String,

        #[arg(short, long)]
        bucket: Option<String>,
    },
}

fn target<'a>(files: &'a MinioFiles, bucket: Option<&'a str>) -> BucketHandle<'a> {
    bucket.map_or_else(|| files.default_bucket(), |bucket| files.bucket(bucket))
}

fn url_line(url: Option<String>) -> String {
    url.unwrap_or_else(|| "(no public url)".to_string())
}

impl Command {
    /// Run the command and return what it prints
    pub async fn execute(self, files: &MinioFiles) -> anyhow::Result<Vec<String>> {
        let lines = match self {
            Self::Ensure { bucket, public } => {
                let status = match files.ensure_bucket(&bucket, public).await? {
                    BucketStatus::Created => "created",
                    BucketStatus::Exists => "already exists",
                };
                vec![format!("{bucket}: {status}")]
            }
            Self::Upload { key, path, bucket } => {
                let url = target(files, bucket.as_deref())
                    .upload_file(&key, &path)
                    .await?;
                vec![url_line(url)]
            }
            Self::Put {
                key,
                path,
                bucket,
                part_size,
            } => {
                let file = tokio::fs::File::open(&path).await?;
                let total_size = file.metadata().await?.len();
                let bucket = target(files, bucket.as_deref());
                bucket
                    .put_stream(&key, file, total_size, part_size)
                    .await?;
                vec![format!("{}/{key}: {total_size} bytes", bucket.name())]
            }
            Self::Download { key, path, bucket } => {
                target(files, bucket.as_deref())
                    .download_file(&key, &path)
                    .await?;
                vec![path.display().to_string()]
            }
            Self::Delete { key, bucket } => {
                target(files, bucket.as_deref()).delete_file(&key).await?;
                Vec::new()
            }
            Self::List { bucket } => target(files, bucket.as_deref())
                .list_files()
                .await?
                .into_iter()
                .map(|object| {
                    format!(
                        "{}\t{}\t{}\t{}",
                        object.key,
                        object.size,
                        object
                            .last_modified
                            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339()),
                        object.etag.as_deref().unwrap_or("-"),
                    )
                })
                .collect(),
            Self::Presign {
                key,
                bucket,
                expiry,
                unit,
            } => {
                let url = target(files, bucket.as_deref())
                    .presigned_url(&key, expiry, unit)
                    .await?;
                vec![url]
            }
            Self::PublicUrl { key, bucket } => {
                let url = target(files, bucket.as_deref())
                    .public_url_for(&key)
                    .await?;
                vec![url_line(url)]
            }
        };

        Ok(lines)
    }

    pub async fn run(self, files: &MinioFiles) -> anyhow::Result<()> {
        for line in self.execute(files).await? {
            println!("{line}");
        }
        Ok(())
    }
}
