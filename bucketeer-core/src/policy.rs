//! Anonymous-read bucket policy
//!
//! Servers re-serialize the policies they store (key order, whitespace), so a
//! bucket counts as public-readable when its installed policy is equal to the
//! canonical document as a JSON value, not as text.

use serde_json::{json, Value};

/// The canonical policy granting `s3:GetObject` on every object of `bucket`
pub fn public_read_policy(bucket: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "AWS": ["*"] },
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{bucket}/*")],
        }],
    })
}

/// Policy text sent to the server for [`public_read_policy`]
pub fn public_read_policy_json(bucket: &str) -> String {
    public_read_policy(bucket).to_string()
}

/// Whether `installed` is the public-read policy of `bucket`.
///
/// Object keys compare order-insensitively, arrays keep their order, and a
/// scalar never equals a one-element array. Unparseable text is not public.
pub fn is_public_read(bucket: &str, installed: &str) -> bool {
    match serde_json::from_str::<Value>(installed) {
        Ok(policy) => policy == public_read_policy(bucket),
        Err(e) => {
            tracing::debug!(bucket = %bucket, error = %e, "Installed bucket policy is not valid JSON");
            false
        }
    }
}
