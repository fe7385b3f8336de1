//! AWS Signature Version 4 primitives

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Sign a string using HMAC-SHA256
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Create the canonical request string
///
/// `headers` must already be lowercase and sorted by name.
pub fn create_canonical_request(
    method: &str,
    path: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    payload_hash: &str,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();

    let signed_headers = signed_headers(headers);

    format!("{method}\n{path}\n{query_string}\n{canonical_headers}\n{signed_headers}\n{payload_hash}")
}

/// Semicolon-joined header names, as they appear in `X-Amz-SignedHeaders`
pub fn signed_headers(headers: &[(&str, &str)]) -> String {
    headers.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(";")
}

/// Create the string to sign
pub fn create_string_to_sign(timestamp: &str, scope: &str, canonical_request: &str) -> String {
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    format!("{ALGORITHM}\n{timestamp}\n{scope}\n{canonical_hash}")
}

/// Hex-encoded signature of `string_to_sign`
pub fn sign(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}
