//! Request signing for Atlas.
//!
//! Signature format: `hex(SHA256(key_id + secret + unix_seconds))`, sent with
//! the key id and the timestamp it was computed for.

use reqwest::header::{HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};
use staylink_core::{CoreError, CoreResult};
use staylink_shared::Masked;

#[derive(Clone)]
pub struct AtlasSigner {
    key_id: String,
    secret: Masked<String>,
}

impl std::fmt::Debug for AtlasSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasSigner")
            .field("key_id", &self.key_id)
            .field("secret", &self.secret)
            .finish()
    }
}

impl AtlasSigner {
    pub fn new(key_id: impl Into<String>, secret: Masked<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret,
        }
    }

    pub fn signature(&self, unix_seconds: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.key_id.as_bytes());
        hasher.update(self.secret.expose().as_bytes());
        hasher.update(unix_seconds.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn headers(&self, unix_seconds: i64) -> CoreResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("api-key", header_value(&self.key_id)?);
        headers.insert("x-timestamp", header_value(&unix_seconds.to_string())?);
        headers.insert("x-signature", header_value(&self.signature(unix_seconds))?);
        Ok(headers)
    }
}

fn header_value(value: &str) -> CoreResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| CoreError::InternalError("Atlas credentials contain characters not allowed in headers".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_sha256_of_concatenation() {
        let signer = AtlasSigner::new("key", Masked::from("secret"));
        let expected = hex::encode(Sha256::digest(b"keysecret1700000000"));
        assert_eq!(signer.signature(1_700_000_000), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_headers_carry_key_timestamp_and_signature() {
        let signer = AtlasSigner::new("key", Masked::from("secret"));
        let headers = signer.headers(1_700_000_000).unwrap();
        assert_eq!(headers["api-key"], "key");
        assert_eq!(headers["x-timestamp"], "1700000000");
        assert_eq!(headers["x-signature"].to_str().unwrap(), signer.signature(1_700_000_000));
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = AtlasSigner::new("key", Masked::from("hunter2"));
        assert!(!format!("{:?}", signer).contains("hunter2"));
    }
}
