//! HMAC-SHA1 signature verification for `X-Hub-Signature`.

use crate::error::IngressError;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Verify `header` (the raw `X-Hub-Signature` value, `sha1=<hex>`) against
/// `body` under `secret`, in constant time.
pub fn verify(header: &str, body: &[u8], secret: &str) -> Result<(), IngressError> {
    let hex_digest = header
        .strip_prefix("sha1=")
        .ok_or_else(|| IngressError::MalformedSignature(header.to_owned()))?;

    let expected = hex::decode(hex_digest)
        .map_err(|_| IngressError::MalformedSignature(header.to_owned()))?;

    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| IngressError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_correct_signature() {
        let body = b"hello world";
        let header = sign("secret", body);
        assert!(verify(&header, body, "secret").is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = b"hello world";
        let header = sign("secret", body);
        assert!(verify(&header, body, "other").is_err());
    }

    #[test]
    fn rejects_tampered_body() {
        let body = b"hello world";
        let header = sign("secret", body);
        assert!(verify(&header, b"hello worlds", "secret").is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(verify("not-a-signature", b"x", "secret").is_err());
        assert!(verify("sha1=zz", b"x", "secret").is_err());
    }
}
