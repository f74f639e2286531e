//! HMAC-SHA256 signing of webhook bodies.
//!
//! Receivers recompute the MAC over the raw request body with the shared secret and
//! compare it with the `X-Tracking-Signature` header, formatted as `sha256=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-tracking-signature";

/// Returns the header value for `body` signed with `secret`.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a header value produced by [`sign`] in constant time.
pub fn verify(body: &[u8], secret: &str, header: &str) -> bool {
    let Some(signature) = header.strip_prefix("sha256=").and_then(|h| hex::decode(h).ok()) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_format() {
        let header = sign(b"{}", "secret");

        assert!(header.starts_with("sha256="));
        assert_eq!(header.len(), "sha256=".len() + 64);
    }

    #[test]
    fn test_sign_is_deterministic() {
        assert_eq!(sign(b"body", "k"), sign(b"body", "k"));
        assert_ne!(sign(b"body", "k"), sign(b"body", "other"));
    }

    #[test]
    fn test_verify() {
        let header = sign(b"payload", "secret");

        assert!(verify(b"payload", "secret", &header));
        assert!(!verify(b"payload!", "secret", &header));
        assert!(!verify(b"payload", "wrong", &header));
        assert!(!verify(b"payload", "secret", "sha1=abcd"));
        assert!(!verify(b"payload", "secret", "sha256=zz"));
    }
}
