//! Immutable configuration consumed by the codec, adapter and endpoint.
//!
//! The hosting application builds one [`TrackingConfig`] at startup (see
//! [`crate::config::Config::tracking_config`]) and shares it behind an `Arc`. Nothing in the
//! tracking core reads the environment or global state; multi-tenant deployments simply
//! hold one configuration per sender domain.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use std::fmt;
use std::time::Duration;

use super::metadata::Metadata;
use super::payload::TrackingKind;

/// Default cap on the encoded path segment, in bytes.
pub const DEFAULT_MAX_ENCODED_LEN: usize = 2048;

/// Default metadata key holding the email identity.
pub const DEFAULT_EMAIL_ID_KEY: &str = "email_id";

/// Default timeout for one webhook delivery.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Length of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// 256-bit key for authenticated payload encryption.
///
/// The `Debug` implementation never prints key material.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random key.
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system RNG is unavailable.
    pub fn generate() -> Result<Self, getrandom::Error> {
        let mut bytes = [0u8; KEY_LEN];
        getrandom::fill(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Parses a key given as 64 hex characters or as base64 (URL-safe or standard,
    /// padded or not). Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the text is not a 32-byte key.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();

        let bytes = if text.len() == KEY_LEN * 2 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex::decode(text).map_err(|e| format!("invalid hex key: {e}"))?
        } else {
            let unpadded = text.trim_end_matches('=');
            URL_SAFE_NO_PAD
                .decode(unpadded)
                .or_else(|_| STANDARD.decode(text))
                .map_err(|_| "key is neither hex nor base64".to_string())?
        };

        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| format!("key must be {KEY_LEN} bytes, got {}", v.len()))?;

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// URL-safe base64 rendering, the format printed by `trackctl keygen`.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(***)")
    }
}

/// Where and how decoded events are forwarded.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout: Duration,
    /// When set, deliveries are signed with HMAC-SHA256 over the body.
    pub secret: Option<String>,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
            secret: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// Tracking configuration shared by every core component.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    open_base_url: String,
    click_base_url: String,
    pub encryption_key: Option<EncryptionKey>,
    pub max_encoded_len: usize,
    /// Merged beneath per-email metadata by the URL builders.
    pub default_metadata: Metadata,
    pub email_id_key: String,
    pub webhook: Option<WebhookConfig>,
}

impl TrackingConfig {
    /// Creates a configuration with plain (unencrypted) encoding and no webhook.
    ///
    /// Trailing slashes on the base URLs are dropped; the codec always joins with one `/`.
    pub fn new(open_base_url: impl Into<String>, click_base_url: impl Into<String>) -> Self {
        Self {
            open_base_url: trim_base(open_base_url.into()),
            click_base_url: trim_base(click_base_url.into()),
            encryption_key: None,
            max_encoded_len: DEFAULT_MAX_ENCODED_LEN,
            default_metadata: Metadata::new(),
            email_id_key: DEFAULT_EMAIL_ID_KEY.to_string(),
            webhook: None,
        }
    }

    pub fn with_encryption_key(mut self, key: EncryptionKey) -> Self {
        self.encryption_key = Some(key);
        self
    }

    pub fn with_max_encoded_len(mut self, max: usize) -> Self {
        self.max_encoded_len = max;
        self
    }

    pub fn with_default_metadata(mut self, metadata: Metadata) -> Self {
        self.default_metadata = metadata;
        self
    }

    pub fn with_email_id_key(mut self, key: impl Into<String>) -> Self {
        self.email_id_key = key.into();
        self
    }

    pub fn with_webhook(mut self, webhook: WebhookConfig) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn open_base_url(&self) -> &str {
        &self.open_base_url
    }

    pub fn click_base_url(&self) -> &str {
        &self.click_base_url
    }

    pub fn base_url(&self, kind: TrackingKind) -> &str {
        match kind {
            TrackingKind::Open => &self.open_base_url,
            TrackingKind::Click => &self.click_base_url,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption_key.is_some()
    }
}

fn trim_base(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_urls_are_trimmed() {
        let config = TrackingConfig::new(
            "https://t.example.com/track/open/",
            "https://t.example.com/track/click",
        );

        assert_eq!(config.base_url(TrackingKind::Open), "https://t.example.com/track/open");
        assert_eq!(config.base_url(TrackingKind::Click), "https://t.example.com/track/click");
        assert!(!config.is_encrypted());
    }

    #[test]
    fn test_key_parse_hex_and_base64() {
        let raw = [7u8; KEY_LEN];
        let from_hex = EncryptionKey::parse(&hex::encode(raw)).unwrap();
        let from_b64 = EncryptionKey::parse(&URL_SAFE_NO_PAD.encode(raw)).unwrap();
        let from_padded = EncryptionKey::parse(&STANDARD.encode(raw)).unwrap();

        assert_eq!(from_hex.as_bytes(), &raw);
        assert_eq!(from_b64, from_hex);
        assert_eq!(from_padded, from_hex);
    }

    #[test]
    fn test_key_parse_rejects_wrong_length() {
        assert!(EncryptionKey::parse("abcd").is_err());
        assert!(EncryptionKey::parse(&URL_SAFE_NO_PAD.encode([1u8; 16])).is_err());
        assert!(EncryptionKey::parse("not a key at all!").is_err());
    }

    #[test]
    fn test_key_roundtrips_through_base64() {
        let key = EncryptionKey::generate().unwrap();
        assert_eq!(EncryptionKey::parse(&key.to_base64()).unwrap(), key);
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = EncryptionKey::from_bytes([0xAB; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "EncryptionKey(***)");
    }
}
