//! Tracking URL codec.
//!
//! A payload is serialized to compact JSON and carried as one URL-safe, unpadded base64
//! path segment. With an encryption key configured the JSON is sealed with AES-256-GCM
//! first and the segment holds `nonce || ciphertext || tag`.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use std::sync::Arc;

use crate::domain::{Metadata, TrackingConfig, TrackingKind, TrackingPayload};
use crate::error::{DecodingError, EncodingError};
use crate::utils::tracking_url::{extract_segment, is_segment_alphabet, join_segment};

/// AES-GCM standard nonce length.
const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length.
const TAG_LEN: usize = 16;

/// Encodes payloads into tracking URLs and decodes path segments back.
///
/// All operations are synchronous and side-effect free apart from drawing a nonce
/// from the OS RNG when encrypting. A codec is cheap to clone.
#[derive(Clone)]
pub struct UrlCodec {
    config: Arc<TrackingConfig>,
    cipher: Option<Aes256Gcm>,
}

impl UrlCodec {
    pub fn new(config: Arc<TrackingConfig>) -> Self {
        let cipher = config
            .encryption_key
            .as_ref()
            .map(|key| Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())));

        Self { config, cipher }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Encodes `payload` and appends it to the base URL for its kind.
    ///
    /// # Errors
    ///
    /// See [`Self::encode_segment`].
    pub fn encode(&self, payload: &TrackingPayload) -> Result<String, EncodingError> {
        let segment = self.encode_segment(payload)?;
        Ok(join_segment(self.config.base_url(payload.kind), &segment))
    }

    /// Encodes `payload` into a single path segment.
    ///
    /// # Errors
    ///
    /// - Invariant and depth violations reported by [`TrackingPayload::validate`]
    /// - [`EncodingError::TooLarge`] when the segment exceeds `max_encoded_len`
    /// - [`EncodingError::Entropy`] / [`EncodingError::Encryption`] on cipher failures
    pub fn encode_segment(&self, payload: &TrackingPayload) -> Result<String, EncodingError> {
        payload.validate()?;

        let json =
            serde_json::to_vec(payload).map_err(|e| EncodingError::Serialization(e.to_string()))?;

        let bytes = match &self.cipher {
            Some(cipher) => seal(cipher, &json)?,
            None => json,
        };

        let segment = URL_SAFE_NO_PAD.encode(bytes);
        if segment.len() > self.config.max_encoded_len {
            return Err(EncodingError::TooLarge {
                len: segment.len(),
                max: self.config.max_encoded_len,
            });
        }

        Ok(segment)
    }

    /// Decodes a path segment into a validated payload.
    ///
    /// Never panics, whatever the input.
    ///
    /// # Errors
    ///
    /// - [`DecodingError::Empty`] for an empty segment
    /// - [`DecodingError::InvalidEncoding`] for characters outside the base64url alphabet,
    ///   padding, or a segment longer than the configured maximum
    /// - [`DecodingError::Authentication`] when decryption fails (tampered or wrong key)
    /// - [`DecodingError::MalformedPayload`] when the bytes are not a payload
    /// - [`DecodingError::InvalidPayload`] when the payload breaks its invariant
    pub fn decode(&self, segment: &str) -> Result<TrackingPayload, DecodingError> {
        if segment.is_empty() {
            return Err(DecodingError::Empty);
        }
        if segment.len() > self.config.max_encoded_len || !is_segment_alphabet(segment) {
            return Err(DecodingError::InvalidEncoding);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| DecodingError::InvalidEncoding)?;

        let json = match &self.cipher {
            Some(cipher) => open(cipher, &bytes)?,
            None => bytes,
        };

        let payload: TrackingPayload = serde_json::from_slice(&json)
            .map_err(|e| DecodingError::MalformedPayload(e.to_string()))?;
        payload.validate()?;

        Ok(payload)
    }

    /// Decodes a segment and checks it was issued for `expected`.
    ///
    /// # Errors
    ///
    /// Everything [`Self::decode`] returns, plus [`DecodingError::UnexpectedKind`].
    pub fn decode_as(
        &self,
        segment: &str,
        expected: TrackingKind,
    ) -> Result<TrackingPayload, DecodingError> {
        let payload = self.decode(segment)?;
        if payload.kind != expected {
            return Err(DecodingError::UnexpectedKind {
                expected,
                found: payload.kind,
            });
        }
        Ok(payload)
    }

    /// Builds an open-tracking URL.
    ///
    /// `metadata` is layered over the configured default metadata and the payload is
    /// stamped with the current time, truncated to seconds.
    pub fn open_url(&self, metadata: &Metadata) -> Result<String, EncodingError> {
        let payload = TrackingPayload::open(metadata.layered_over(&self.config.default_metadata))
            .issued_at(Utc::now());
        self.encode(&payload)
    }

    /// Builds a click-tracking URL redirecting to `target_url`.
    pub fn click_url(&self, target_url: &str, metadata: &Metadata) -> Result<String, EncodingError> {
        let payload = TrackingPayload::click(
            target_url,
            metadata.layered_over(&self.config.default_metadata),
        )
        .issued_at(Utc::now());
        self.encode(&payload)
    }

    /// Recovers the encoded segment from a full tracking URL built by this codec.
    pub fn extract_segment<'a>(&self, url: &'a str, kind: TrackingKind) -> Option<&'a str> {
        extract_segment(url, self.config.base_url(kind))
    }
}

fn seal(cipher: &Aes256Gcm, plaintext: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    getrandom::fill(&mut nonce_bytes).map_err(|_| EncodingError::Entropy)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| EncodingError::Encryption)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open(cipher: &Aes256Gcm, sealed: &[u8]) -> Result<Vec<u8>, DecodingError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(DecodingError::Authentication);
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| DecodingError::Authentication)
}
