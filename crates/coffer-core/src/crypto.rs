//! Envelope encryption for `Coffer`.
//!
//! Every value type handler seals its plaintext through [`seal`] and opens it
//! through [`open`], so the envelope format is identical across value types.
//!
//! # Envelope format
//!
//! - AES-256-GCM with a 128-bit IV (not the usual 96-bit one), drawn fresh
//!   from `OsRng` on every call, and a 128-bit tag. No associated data.
//! - Decoded layout: `IV (16 bytes) || tag (16 bytes) || ciphertext`.
//! - Stored as standard-alphabet, padded base64 text.
//!
//! The layout is fixed for interoperability with previously stored data.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce, Tag};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// AES-256-GCM with a 16-byte nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// IV length in bytes.
pub const IV_LEN: usize = 16;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Prefix accepted in front of base64-encoded key material.
const BASE64_KEY_PREFIX: &str = "base64:";

/// A 256-bit encryption key that is zeroized on drop.
///
/// The inner bytes are never exposed in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a key from a byte slice, which must be exactly 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for any other length.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Decode a key from base64 text, with or without a `base64:` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidEncoding`] if the text is not base64 and
    /// [`CryptoError::InvalidKeyLength`] if it does not decode to 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let trimmed = encoded.trim();
        let body = trimmed.strip_prefix(BASE64_KEY_PREFIX).unwrap_or(trimmed);
        let mut bytes = STANDARD
            .decode(body)
            .map_err(|e| CryptoError::InvalidEncoding {
                reason: e.to_string(),
            })?;
        let key = Self::try_from_slice(&bytes);
        bytes.zeroize();
        key
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm16::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Encode the key as base64 text (for key generation tooling).
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Borrow the raw key bytes.
    ///
    /// The caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypt `plaintext` into a base64 envelope.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn seal(key: &EncryptionKey, plaintext: &[u8]) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_bytes()));
    let iv = Aes256Gcm16::generate_nonce(&mut OsRng);

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&iv, b"", &mut ciphertext)
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    let mut envelope = Vec::with_capacity(IV_LEN + TAG_LEN + ciphertext.len());
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&tag);
    envelope.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(envelope))
}

/// Decrypt an envelope produced by [`seal`].
///
/// # Errors
///
/// - [`CryptoError::InvalidEncoding`] if the envelope is not valid base64.
/// - [`CryptoError::EnvelopeTooShort`] if it decodes to fewer than 32 bytes.
/// - [`CryptoError::Decryption`] if authentication fails (wrong key,
///   corrupted data, or tampered tag).
pub fn open(key: &EncryptionKey, envelope: &str) -> Result<Vec<u8>, CryptoError> {
    let data = STANDARD
        .decode(envelope)
        .map_err(|e| CryptoError::InvalidEncoding {
            reason: e.to_string(),
        })?;

    if data.len() < IV_LEN + TAG_LEN {
        return Err(CryptoError::EnvelopeTooShort {
            expected: IV_LEN + TAG_LEN,
            actual: data.len(),
        });
    }

    let (iv, rest) = data.split_at(IV_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);
    let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_bytes()));

    let mut plaintext = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(iv),
            b"",
            &mut plaintext,
            Tag::from_slice(tag),
        )
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })?;
    Ok(plaintext)
}
