//! [`SecretCodec`]: AES-256-GCM encryption of a single secret under a key
//! derived from the master passphrase.
//!
//! **Never reuse a nonce.** Every call to [`SecretCodec::encrypt`] draws a
//! fresh 96-bit nonce from the OS CSPRNG; GCM nonce reuse under one key breaks
//! both confidentiality and authentication.

use std::fmt;
use std::sync::Arc;

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::Zeroizing;

use super::kdf::{FixedSaltScrypt, KeyDerivation};

/// Byte length of the GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Errors produced by the codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The plaintext to encrypt was empty.
    #[error("plaintext must not be empty")]
    EmptyPlaintext,

    /// The master passphrase is empty or unset.
    #[error("master passphrase must not be empty")]
    EmptyPassphrase,

    /// The key derivation function rejected its parameters.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// AES-GCM encryption failed.
    #[error("aead encryption failed")]
    AeadFailure,

    /// Tag verification failed: the payload was tampered with or the key is wrong.
    #[error("authentication failed")]
    Authentication,

    /// The payload or IV is not valid base64 or has the wrong length.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(&'static str),

    /// The row predates the `iv` column; its nonce convention is unknown.
    #[error("row has no stored iv; legacy nonce convention is not supported")]
    LegacyNonce,
}

/// Storage-ready encoding of one encrypted secret.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedSecret {
    /// `base64(ciphertext || tag)`.
    pub payload: String,
    /// `base64(nonce)`.
    pub iv: String,
}

impl fmt::Debug for EncodedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedSecret")
            .field("payload_len", &self.payload.len())
            .field("iv", &self.iv)
            .finish()
    }
}

/// Encrypts secrets under a key derived from the configured master passphrase.
///
/// Cheap to clone; the passphrase is shared and zeroed when the last clone drops.
#[derive(Clone)]
pub struct SecretCodec {
    passphrase: Arc<Zeroizing<Vec<u8>>>,
    kdf: Arc<dyn KeyDerivation>,
}

impl fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCodec([REDACTED])")
    }
}

impl SecretCodec {
    /// Codec using the production [`FixedSaltScrypt`] derivation.
    pub fn new(passphrase: impl Into<Vec<u8>>) -> Self {
        Self::with_kdf(passphrase, FixedSaltScrypt::new())
    }

    pub fn with_kdf(passphrase: impl Into<Vec<u8>>, kdf: impl KeyDerivation + 'static) -> Self {
        Self {
            passphrase: Arc::new(Zeroizing::new(passphrase.into())),
            kdf: Arc::new(kdf),
        }
    }

    /// Encrypt `plaintext` with a freshly generated nonce.
    ///
    /// The key is re-derived on every call so no derived key outlives the call.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyPlaintext`] or [`CodecError::EmptyPassphrase`]
    /// for empty inputs, and [`CodecError::KeyDerivation`] /
    /// [`CodecError::AeadFailure`] if the primitives fail.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncodedSecret, CodecError> {
        if plaintext.is_empty() {
            return Err(CodecError::EmptyPlaintext);
        }
        let cipher = self.build_cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the 16-byte tag to the ciphertext.
        let sealed = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CodecError::AeadFailure)?;

        Ok(EncodedSecret {
            payload: STANDARD.encode(sealed),
            iv: STANDARD.encode(nonce_bytes),
        })
    }

    /// Decrypt a payload produced by [`SecretCodec::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidEncoding`] for malformed base64 or lengths
    /// and [`CodecError::Authentication`] if the tag does not verify.
    pub fn decrypt(&self, payload: &str, iv: &str) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        let nonce_bytes = STANDARD
            .decode(iv)
            .map_err(|_| CodecError::InvalidEncoding("iv is not valid base64"))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CodecError::InvalidEncoding("iv must decode to 12 bytes"));
        }
        let sealed = STANDARD
            .decode(payload)
            .map_err(|_| CodecError::InvalidEncoding("payload is not valid base64"))?;
        if sealed.len() < TAG_LEN {
            return Err(CodecError::InvalidEncoding(
                "payload shorter than authentication tag",
            ));
        }

        let cipher = self.build_cipher()?;
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_ref())
            .map(Zeroizing::new)
            .map_err(|_| CodecError::Authentication)
    }

    /// Decrypt a stored row, branching on whether it carries an IV.
    ///
    /// Rows written before the `iv` column existed are rejected with
    /// [`CodecError::LegacyNonce`].
    pub fn decrypt_stored(
        &self,
        payload: &str,
        iv: Option<&str>,
    ) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        match iv {
            Some(iv) => self.decrypt(payload, iv),
            None => Err(CodecError::LegacyNonce),
        }
    }

    fn build_cipher(&self) -> Result<Aes256Gcm, CodecError> {
        let key = self.kdf.derive(&self.passphrase)?;
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CodecError::AeadFailure)
    }
}

/// Encrypt `plaintext` under `passphrase` with the production derivation.
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Result<EncodedSecret, CodecError> {
    SecretCodec::new(passphrase).encrypt(plaintext)
}

/// Decrypt a `(payload, iv)` pair under `passphrase` with the production derivation.
pub fn decrypt(
    payload: &str,
    iv: &str,
    passphrase: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    SecretCodec::new(passphrase).decrypt(payload, iv)
}
