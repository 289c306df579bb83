//! Key derivation from the server-held master passphrase.
//!
//! # Known limitation
//!
//! [`FixedSaltScrypt`] uses one application-wide salt. The same passphrase
//! therefore always yields the same key, which lets a restarted process decrypt
//! earlier rows without persisting key material, but rules out per-record
//! salts. Replace the [`KeyDerivation`] implementation to change that; call
//! sites only see the trait.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::cipher::CodecError;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Salt shared by every derivation. Changing it orphans all stored rows.
pub const FIXED_SALT: &[u8] = b"sat-cred-salt";

/// scrypt cost parameters used in production (N = 2^14, r = 8, p = 1).
pub const SCRYPT_LOG_N: u8 = 14;
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;

/// A derived 256-bit key. Zeroed when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Turns a passphrase into a symmetric key.
pub trait KeyDerivation: Send + Sync {
    /// Derive a key from `passphrase`. Must be deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyPassphrase`] for an empty passphrase and
    /// [`CodecError::KeyDerivation`] if the underlying function fails.
    fn derive(&self, passphrase: &[u8]) -> Result<DerivedKey, CodecError>;
}

/// scrypt with the application-wide [`FIXED_SALT`].
#[derive(Debug, Clone, Copy)]
pub struct FixedSaltScrypt {
    log_n: u8,
    r: u32,
    p: u32,
}

impl FixedSaltScrypt {
    /// Production cost parameters.
    pub const fn new() -> Self {
        Self {
            log_n: SCRYPT_LOG_N,
            r: SCRYPT_R,
            p: SCRYPT_P,
        }
    }

    /// Custom work factor. Keys derived with a different `log_n` are not
    /// interchangeable with production keys.
    pub const fn with_log_n(log_n: u8) -> Self {
        Self {
            log_n,
            r: SCRYPT_R,
            p: SCRYPT_P,
        }
    }
}

impl Default for FixedSaltScrypt {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDerivation for FixedSaltScrypt {
    fn derive(&self, passphrase: &[u8]) -> Result<DerivedKey, CodecError> {
        if passphrase.is_empty() {
            return Err(CodecError::EmptyPassphrase);
        }
        let params = scrypt::Params::new(self.log_n, self.r, self.p, KEY_LEN)
            .map_err(|e| CodecError::KeyDerivation(e.to_string()))?;

        let mut key = DerivedKey([0u8; KEY_LEN]);
        scrypt::scrypt(passphrase, FIXED_SALT, &params, &mut key.0)
            .map_err(|e| CodecError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }
}
