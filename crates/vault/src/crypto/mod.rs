//! Passphrase-keyed AES-256-GCM encryption of credential secrets.
//!
//! This module is intentionally free of database and HTTP dependencies.
//!
//! # Stored format
//!
//! ```text
//! payload = base64(ciphertext || tag16)
//! iv      = base64(nonce12)
//! ```
//!
//! Both use the standard padded base64 alphabet, matching rows written by
//! earlier deployments of the service.

pub mod cipher;
pub mod kdf;

pub use cipher::{decrypt, encrypt, CodecError, EncodedSecret, SecretCodec};
pub use kdf::{FixedSaltScrypt, KeyDerivation};
