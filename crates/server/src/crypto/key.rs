//! [`KeyMaterial`]: the process-wide base secret for credential encryption.

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Byte length of the key material and of every derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// Errors produced while loading key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyMaterialError {
    /// `ENCRYPTION_KEY` is not set.
    #[error("ENCRYPTION_KEY environment variable is not set")]
    Missing,

    /// The configured value is not valid hex.
    #[error("ENCRYPTION_KEY must be hex-encoded")]
    InvalidHex,

    /// The configured value decodes to the wrong number of bytes.
    #[error("ENCRYPTION_KEY must decode to {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Fixed-size buffer holding exactly [`KEY_LEN`] bytes of key material.
///
/// Read once at startup and shared read-only behind an `Arc` for the process
/// lifetime. The buffer is overwritten with zeroes on drop.
pub struct KeyMaterial(Box<[u8; KEY_LEN]>);

impl KeyMaterial {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError::InvalidLength`] unless `bytes` is exactly
    /// [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyMaterialError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Parse the 64-character hex form used in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError::InvalidHex`] or
    /// [`KeyMaterialError::InvalidLength`] for malformed input.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyMaterialError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim()).map_err(|_| KeyMaterialError::InvalidHex)?,
        );
        Self::from_bytes(&bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Zeroize for KeyMaterial {
    fn zeroize(&mut self) {
        self.0.as_mut_slice().zeroize();
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for KeyMaterial {}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("KeyMaterial([REDACTED])")
    }
}
