//! Credential encryption at rest.
//!
//! This module is free of HTTP and storage dependencies. It provides the
//! encrypt/decrypt operations the credential store calls immediately before
//! writing a row and immediately after reading one.
//!
//! # Token format
//!
//! ```text
//! <iv_hex>:<salt_hex>:<authTag_hex>:<ciphertext_hex>
//! ```
//!
//! iv is 16 bytes, salt 64 bytes, tag 16 bytes, ciphertext any length. The
//! field order and separator are a persisted contract shared with existing
//! rows; the token carries no version field.

pub mod cipher;
pub mod key;

pub use cipher::{generate_key_material, CipherError, CredentialCipher};
pub use key::KeyMaterial;
