//! AES-256-GCM encryption of brokerage secrets with PBKDF2-derived per-token keys.
//!
//! Every call draws a fresh 16-byte IV and 64-byte salt from the OS CSPRNG and
//! derives its own AES key with PBKDF2-HMAC-SHA512 over the process key
//! material. Nothing is shared between calls except the read-only key
//! material, so a [`CredentialCipher`] can be used from any number of threads.
//!
//! **Never reuse an IV or salt.** GCM nonce reuse under the same key breaks
//! both confidentiality and authentication.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aes::Aes256;
use aes_gcm::{
    aead::{consts::U16, rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    AesGcm, Nonce, Tag,
};
use hmac::Hmac;
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroizing;

use super::key::{KeyMaterial, KeyMaterialError, KEY_LEN};

/// Byte length of the per-token IV. A 16-byte GCM nonce is folded through
/// GHASH into the initial counter block, matching OpenSSL.
pub const IV_LEN: usize = 16;

/// Byte length of the per-token PBKDF2 salt.
pub const SALT_LEN: usize = 64;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// PBKDF2 rounds. Not recorded in the token: changing it orphans every stored row.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Field separator of the persisted token.
const SEPARATOR: char = ':';

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Errors produced by the cipher layer.
///
/// Messages name the failure category only; they never contain plaintext,
/// key material or token contents.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Key material is absent or malformed.
    #[error("encryption is not configured: {0}")]
    Configuration(#[from] KeyMaterialError),

    /// The AEAD primitive refused to encrypt.
    #[error("failed to encrypt data")]
    Encryption,

    /// The token is not four colon-separated hex fields of the expected lengths.
    #[error("invalid encrypted data format")]
    InvalidTokenFormat,

    /// GCM tag verification failed: tampered token or wrong key material.
    #[error("failed to decrypt data")]
    AuthenticationFailure,
}

/// A parsed credential token.
///
/// The string form is `<iv>:<salt>:<auth_tag>:<ciphertext>`, each field
/// lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherToken {
    pub iv: [u8; IV_LEN],
    pub salt: [u8; SALT_LEN],
    pub auth_tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for CipherToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            hex::encode(self.iv),
            hex::encode(self.salt),
            hex::encode(self.auth_tag),
            hex::encode(&self.ciphertext),
        )
    }
}

impl FromStr for CipherToken {
    type Err = CipherError;

    /// Parse a persisted token.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidTokenFormat`] unless the string splits into
    /// exactly four hex fields with a 16-byte IV, 64-byte salt and 16-byte tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [iv, salt, auth_tag, ciphertext] = parts.as_slice() else {
            return Err(CipherError::InvalidTokenFormat);
        };

        Ok(Self {
            iv: decode_fixed(iv)?,
            salt: decode_fixed(salt)?,
            auth_tag: decode_fixed(auth_tag)?,
            ciphertext: hex::decode(ciphertext).map_err(|_| CipherError::InvalidTokenFormat)?,
        })
    }
}

fn decode_fixed<const N: usize>(field: &str) -> Result<[u8; N], CipherError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(field, &mut out).map_err(|_| CipherError::InvalidTokenFormat)?;
    Ok(out)
}

/// Encrypts and decrypts brokerage secrets with the process key material.
///
/// Cheap to clone; clones share the same key material. A cipher built without
/// key material fails every operation with [`CipherError::Configuration`].
#[derive(Clone, Debug, Default)]
pub struct CredentialCipher {
    key: Option<Arc<KeyMaterial>>,
}

impl CredentialCipher {
    /// Create a cipher over the given key material.
    pub fn new(key: KeyMaterial) -> Self {
        Self {
            key: Some(Arc::new(key)),
        }
    }

    /// Create a cipher with no key material.
    pub fn unconfigured() -> Self {
        Self { key: None }
    }

    /// Build a cipher from the optional hex-encoded configuration value.
    ///
    /// `None` yields an unconfigured cipher.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyMaterialError`] if a value is present but malformed.
    pub fn from_hex(hex_key: Option<&str>) -> Result<Self, KeyMaterialError> {
        match hex_key {
            Some(h) => Ok(Self::new(KeyMaterial::from_hex(h)?)),
            None => Ok(Self::unconfigured()),
        }
    }

    /// Returns `true` if key material is loaded.
    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Encrypt `plaintext` into a fresh token string.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Configuration`] without key material and
    /// [`CipherError::Encryption`] if the AEAD primitive fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let key = self.key_material()?;

        let mut iv = [0u8; IV_LEN];
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut iv);
        OsRng.fill_bytes(&mut salt);

        let aead = build_aead(key, &salt)?;
        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = aead
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| CipherError::Encryption)?;

        let mut auth_tag = [0u8; TAG_LEN];
        auth_tag.copy_from_slice(tag.as_slice());

        let token = CipherToken {
            iv,
            salt,
            auth_tag,
            ciphertext: buffer,
        };
        Ok(token.to_string())
    }

    /// Decrypt a token produced by [`CredentialCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Configuration`] without key material,
    /// [`CipherError::InvalidTokenFormat`] for a malformed token, and
    /// [`CipherError::AuthenticationFailure`] when the tag does not verify.
    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let key = self.key_material()?;
        let token: CipherToken = token.parse()?;

        let aead = build_aead(key, &token.salt)?;
        let mut buffer = token.ciphertext;
        aead.decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&token.iv),
            b"",
            &mut buffer,
            Tag::from_slice(&token.auth_tag),
        )
        .map_err(|_| CipherError::AuthenticationFailure)?;

        String::from_utf8(buffer).map_err(|_| CipherError::InvalidTokenFormat)
    }

    fn key_material(&self) -> Result<&KeyMaterial, CipherError> {
        self.key
            .as_deref()
            .ok_or(CipherError::Configuration(KeyMaterialError::Missing))
    }
}

/// Derive the per-token AES key from the key material and `salt`, then build the AEAD.
///
/// The derived key is wiped on return; the AES key schedule inside the AEAD
/// is wiped when the AEAD is dropped.
fn build_aead(key: &KeyMaterial, salt: &[u8]) -> Result<Aes256Gcm16, CipherError> {
    let mut derived = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha512>>(key.as_bytes(), salt, PBKDF2_ITERATIONS, derived.as_mut_slice())
        .map_err(|_| CipherError::Encryption)?;
    Aes256Gcm16::new_from_slice(derived.as_slice()).map_err(|_| CipherError::Encryption)
}

/// Generate fresh key material for provisioning `ENCRYPTION_KEY`: 32 random
/// bytes, lowercase hex.
pub fn generate_key_material() -> String {
    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(bytes.as_mut_slice());
    hex::encode(bytes.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_key_cipher() -> CredentialCipher {
        CredentialCipher::from_hex(Some(&"00".repeat(KEY_LEN))).unwrap()
    }

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }

    /// Replace the hex digit at `pos` of field `field` with a different digit.
    fn flip_hex_char(token: &str, field: usize, pos: usize) -> String {
        let mut parts: Vec<String> = token.split(':').map(str::to_owned).collect();
        let mut chars: Vec<char> = parts[field].chars().collect();
        chars[pos] = if chars[pos] == '0' { '1' } else { '0' };
        parts[field] = chars.into_iter().collect();
        parts.join(":")
    }

    #[test]
    fn hunter2_round_trip_with_zero_key() {
        let cipher = zero_key_cipher();
        let token = cipher.encrypt("hunter2").unwrap();

        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].len(), 32);
        assert_eq!(parts[1].len(), 128);
        assert_eq!(parts[2].len(), 32);
        assert!(!parts[3].is_empty());
        assert!(parts.iter().all(|p| is_lower_hex(p)));

        assert_eq!(cipher.decrypt(&token).unwrap(), "hunter2");
    }

    #[test]
    fn decrypts_token_written_by_existing_deployments() {
        // iv = 00..0f, salt = 0xab * 64, key material = 32 zero bytes.
        let token = concat!(
            "000102030405060708090a0b0c0d0e0f:",
            "abababababababababababababababababababababababababababababababab",
            "abababababababababababababababababababababababababababababababab:",
            "ca7dea8abb838cd6fae11f9f08454c14:",
            "028eba7b8637d3",
        );
        assert_eq!(zero_key_cipher().decrypt(token).unwrap(), "hunter2");
    }

    #[test]
    fn empty_and_multibyte_plaintexts_round_trip() {
        let cipher = zero_key_cipher();
        for plaintext in ["", "pässwörd", "株式 📈 ₿"] {
            let token = cipher.encrypt(plaintext).unwrap();
            assert_eq!(cipher.decrypt(&token).unwrap(), plaintext);
        }
    }

    #[test]
    fn empty_plaintext_has_empty_ciphertext_field() {
        let token = zero_key_cipher().encrypt("").unwrap();
        assert!(token.ends_with(':'));
        assert_eq!(token.split(':').count(), 4);
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let cipher = zero_key_cipher();
        let a = cipher.encrypt("same secret").unwrap();
        let b = cipher.encrypt("same secret").unwrap();
        assert_ne!(a, b);

        let (pa, pb): (CipherToken, CipherToken) = (a.parse().unwrap(), b.parse().unwrap());
        assert_ne!(pa.iv, pb.iv);
        assert_ne!(pa.salt, pb.salt);

        assert_eq!(cipher.decrypt(&a).unwrap(), "same secret");
        assert_eq!(cipher.decrypt(&b).unwrap(), "same secret");
    }

    #[test]
    fn tampered_tag_fails_auth() {
        let cipher = zero_key_cipher();
        let token = cipher.encrypt("tamper me").unwrap();
        for pos in 0..TAG_LEN * 2 {
            let tampered = flip_hex_char(&token, 2, pos);
            assert!(matches!(
                cipher.decrypt(&tampered),
                Err(CipherError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let cipher = zero_key_cipher();
        let token = cipher.encrypt("tamper me").unwrap();
        let len = token.split(':').nth(3).unwrap().len();
        assert_eq!(len, "tamper me".len() * 2);
        for pos in 0..len {
            let tampered = flip_hex_char(&token, 3, pos);
            assert!(matches!(
                cipher.decrypt(&tampered),
                Err(CipherError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn tampered_iv_or_salt_fails_auth() {
        let cipher = zero_key_cipher();
        let token = cipher.encrypt("tamper me").unwrap();
        for field in [0, 1] {
            let tampered = flip_hex_char(&token, field, 5);
            assert!(matches!(
                cipher.decrypt(&tampered),
                Err(CipherError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn wrong_key_fails_auth() {
        let token = zero_key_cipher().encrypt("secret").unwrap();
        let other = CredentialCipher::from_hex(Some(&"11".repeat(KEY_LEN))).unwrap();
        assert!(matches!(
            other.decrypt(&token),
            Err(CipherError::AuthenticationFailure)
        ));
    }

    #[test]
    fn rejects_malformed_tokens() {
        let cipher = zero_key_cipher();
        let valid = cipher.encrypt("x").unwrap();
        let fields: Vec<&str> = valid.split(':').collect();

        let cases = [
            "not-a-valid-token".to_owned(),
            "a:b:c".to_owned(),
            format!("{valid}:00"),
            // non-hex iv
            format!("{}:{}:{}:{}", "zz".repeat(16), fields[1], fields[2], fields[3]),
            // 15-byte iv
            format!("{}:{}:{}:{}", &fields[0][2..], fields[1], fields[2], fields[3]),
            // 8-byte tag
            format!("{}:{}:{}:{}", fields[0], fields[1], &fields[2][16..], fields[3]),
            // odd-length ciphertext
            format!("{}:{}:{}:{}0", fields[0], fields[1], fields[2], fields[3]),
        ];
        for case in &cases {
            assert!(
                matches!(cipher.decrypt(case), Err(CipherError::InvalidTokenFormat)),
                "expected InvalidTokenFormat for {case:?}"
            );
        }
    }

    #[test]
    fn missing_key_material_is_a_configuration_error() {
        let cipher = CredentialCipher::unconfigured();
        assert!(!cipher.is_configured());
        assert!(matches!(
            cipher.encrypt("hunter2"),
            Err(CipherError::Configuration(KeyMaterialError::Missing))
        ));
        assert!(matches!(
            cipher.decrypt("a:b:c:d"),
            Err(CipherError::Configuration(KeyMaterialError::Missing))
        ));
    }

    #[test]
    fn from_hex_rejects_malformed_key() {
        assert_eq!(
            CredentialCipher::from_hex(Some("abcd")).unwrap_err(),
            KeyMaterialError::InvalidLength(2)
        );
        assert!(!CredentialCipher::from_hex(None).unwrap().is_configured());
    }

    #[test]
    fn token_string_repr_round_trip() {
        let token = CipherToken {
            iv: [1; IV_LEN],
            salt: [2; SALT_LEN],
            auth_tag: [3; TAG_LEN],
            ciphertext: vec![0xde, 0xad],
        };
        let s = token.to_string();
        assert!(s.ends_with(":dead"));
        assert_eq!(s.parse::<CipherToken>().unwrap(), token);
    }

    #[test]
    fn generated_key_material_is_usable() {
        let a = generate_key_material();
        let b = generate_key_material();
        assert_eq!(a.len(), 2 * KEY_LEN);
        assert!(is_lower_hex(&a));
        assert_ne!(a, b);

        let cipher = CredentialCipher::from_hex(Some(&a)).unwrap();
        let token = cipher.encrypt("hunter2").unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), "hunter2");
    }
}
