//! Field-level encryption for personal data kept in the document store.
//!
//! Ciphertexts are `base64(nonce || AES-256-GCM ciphertext)`. Hashes are
//! keyed (HMAC-SHA256) so they support equality search without decryption.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD}, Engine};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const NONCE_SIZE: usize = 12;

#[derive(Error, Debug, PartialEq)]
pub enum CryptoError {
    #[error("Encryption key must not be empty")]
    InvalidKey,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),
}

/// Encryption collaborator consumed by services holding personal data.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;

    /// Deterministic digest of `plaintext`.
    fn hash(&self, plaintext: &str) -> String;
}

pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
    hasher: HmacSha256,
}

impl AesGcmEncryptor {
    /// Derives the AES-256 key from an arbitrary-length secret with SHA-256.
    pub fn new(secret: &str) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::InvalidKey);
        }

        let key_bytes: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        let hasher = <HmacSha256 as Mac>::new_from_slice(&key_bytes)
            .map_err(|_| CryptoError::InvalidKey)?;

        Ok(Self { cipher, hasher })
    }
}

impl fmt::Debug for AesGcmEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmEncryptor")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Encryptor for AesGcmEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(payload))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        let payload = STANDARD
            .decode(ciphertext)
            .map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))?;

        if payload.len() <= NONCE_SIZE {
            return Err(CryptoError::InvalidCiphertext(format!(
                "expected more than {} bytes, got {}",
                NONCE_SIZE,
                payload.len()
            )));
        }

        let (nonce_bytes, sealed) = payload.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }

    fn hash(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }

        let mut mac = self.hasher.clone();
        mac.update(plaintext.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

/// Keeps the first two and last two characters.
pub fn mask(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 4 {
        let width = if chars.is_empty() { 4 } else { chars.len() };
        return "*".repeat(width);
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 4), tail)
}

/// `010-****-1234` for 11-digit numbers, [`mask`] otherwise.
pub fn mask_phone(phone: &str) -> String {
    if phone.is_empty() {
        return "***-****-****".to_string();
    }

    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 11 {
        return format!("{}-****-{}", &digits[..3], &digits[7..]);
    }

    mask(phone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn encryptor() -> AesGcmEncryptor {
        AesGcmEncryptor::new("test-encryption-key-32-characters").unwrap()
    }

    #[test]
    fn encrypts_with_fresh_nonce_and_decrypts() {
        let encryptor = encryptor();
        let first = encryptor.encrypt("010-1234-5678").unwrap();
        let second = encryptor.encrypt("010-1234-5678").unwrap();

        assert_ne!(first, second);
        assert_ne!(first, "010-1234-5678");
        assert_eq!(encryptor.decrypt(&first).unwrap(), "010-1234-5678");
        assert_eq!(encryptor.decrypt(&second).unwrap(), "010-1234-5678");
    }

    #[test]
    fn empty_values_pass_through() {
        let encryptor = encryptor();
        assert_eq!(encryptor.encrypt("").unwrap(), "");
        assert_eq!(encryptor.decrypt("").unwrap(), "");
        assert_eq!(encryptor.hash(""), "");
    }

    #[test]
    fn rejects_foreign_or_corrupt_ciphertext() {
        let encryptor = encryptor();
        let other = AesGcmEncryptor::new("another-key").unwrap();
        let sealed = other.encrypt("010-1234-5678").unwrap();

        assert_matches!(encryptor.decrypt(&sealed), Err(CryptoError::DecryptionFailed(_)));
        assert_matches!(encryptor.decrypt("not base64!"), Err(CryptoError::InvalidCiphertext(_)));
        assert_matches!(encryptor.decrypt("AAAA"), Err(CryptoError::InvalidCiphertext(_)));
    }

    #[test]
    fn hash_is_deterministic_and_keyed() {
        let encryptor = encryptor();
        let other = AesGcmEncryptor::new("another-key").unwrap();

        assert_eq!(encryptor.hash("01012345678"), encryptor.hash("01012345678"));
        assert_ne!(encryptor.hash("01012345678"), encryptor.hash("01012345679"));
        assert_ne!(encryptor.hash("01012345678"), other.hash("01012345678"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_matches!(AesGcmEncryptor::new(""), Err(CryptoError::InvalidKey));
    }

    #[test]
    fn debug_output_hides_key_material() {
        let rendered = format!("{:?}", encryptor());
        assert_eq!(rendered, "AesGcmEncryptor { key: \"<redacted>\" }");
    }

    #[test]
    fn masks_phone_numbers() {
        assert_eq!(mask_phone("010-1234-5678"), "010-****-5678");
        assert_eq!(mask_phone("01012345678"), "010-****-5678");
        assert_eq!(mask_phone("02-123-4567"), "02*******67");
        assert_eq!(mask_phone(""), "***-****-****");
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask(""), "****");
    }
}
