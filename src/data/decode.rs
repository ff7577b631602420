//! Dataset decoders
//!
//! Sealed files are `nonce (12 bytes) || ChaCha20-Poly1305 ciphertext` of a
//! CSV document. The 32-byte key is read base64-encoded from
//! [`DATA_KEY_ENV`].

use crate::error::{ExplorerError, Result};
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::Rng;
use std::path::Path;

/// Environment variable holding the base64 dataset key
pub const DATA_KEY_ENV: &str = "KNN_EXPLORER_DATA_KEY";

/// File extension marking a sealed dataset
pub const SEALED_EXTENSION: &str = "enc";

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Turns the raw bytes of a dataset file into CSV text
pub trait DatasetDecoder: Send + Sync {
    fn name(&self) -> &str;

    fn decode(&self, raw: Vec<u8>) -> Result<Vec<u8>>;
}

/// Unencrypted CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCsv;

impl DatasetDecoder for PlainCsv {
    fn name(&self) -> &str {
        "plain csv"
    }

    fn decode(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        Ok(raw)
    }
}

/// CSV sealed with ChaCha20-Poly1305
#[derive(Clone)]
pub struct SealedCsv {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for SealedCsv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedCsv").finish_non_exhaustive()
    }
}

impl SealedCsv {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Build from a base64-encoded 32-byte key
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ExplorerError::DecodeError(format!("dataset key is not base64: {}", e)))?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            ExplorerError::DecodeError(format!(
                "dataset key must be {} bytes, got {}",
                KEY_LEN,
                b.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// Read the key from [`DATA_KEY_ENV`]
    pub fn from_env() -> Result<Self> {
        let encoded = std::env::var(DATA_KEY_ENV).map_err(|_| {
            ExplorerError::DecodeError(format!("{} is not set", DATA_KEY_ENV))
        })?;
        Self::from_base64(&encoded)
    }

    /// Generate a random key, base64-encoded
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill(&mut key);
        base64::engine::general_purpose::STANDARD.encode(key)
    }

    /// Seal plaintext with a fresh random nonce
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| ExplorerError::DecodeError(e.to_string()))?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| ExplorerError::DecodeError(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(payload)
    }
}

impl DatasetDecoder for SealedCsv {
    fn name(&self) -> &str {
        "sealed csv"
    }

    fn decode(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        if raw.len() < NONCE_LEN {
            return Err(ExplorerError::DecodeError("sealed dataset too short".to_string()));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| ExplorerError::DecodeError(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ExplorerError::DecodeError("sealed dataset failed authentication".to_string()))
    }
}

/// Pick the decoder for a dataset path by its extension
pub fn decoder_for_path(path: &Path) -> Result<Box<dyn DatasetDecoder>> {
    let sealed = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(SEALED_EXTENSION))
        .unwrap_or(false);

    if sealed {
        Ok(Box::new(SealedCsv::from_env()?))
    } else {
        Ok(Box::new(PlainCsv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_open() {
        let sealed = SealedCsv::from_base64(&SealedCsv::generate_key()).unwrap();
        let csv = b"a,b\n1,2\n".to_vec();
        let payload = sealed.seal(&csv).unwrap();
        assert_ne!(&payload[NONCE_LEN..], csv.as_slice());
        assert_eq!(sealed.decode(payload).unwrap(), csv);
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = SealedCsv::from_base64(&SealedCsv::generate_key()).unwrap();
        let b = SealedCsv::from_base64(&SealedCsv::generate_key()).unwrap();
        let payload = a.seal(b"x,y\n").unwrap();
        assert!(matches!(b.decode(payload), Err(ExplorerError::DecodeError(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let sealed = SealedCsv::new([7u8; KEY_LEN]);
        assert!(sealed.decode(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_bad_key_length() {
        let short = base64::engine::general_purpose::STANDARD.encode([1u8; 16]);
        assert!(SealedCsv::from_base64(&short).is_err());
        assert!(SealedCsv::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(PlainCsv.decode(b"a\n1\n".to_vec()).unwrap(), b"a\n1\n".to_vec());
        let decoder = decoder_for_path(Path::new("data/main.csv")).unwrap();
        assert_eq!(decoder.name(), "plain csv");
    }
}
