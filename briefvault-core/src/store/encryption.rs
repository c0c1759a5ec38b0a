/*
    encryption.rs - At-rest encryption for record payloads

    Encrypts payload bytes with AES-256-GCM. The key is derived from the
    caller-supplied passphrase with SHA-256 and is never persisted; ids,
    types and timestamps stay in clear so they remain queryable.

    Wire format: 12-byte random nonce prepended to the ciphertext.
*/

use aes_gcm::aead::OsRng;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use sha2::{Digest, Sha256};

use super::errors::{StoreError, StoreResult};

/// Manages encryption/decryption of payloads at rest
pub struct EncryptionManager {
    cipher: Aes256Gcm,
}

impl EncryptionManager {
    /// Create from a caller-supplied key string
    pub fn from_passphrase(passphrase: &str) -> StoreResult<Self> {
        if passphrase.is_empty() {
            return Err(StoreError::Encryption(
                "Encryption key must not be empty".to_string(),
            ));
        }

        let digest = Sha256::digest(passphrase.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        let cipher = Aes256Gcm::new(key);

        Ok(EncryptionManager { cipher })
    }

    /// Encrypt data
    pub fn encrypt(&self, plaintext: &[u8]) -> StoreResult<Vec<u8>> {
        use aes_gcm::aead::rand_core::RngCore;
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| StoreError::Encryption(e.to_string()))?;

        let mut result = nonce_bytes.to_vec();
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Decrypt data
    pub fn decrypt(&self, ciphertext: &[u8]) -> StoreResult<Vec<u8>> {
        if ciphertext.len() < 12 {
            return Err(StoreError::Decryption(
                "Invalid ciphertext length".to_string(),
            ));
        }

        let nonce = Nonce::from_slice(&ciphertext[..12]);

        let plaintext = self
            .cipher
            .decrypt(nonce, &ciphertext[12..])
            .map_err(|e| StoreError::Decryption(e.to_string()))?;

        Ok(plaintext)
    }
}
