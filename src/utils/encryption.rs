use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Nonce,
};

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("Invalid encryption key: must be a 64-character hexadecimal string")]
    InvalidKey,
    #[error("Encryption error")]
    Encrypt,
    #[error("Decryption error")]
    Decrypt,
}

/// AES-256-GCM encryption of the API keys stored with chat model configs
#[derive(Clone)]
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl Encryptor {
    pub fn new(key: &str) -> Result<Self, EncryptionError> {
        let key_bytes = hex::decode(key).map_err(|_| EncryptionError::InvalidKey)?;
        let cipher =
            Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| EncryptionError::InvalidKey)?;
        Ok(Self { cipher })
    }

    /// Returns `(ciphertext, nonce)`
    pub fn encrypt_string(&self, plaintext: &str) -> Result<(Vec<u8>, Vec<u8>), EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::Encrypt)?;

        Ok((ciphertext, nonce.to_vec()))
    }

    pub fn decrypt_string(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<String, EncryptionError> {
        if nonce.len() != 12 {
            return Err(EncryptionError::Decrypt);
        }
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| EncryptionError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| EncryptionError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn encrypts_and_decrypts_api_key() {
        let encryptor = Encryptor::new(KEY).unwrap();
        let (ciphertext, nonce) = encryptor.encrypt_string("sk-test").unwrap();
        assert_ne!(ciphertext, b"sk-test");
        assert_eq!(encryptor.decrypt_string(&ciphertext, &nonce).unwrap(), "sk-test");
    }

    #[test]
    fn rejects_invalid_keys() {
        assert!(matches!(Encryptor::new("not-hex"), Err(EncryptionError::InvalidKey)));
        assert!(matches!(Encryptor::new("abcd"), Err(EncryptionError::InvalidKey)));
    }

    #[test]
    fn rejects_tampered_ciphertext_and_bad_nonce() {
        let encryptor = Encryptor::new(KEY).unwrap();
        let (mut ciphertext, nonce) = encryptor.encrypt_string("sk-test").unwrap();
        assert!(encryptor.decrypt_string(&ciphertext, &nonce[..4]).is_err());
        ciphertext[0] ^= 0xff;
        assert!(encryptor.decrypt_string(&ciphertext, &nonce).is_err());
    }
}
