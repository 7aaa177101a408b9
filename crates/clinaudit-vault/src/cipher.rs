//! Identifier record encryption.
//!
//! XChaCha20-Poly1305 with a fresh random 24-byte nonce per record. The
//! nonce is prefixed to the ciphertext so a record is a single opaque blob.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use clinaudit_model::VaultError;
use rand::RngCore;

const NONCE_LEN: usize = 24;

pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| VaultError::Crypto)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);
    let ciphertext = cipher.encrypt(nonce, plaintext).map_err(|_| VaultError::Crypto)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

pub fn decrypt(key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, VaultError> {
    if blob.len() <= NONCE_LEN {
        return Err(VaultError::Crypto);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| VaultError::Crypto)?;
    cipher
        .decrypt(XNonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| VaultError::Crypto)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_authenticates() {
        let key = [9u8; 32];
        let blob = encrypt(&key, b"nhs_number=AB123").expect("encrypt");
        assert_eq!(decrypt(&key, &blob).expect("decrypt"), b"nhs_number=AB123");

        // Tampering must fail closed.
        let mut forged = blob.clone();
        let last = forged.len() - 1;
        forged[last] ^= 0x01;
        assert_eq!(decrypt(&key, &forged), Err(VaultError::Crypto));

        // Wrong key likewise.
        assert_eq!(decrypt(&[0u8; 32], &blob), Err(VaultError::Crypto));
    }

    #[test]
    fn each_record_gets_a_fresh_nonce() {
        let key = [9u8; 32];
        let a = encrypt(&key, b"same").expect("encrypt");
        let b = encrypt(&key, b"same").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let key = [9u8; 32];
        assert_eq!(decrypt(&key, &[0u8; 10]), Err(VaultError::Crypto));
    }
}
