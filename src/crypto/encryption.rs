//! AES-256-GCM authenticated encryption.
//!
//! The nonce is supplied by the caller (the envelope codec stores it in
//! the header) and optional associated data is authenticated alongside
//! the plaintext. The returned buffer is `ciphertext || 16-byte tag`.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Generate a fresh random 12-byte nonce from the OS RNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut out = [0u8; NONCE_LEN];
    out.copy_from_slice(&nonce);
    out
}

/// Encrypt and authenticate `plaintext` (and `aad`) under a 32-byte key.
pub fn seal(key: &[u8], nonce: &[u8; NONCE_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))
}

/// Verify the tag and decrypt data produced by `seal`.
///
/// Any failure, including a short buffer or a bad key, is reported as
/// `WrongPassphraseOrCorrupt`. There is no partial decryption.
pub fn open(key: &[u8], nonce: &[u8; NONCE_LEN], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < TAG_LEN {
        return Err(VaultError::WrongPassphraseOrCorrupt);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::WrongPassphraseOrCorrupt)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad })
        .map_err(|_| VaultError::WrongPassphraseOrCorrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0xAB; 32];

    #[test]
    fn seal_open_roundtrip_with_aad() {
        let nonce = generate_nonce();
        let sealed = seal(&KEY, &nonce, b"hunter2", b"header").unwrap();
        assert_eq!(sealed.len(), 7 + TAG_LEN);

        let plain = open(&KEY, &nonce, &sealed, b"header").unwrap();
        assert_eq!(plain, b"hunter2");
    }

    #[test]
    fn open_rejects_wrong_key() {
        let nonce = generate_nonce();
        let sealed = seal(&KEY, &nonce, b"hunter2", b"").unwrap();
        let err = open(&[0xCD; 32], &nonce, &sealed, b"").unwrap_err();
        assert!(matches!(err, VaultError::WrongPassphraseOrCorrupt));
    }

    #[test]
    fn open_rejects_modified_aad() {
        let nonce = generate_nonce();
        let sealed = seal(&KEY, &nonce, b"hunter2", b"v1").unwrap();
        assert!(matches!(
            open(&KEY, &nonce, &sealed, b"v2"),
            Err(VaultError::WrongPassphraseOrCorrupt)
        ));
    }

    #[test]
    fn open_rejects_flipped_ciphertext_byte() {
        let nonce = generate_nonce();
        let mut sealed = seal(&KEY, &nonce, b"hunter2", b"").unwrap();
        sealed[0] ^= 0x01;
        assert!(matches!(
            open(&KEY, &nonce, &sealed, b""),
            Err(VaultError::WrongPassphraseOrCorrupt)
        ));
    }

    #[test]
    fn open_rejects_truncated_input() {
        let nonce = generate_nonce();
        assert!(matches!(
            open(&KEY, &nonce, &[0u8; 5], b""),
            Err(VaultError::WrongPassphraseOrCorrupt)
        ));
    }

    #[test]
    fn nonces_are_fresh() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
