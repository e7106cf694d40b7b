//! The in-memory master key.

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::{KdfParams, KEY_LEN, SALT_LEN};

/// A 32-byte master key that zeroes its memory when dropped.
///
/// The key remembers the salt and KDF parameters it was derived with,
/// so the envelope codec can write a header that re-derives it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
    salt: [u8; SALT_LEN],
    #[zeroize(skip)]
    kdf: KdfParams,
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes and its derivation context.
    pub fn new(bytes: [u8; KEY_LEN], salt: [u8; SALT_LEN], kdf: KdfParams) -> Self {
        Self { bytes, salt, kdf }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"<redacted>")
            .field("kdf", &self.kdf)
            .finish()
    }
}
