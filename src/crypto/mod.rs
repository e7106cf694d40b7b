//! Cryptographic primitives for pwvault.
//!
//! This module provides:
//! - AES-256-GCM sealing and opening with associated data (`encryption`)
//! - PBKDF2 / Argon2id passphrase key derivation (`kdf`)
//! - The zeroize-on-drop `MasterKey` (`keys`)
//! - RFC 6238 TOTP verification for the optional second factor (`totp`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod totp;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive, ...};
pub use encryption::{generate_nonce, open, seal, NONCE_LEN, TAG_LEN};
pub use kdf::{derive, generate_salt, KdfParams, KEY_LEN, SALT_LEN};
pub use keys::MasterKey;
