//! Password-based key derivation.
//!
//! Two KDFs are supported, selected per vault and recorded in the
//! envelope header so an existing vault always re-derives with the
//! exact parameters it was written with:
//!
//! - PBKDF2-HMAC-SHA256 (default, 600 000 iterations)
//! - Argon2id (memory-hard, 64 MB / 3 iterations / 4 lanes by default)

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use super::keys::MasterKey;
use crate::errors::{Result, VaultError};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;

/// Minimum PBKDF2 iteration count accepted anywhere.
pub const MIN_PBKDF2_ITERATIONS: u32 = 10_000;

/// Upper bound on PBKDF2 iterations read from a file.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// Minimum safe Argon2 memory cost in KiB (8 MB).
pub const MIN_ARGON2_MEMORY_KIB: u32 = 8_192;

/// Upper bound on Argon2 memory read from a file (4 GB).
pub const MAX_ARGON2_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Upper bound on Argon2 iterations and lanes read from a file.
const MAX_ARGON2_PASSES: u32 = 64;

/// KDF selection plus its tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParams {
    Pbkdf2Sha256 {
        iterations: u32,
    },
    Argon2id {
        /// Memory cost in KiB.
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Argon2id with the default cost (64 MB, 3 iterations, 4 lanes).
    pub fn argon2id_default() -> Self {
        Self::Argon2id {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }

    /// Short algorithm name for display.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 { .. } => "pbkdf2-sha256",
            Self::Argon2id { .. } => "argon2id",
        }
    }

    /// Check the parameters against the accepted range.
    ///
    /// Returns a human-readable reason on failure; callers wrap it in
    /// the error variant that fits their context.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match *self {
            Self::Pbkdf2Sha256 { iterations } => {
                if !(MIN_PBKDF2_ITERATIONS..=MAX_PBKDF2_ITERATIONS).contains(&iterations) {
                    return Err(format!(
                        "PBKDF2 iterations must be between {MIN_PBKDF2_ITERATIONS} and {MAX_PBKDF2_ITERATIONS} (got {iterations})"
                    ));
                }
            }
            Self::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => {
                if !(MIN_ARGON2_MEMORY_KIB..=MAX_ARGON2_MEMORY_KIB).contains(&memory_kib) {
                    return Err(format!(
                        "Argon2 memory_kib must be between {MIN_ARGON2_MEMORY_KIB} and {MAX_ARGON2_MEMORY_KIB} (got {memory_kib})"
                    ));
                }
                if !(1..=MAX_ARGON2_PASSES).contains(&iterations) {
                    return Err(format!(
                        "Argon2 iterations must be between 1 and {MAX_ARGON2_PASSES} (got {iterations})"
                    ));
                }
                if !(1..=MAX_ARGON2_PASSES).contains(&parallelism) {
                    return Err(format!(
                        "Argon2 parallelism must be between 1 and {MAX_ARGON2_PASSES} (got {parallelism})"
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Derive a 32-byte master key from a passphrase and salt.
///
/// The same passphrase + salt + params always produce the same key.
/// A wrong passphrase is not detected here: it yields a different key
/// that the cipher later rejects.
pub fn derive(passphrase: &[u8], salt: &[u8; SALT_LEN], params: &KdfParams) -> Result<MasterKey> {
    params.validate().map_err(VaultError::KeyDerivationFailed)?;

    let mut key = [0u8; KEY_LEN];
    match *params {
        KdfParams::Pbkdf2Sha256 { iterations } => {
            pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut key);
        }
        KdfParams::Argon2id {
            memory_kib,
            iterations,
            parallelism,
        } => {
            let argon_params = Params::new(memory_kib, iterations, parallelism, Some(KEY_LEN))
                .map_err(|e| {
                    VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}"))
                })?;
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);
            argon2
                .hash_password_into(passphrase, salt, &mut key)
                .map_err(|e| {
                    VaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
                })?;
        }
    }

    let master = MasterKey::new(key, *salt, *params);
    key.zeroize();
    Ok(master)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
