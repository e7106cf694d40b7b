use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in pwvault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Unlock errors ---
    /// The auth tag did not verify. Wrong passphrase and a tampered or
    /// corrupted file are reported identically.
    #[error("Wrong passphrase or corrupted vault")]
    WrongPassphraseOrCorrupt,

    #[error("This vault requires a TOTP code")]
    SecondFactorRequired,

    #[error("Invalid TOTP code")]
    SecondFactorInvalid,

    // --- Session errors ---
    #[error("Vault is locked")]
    VaultLocked,

    // --- Entry errors ---
    #[error("Entry '{0}' not found")]
    NotFound(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    // --- Vault file errors ---
    #[error("Malformed vault envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Storage error: {0}")]
    StorageIoFailure(#[from] std::io::Error),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Passphrases do not match")]
    PasswordMismatch,

    #[error("Audit error: {0}")]
    AuditError(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("Password generator error: {0}")]
    GeneratorError(String),
}

/// Convenience type alias for pwvault results.
pub type Result<T> = std::result::Result<T, VaultError>;
