use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;
use crate::errors::{Result, VaultError};
use crate::session::SessionConfig;

/// Which password-based KDF new vaults use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfChoice {
    #[default]
    Pbkdf2,
    Argon2id,
}

/// Vault-level configuration, loaded from `config.toml` next to the vault.
///
/// Every field has a sensible default so pwvault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Idle seconds before an unlocked session locks (0 disables).
    #[serde(default = "default_auto_lock_secs")]
    pub auto_lock_secs: u64,

    /// Require a TOTP code on every unlock.
    #[serde(default)]
    pub totp_required: bool,

    /// KDF for newly created vaults and passphrase rotation.
    #[serde(default)]
    pub kdf: KdfChoice,

    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Seconds before a copied secret is cleared from the clipboard.
    #[serde(default = "default_clipboard_clear_secs")]
    pub clipboard_clear_secs: u64,
}

impl std::str::FromStr for KdfChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pbkdf2" | "pbkdf2-sha256" => Ok(Self::Pbkdf2),
            "argon2" | "argon2id" => Ok(Self::Argon2id),
            other => Err(format!("unknown KDF '{other}' (expected pbkdf2 or argon2id)")),
        }
    }
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_auto_lock_secs() -> u64 {
    300
}

fn default_pbkdf2_iterations() -> u32 {
    crate::crypto::kdf::DEFAULT_PBKDF2_ITERATIONS
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_clipboard_clear_secs() -> u64 {
    30
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_lock_secs: default_auto_lock_secs(),
            totp_required: false,
            kdf: KdfChoice::default(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            clipboard_clear_secs: default_clipboard_clear_secs(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the vault directory.
    pub const FILE_NAME: &'static str = "config.toml";

    /// Load settings from `<vault_dir>/config.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(vault_dir: &Path) -> Result<Self> {
        let config_path = vault_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "loaded settings");
        Ok(settings)
    }

    /// Session options derived from these settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            auto_lock_after: Duration::from_secs(self.auto_lock_secs),
            totp_required: self.totp_required,
        }
    }

    /// Convert the KDF settings into validated crypto-layer params.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        let params = match self.kdf {
            KdfChoice::Pbkdf2 => KdfParams::Pbkdf2Sha256 {
                iterations: self.pbkdf2_iterations,
            },
            KdfChoice::Argon2id => KdfParams::Argon2id {
                memory_kib: self.argon2_memory_kib,
                iterations: self.argon2_iterations,
                parallelism: self.argon2_parallelism,
            },
        };
        params.validate().map_err(VaultError::ConfigError)?;
        Ok(params)
    }

    /// Same settings with a different KDF choice.
    pub fn with_kdf(&self, kdf: KdfChoice) -> Self {
        Self {
            kdf,
            ..self.clone()
        }
    }

    pub fn clipboard_clear_after(&self) -> Duration {
        Duration::from_secs(self.clipboard_clear_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.auto_lock_secs, 300);
        assert!(!s.totp_required);
        assert_eq!(s.kdf, KdfChoice::Pbkdf2);
        assert_eq!(s.pbkdf2_iterations, 600_000);
        assert_eq!(s.clipboard_clear_secs, 30);
        assert_eq!(s.kdf_params().unwrap(), KdfParams::default());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.auto_lock_secs, 300);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
auto_lock_secs = 60
totp_required = true
kdf = "argon2id"
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
clipboard_clear_secs = 10
"#;
        fs::write(tmp.path().join("config.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(
            settings.session_config(),
            SessionConfig {
                auto_lock_after: Duration::from_secs(60),
                totp_required: true,
            }
        );
        assert_eq!(
            settings.kdf_params().unwrap(),
            KdfParams::Argon2id {
                memory_kib: 131_072,
                iterations: 5,
                parallelism: 8,
            }
        );
        assert_eq!(settings.clipboard_clear_after(), Duration::from_secs(10));
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "pbkdf2_iterations = 100000\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(
            settings.kdf_params().unwrap(),
            KdfParams::Pbkdf2Sha256 { iterations: 100_000 }
        );
        assert_eq!(settings.auto_lock_secs, 300);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(VaultError::ConfigError(_))));
    }

    #[test]
    fn kdf_choice_parses_names() {
        assert_eq!("PBKDF2".parse::<KdfChoice>().unwrap(), KdfChoice::Pbkdf2);
        assert_eq!("argon2".parse::<KdfChoice>().unwrap(), KdfChoice::Argon2id);
        assert!("scrypt".parse::<KdfChoice>().is_err());

        let argon = Settings::default().with_kdf(KdfChoice::Argon2id);
        assert_eq!(argon.kdf_params().unwrap(), KdfParams::argon2id_default());
    }

    #[test]
    fn weak_kdf_is_a_config_error() {
        let s = Settings {
            pbkdf2_iterations: 1_000,
            ..Settings::default()
        };
        assert!(matches!(s.kdf_params(), Err(VaultError::ConfigError(_))));
    }
}
