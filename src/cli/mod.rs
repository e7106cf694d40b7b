//! CLI module: Clap argument parser, prompts, output helpers, and
//! command implementations.

pub mod clipboard;
pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::{KdfChoice, Settings};
use crate::errors::{Result, VaultError};
use crate::session::Session;

/// Minimum passphrase length to prevent trivially weak passphrases.
const MIN_PASSPHRASE_LEN: usize = 8;

/// Environment variable holding the vault passphrase (scripts, CI).
pub const PASSPHRASE_ENV: &str = "PWVAULT_PASSPHRASE";

/// Environment variable holding the new passphrase for `rotate-passphrase`.
pub const NEW_PASSPHRASE_ENV: &str = "PWVAULT_NEW_PASSPHRASE";

/// pwvault CLI: local encrypted password vault.
#[derive(Parser)]
#[command(name = "pwvault", about = "Local encrypted password vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the vault file (default: ~/.pwvault/vault.pwv)
    #[arg(long, env = "PWVAULT_PATH", global = true)]
    pub vault: Option<PathBuf>,

    /// Current TOTP code, if the vault has a second factor
    #[arg(long, env = "PWVAULT_TOTP", global = true, hide_env_values = true)]
    pub totp: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault
    Init {
        /// Key derivation function: pbkdf2 (default) or argon2id
        #[arg(long)]
        kdf: Option<KdfChoice>,
        /// Enroll a TOTP second factor right away
        #[arg(long)]
        with_totp: bool,
    },

    /// Add an entry (prompts for the secret unless --generate is given)
    Add {
        /// Entry title (e.g. "Gmail")
        title: String,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Generate a random secret of this length instead of prompting
        #[arg(short, long, value_name = "LENGTH", num_args = 0..=1, default_missing_value = "16")]
        generate: Option<usize>,
    },

    /// Show one entry
    Show {
        /// Entry id or unique id prefix
        id: String,
        /// Copy the secret to the clipboard instead of printing it
        #[arg(long)]
        copy: bool,
    },

    /// List entries
    List {
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(long)]
        newest_first: bool,
    },

    /// Search entries by title, username, url, notes, category or tag
    Search {
        query: String,
        #[arg(long)]
        newest_first: bool,
    },

    /// Edit an entry's fields
    Edit {
        /// Entry id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Replace all tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Prompt for a new secret
        #[arg(long)]
        secret: bool,
        /// Replace the secret with a generated one of this length
        #[arg(short, long, value_name = "LENGTH", num_args = 0..=1, default_missing_value = "16")]
        generate: Option<usize>,
    },

    /// Delete an entry
    Delete {
        /// Entry id or unique id prefix
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Generate a password or passphrase (does not touch the vault)
    Generate {
        #[arg(short, long, default_value = "16")]
        length: usize,
        #[arg(long)]
        no_lowercase: bool,
        #[arg(long)]
        no_uppercase: bool,
        #[arg(long)]
        no_digits: bool,
        #[arg(long)]
        no_symbols: bool,
        /// Skip look-alike characters (l, 1, O, 0, ...)
        #[arg(long)]
        exclude_ambiguous: bool,
        /// Generate a passphrase of this many words instead
        #[arg(long, value_name = "WORDS")]
        passphrase: Option<usize>,
        #[arg(long, default_value = "-")]
        separator: String,
    },

    /// Export all entries as plaintext JSON
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import entries from a JSON file produced by `export`
    Import {
        file: PathBuf,
    },

    /// Change the vault's master passphrase
    RotatePassphrase {
        /// Switch to a different KDF while re-keying
        #[arg(long)]
        kdf: Option<KdfChoice>,
    },

    /// Manage the TOTP second factor
    Totp {
        #[command(subcommand)]
        action: TotpAction,
    },

    /// Interactive session that keeps the vault unlocked until it auto-locks
    Shell,

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
        /// Only events for this entry id (or id prefix)
        #[arg(long, value_name = "ID")]
        entry: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// TOTP subcommands.
#[derive(clap::Subcommand)]
pub enum TotpAction {
    /// Enroll (or re-enroll) a second factor and print its secret
    Enable,
    /// Remove the second factor
    Disable,
    /// Print the current code for the enrolled secret
    Code,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the vault file path: `--vault`, `PWVAULT_PATH`, or
/// `~/.pwvault/vault.pwv`.
pub fn vault_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.vault {
        return Ok(path.clone());
    }
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .ok_or_else(|| {
            VaultError::ConfigError("cannot locate home directory; pass --vault".into())
        })?;
    Ok(PathBuf::from(home).join(".pwvault").join("vault.pwv"))
}

/// Directory holding the vault, its `config.toml`, and `audit.db`.
pub fn vault_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load `config.toml` from the vault's directory.
pub fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load(&vault_dir(path))
}

/// Get the vault passphrase from `PWVAULT_PASSPHRASE` or a hidden prompt.
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault passphrase")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation.
///
/// `env_var` lets scripts supply it non-interactively. Enforces a
/// minimum length.
pub fn prompt_new_passphrase(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            if pw.chars().count() < MIN_PASSPHRASE_LEN {
                return Err(VaultError::CommandFailed(format!(
                    "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt("Choose vault passphrase")
            .with_confirmation(
                "Confirm vault passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;

        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

/// Prompt for an entry secret (hidden, confirmed).
pub fn prompt_secret() -> Result<Zeroizing<String>> {
    let secret = dialoguer::Password::new()
        .with_prompt("Secret")
        .with_confirmation("Confirm secret", "Secrets do not match, try again")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("secret prompt: {e}")))?;
    Ok(Zeroizing::new(secret))
}

/// Open and unlock the vault named on the command line.
///
/// Failed unlocks are recorded in the audit log.
pub fn open_session(cli: &Cli) -> Result<(Session, Settings)> {
    let path = vault_path(cli)?;
    let settings = load_settings(&path)?;
    let session = Session::new(&path, settings.session_config());

    let passphrase = prompt_passphrase()?;
    if let Err(e) = session.unlock(passphrase.as_bytes(), cli.totp.as_deref()) {
        audit(&path, AuditOp::UnlockFailed, None, Some(&e.to_string()));
        return Err(e);
    }
    Ok((session, settings))
}

/// Operations the CLI writes to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOp {
    Init,
    Add,
    Show,
    Copy,
    Edit,
    Delete,
    Export,
    Import,
    RotatePassphrase,
    TotpEnable,
    TotpDisable,
    UnlockFailed,
}

impl AuditOp {
    pub const ALL: [AuditOp; 12] = [
        AuditOp::Init,
        AuditOp::Add,
        AuditOp::Show,
        AuditOp::Copy,
        AuditOp::Edit,
        AuditOp::Delete,
        AuditOp::Export,
        AuditOp::Import,
        AuditOp::RotatePassphrase,
        AuditOp::TotpEnable,
        AuditOp::TotpDisable,
        AuditOp::UnlockFailed,
    ];

    /// Name stored in the audit database.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditOp::Init => "init",
            AuditOp::Add => "add",
            AuditOp::Show => "show",
            AuditOp::Copy => "copy",
            AuditOp::Edit => "edit",
            AuditOp::Delete => "delete",
            AuditOp::Export => "export",
            AuditOp::Import => "import",
            AuditOp::RotatePassphrase => "rotate-passphrase",
            AuditOp::TotpEnable => "totp-enable",
            AuditOp::TotpDisable => "totp-disable",
            AuditOp::UnlockFailed => "unlock-failed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

/// Record an audit event. A no-op when built without `audit-log`.
pub fn audit(vault_path: &Path, op: AuditOp, entry_id: Option<&str>, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    crate::audit::record_for_vault(vault_path, op.as_str(), entry_id, details);

    #[cfg(not(feature = "audit-log"))]
    let _ = (vault_path, op, entry_id, details);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(vault: Option<&str>) -> Cli {
        let mut args = vec!["pwvault"];
        if let Some(v) = vault {
            args.extend(["--vault", v]);
        }
        args.push("list");
        Cli::parse_from(args)
    }

    #[test]
    fn explicit_vault_path_wins() {
        let cli = cli_with(Some("/tmp/x/my.pwv"));
        assert_eq!(vault_path(&cli).unwrap(), PathBuf::from("/tmp/x/my.pwv"));
    }

    #[test]
    fn vault_dir_of_bare_file_is_cwd() {
        assert_eq!(vault_dir(Path::new("v.pwv")), PathBuf::from("."));
        assert_eq!(vault_dir(Path::new("/a/b/v.pwv")), PathBuf::from("/a/b"));
    }

    #[test]
    fn generate_flag_defaults_length() {
        let cli = Cli::parse_from(["pwvault", "add", "Gmail", "--generate"]);
        match cli.command {
            Commands::Add { generate, .. } => assert_eq!(generate, Some(16)),
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn audit_op_names_round_trip() {
        for op in AuditOp::ALL {
            assert_eq!(AuditOp::from_name(op.as_str()), Some(op));
        }
        assert_eq!(AuditOp::from_name("set"), None);
    }

    #[test]
    fn kdf_flag_parses() {
        let cli = Cli::parse_from(["pwvault", "init", "--kdf", "argon2id"]);
        match cli.command {
            Commands::Init { kdf, .. } => assert_eq!(kdf, Some(KdfChoice::Argon2id)),
            _ => panic!("expected init"),
        }
    }
}
