//! `pwvault rotate-passphrase`: change the vault master passphrase.
//!
//! Unlocks with the current passphrase, generates a new salt, derives a
//! new key (optionally with a different KDF) and rewrites the vault
//! atomically.

use crate::cli::output;
use crate::cli::{audit, open_session, prompt_new_passphrase, AuditOp, Cli, NEW_PASSPHRASE_ENV};
use crate::config::KdfChoice;
use crate::errors::Result;

/// Execute the `rotate-passphrase` command.
pub fn execute(cli: &Cli, kdf: Option<KdfChoice>) -> Result<()> {
    // 1. Open the vault with the current passphrase.
    output::info("Enter your current vault passphrase.");
    let (session, settings) = open_session(cli)?;

    // 2. Resolve the KDF, if switching.
    let params = match kdf {
        Some(choice) => Some(settings.with_kdf(choice).kdf_params()?),
        None => None,
    };

    // 3. Prompt for the new passphrase.
    output::info("Choose your new vault passphrase.");
    let new_passphrase = prompt_new_passphrase(NEW_PASSPHRASE_ENV)?;

    // 4. Re-key and save atomically.
    session.change_passphrase(new_passphrase.as_bytes(), params)?;

    audit(session.path(), AuditOp::RotatePassphrase, None, None);
    output::success("Vault passphrase changed.");

    Ok(())
}
