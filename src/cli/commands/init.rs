//! `pwvault init`: create a new vault, optionally with a TOTP factor.

use std::fs;
use std::path::Path;

use crate::cli::output;
use crate::cli::{
    audit, load_settings, prompt_new_passphrase, vault_dir, vault_path, AuditOp, Cli,
    PASSPHRASE_ENV,
};
use crate::config::KdfChoice;
use crate::crypto::totp;
use crate::errors::{Result, VaultError};
use crate::session::Session;

/// Execute the `init` command.
pub fn execute(cli: &Cli, kdf: Option<KdfChoice>, with_totp: bool) -> Result<()> {
    let path = vault_path(cli)?;
    let dir = vault_dir(&path);

    // 1. Create the vault directory (owner-only) if it doesn't exist.
    if !dir.exists() {
        create_private_dir(&dir)?;
        output::info(&format!("Created vault directory: {}", dir.display()));
    }

    // 2. Refuse to overwrite an existing vault.
    if path.exists() {
        output::tip("Use `pwvault add` to add entries to the existing vault.");
        return Err(VaultError::VaultAlreadyExists(path));
    }

    // 3. Resolve KDF settings and prompt for a passphrase.
    let settings = load_settings(&path)?;
    let settings = match kdf {
        Some(choice) => settings.with_kdf(choice),
        None => settings,
    };
    let params = settings.kdf_params()?;
    let passphrase = prompt_new_passphrase(PASSPHRASE_ENV)?;

    // 4. Create the vault file.
    let session = Session::create(
        &path,
        passphrase.as_bytes(),
        params,
        settings.session_config(),
    )?;
    output::success(&format!(
        "Vault created at {} ({})",
        path.display(),
        params.name()
    ));

    // 5. Second factor, if asked for (or already enrolled by policy).
    let secret = match session.totp_secret()? {
        Some(secret) => Some(secret),
        None if with_totp => Some(session.enable_totp()?),
        None => None,
    };
    if let Some(secret) = secret {
        print_enrollment(&path, &secret);
    }

    audit(&path, AuditOp::Init, None, Some(params.name()));

    output::tip("Run `pwvault add <TITLE>` to add an entry.");
    output::tip("Run `pwvault list` to see all entries.");

    Ok(())
}

/// Show a freshly enrolled TOTP secret.
pub fn print_enrollment(path: &Path, secret: &str) {
    output::info("Second factor enrolled. Add this secret to your authenticator app:");
    println!("  {secret}");
    let account = path
        .file_name()
        .map_or_else(|| "vault".to_string(), |n| n.to_string_lossy().into_owned());
    println!("  {}", totp::provisioning_uri(secret, &account, "pwvault"));
    output::tip("Pass the current code with --totp <CODE> or PWVAULT_TOTP on every unlock.");
}

fn create_private_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)?;
    }
    #[cfg(not(unix))]
    fs::create_dir_all(dir)?;
    Ok(())
}
