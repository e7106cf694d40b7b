//! `pwvault export`: dump every entry as plaintext JSON.
//!
//! The output is NOT encrypted. A warning is always printed to stderr.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::cli::output;
use crate::cli::{audit, open_session, AuditOp, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&Path>) -> Result<()> {
    let (session, _settings) = open_session(cli)?;
    let content = session.export()?;
    let count = session.status().entry_count;

    audit(
        session.path(),
        AuditOp::Export,
        None,
        Some(&format!("{count} entries")),
    );

    output::warning("The export is plaintext. Anyone who can read it can read every secret.");

    match output_path {
        Some(dest) => {
            // Refuse to overwrite the vault itself.
            if dest == session.path() {
                return Err(VaultError::CommandFailed(
                    "refusing to export over the vault file".into(),
                ));
            }
            write_private(dest, content.as_bytes())?;
            output::success(&format!("Exported {count} entries to {}", dest.display()));
        }
        None => {
            // Write to stdout (no success message, just raw output).
            println!("{}", content.as_str());
        }
    }

    Ok(())
}

/// Write `bytes` to `path`, creating it owner-only on Unix.
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|e| VaultError::CommandFailed(format!("failed to write export file: {e}")))?;
    // The open mode only applies to new files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(bytes)?;
    Ok(())
}
