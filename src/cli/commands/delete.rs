//! `pwvault delete`: remove an entry from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{audit, open_session, AuditOp, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let (session, _settings) = open_session(cli)?;
    let id = session.resolve(id)?;
    let title = session.get(&id)?.title.clone();

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete entry '{title}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    session.remove(&id)?;

    audit(session.path(), AuditOp::Delete, Some(&id), Some(&title));
    output::success(&format!("Deleted entry '{title}'"));

    Ok(())
}
