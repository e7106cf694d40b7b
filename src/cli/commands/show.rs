//! `pwvault show`: print one entry, or copy its secret.

use crate::cli::output;
use crate::cli::{audit, clipboard, open_session, AuditOp, Cli};
use crate::errors::Result;

/// Execute the `show` command.
pub fn execute(cli: &Cli, id: &str, copy: bool) -> Result<()> {
    let (session, settings) = open_session(cli)?;

    let id = session.resolve(id)?;
    let entry = session.get(&id)?;

    if copy {
        output::print_entry(&entry, false);
        audit(session.path(), AuditOp::Copy, Some(&id), None);
        // Nothing else needs the vault; lock before blocking on the timer.
        session.lock();

        let clear_after = settings.clipboard_clear_after();
        output::success(&format!(
            "Secret copied. Clipboard clears in {}s.",
            clear_after.as_secs()
        ));
        clipboard::copy_and_clear(&entry.secret, clear_after)?;
    } else {
        output::print_entry(&entry, true);
        audit(session.path(), AuditOp::Show, Some(&id), None);
    }

    Ok(())
}
