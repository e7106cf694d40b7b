//! `pwvault import`: merge entries from a JSON export.
//!
//! Records whose id matches an existing entry replace it; the rest are
//! added. A single invalid record aborts the whole import.

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{audit, open_session, AuditOp, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `import` command.
pub fn execute(cli: &Cli, source: &Path) -> Result<()> {
    if !source.exists() {
        return Err(VaultError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }
    let data = Zeroizing::new(fs::read_to_string(source)?);

    let (session, _settings) = open_session(cli)?;
    let summary = session.import(&data)?;

    audit(
        session.path(),
        AuditOp::Import,
        None,
        Some(&format!(
            "{} added, {} replaced from {}",
            summary.added,
            summary.replaced,
            source.display()
        )),
    );
    output::success(&format!(
        "Imported {} new and {} replaced entries",
        summary.added, summary.replaced
    ));
    output::tip("Delete the plaintext import file once you are done with it.");

    Ok(())
}
