//! `pwvault edit`: change fields of an existing entry.
//!
//! Only the flags given are changed. Passing an empty string for
//! `--username`, `--url` or `--notes` clears that field.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{audit, open_session, prompt_secret, AuditOp, Cli};
use crate::errors::{Result, VaultError};
use crate::generator::{self, GeneratorOptions};
use crate::vault::EntryPatch;

/// Fields collected from the command line.
pub struct EditArgs {
    pub id: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub prompt_secret: bool,
    pub generate: Option<usize>,
}

/// Execute the `edit` command.
pub fn execute(cli: &Cli, args: EditArgs) -> Result<()> {
    if args.prompt_secret && args.generate.is_some() {
        return Err(VaultError::CommandFailed(
            "use either --secret or --generate, not both".into(),
        ));
    }

    let (session, _settings) = open_session(cli)?;
    let id = session.resolve(&args.id)?;

    let secret = if let Some(length) = args.generate {
        Some(Zeroizing::new(generator::generate(&GeneratorOptions {
            length,
            ..GeneratorOptions::default()
        })?))
    } else if args.prompt_secret {
        Some(prompt_secret()?)
    } else {
        None
    };

    let patch = EntryPatch {
        title: args.title,
        username: args.username.map(clearable),
        secret: secret.as_ref().map(|s| s.to_string()),
        url: args.url.map(clearable),
        notes: args.notes.map(clearable),
        category: args.category,
        tags: (!args.tags.is_empty()).then(|| args.tags.into_iter().collect()),
    };

    if patch.is_empty() {
        output::info("Nothing to change.");
        output::tip("Pass --title, --username, --secret, ... to edit fields.");
        return Ok(());
    }

    session.update(&id, patch)?;
    audit(session.path(), AuditOp::Edit, Some(&id), None);
    output::success(&format!("Updated entry {}", output::short_id(&id)));

    Ok(())
}

/// An empty value clears an optional field.
fn clearable(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
