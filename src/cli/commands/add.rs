//! `pwvault add`: store a new entry.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{audit, open_session, prompt_secret, AuditOp, Cli};
use crate::errors::Result;
use crate::generator::{self, GeneratorOptions};
use crate::vault::NewEntry;

/// Fields collected from the command line.
pub struct AddArgs {
    pub title: String,
    pub username: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub generate: Option<usize>,
}

/// Execute the `add` command.
pub fn execute(cli: &Cli, args: AddArgs) -> Result<()> {
    let (session, _settings) = open_session(cli)?;

    let secret = match args.generate {
        Some(length) => {
            let generated = Zeroizing::new(generator::generate(&GeneratorOptions {
                length,
                ..GeneratorOptions::default()
            })?);
            output::info(&format!("Generated a {length}-character secret."));
            generated
        }
        None => {
            let entered = prompt_secret()?;
            let strength = generator::estimate_strength(&entered);
            if strength.score < 60 {
                output::warning(&format!(
                    "Secret strength: {} ({}/100)",
                    strength.label, strength.score
                ));
            }
            entered
        }
    };

    let mut new = NewEntry::new(args.title, secret.as_str());
    new.username = args.username;
    new.url = args.url;
    new.notes = args.notes;
    new.category = args.category;
    new.tags = args.tags.into_iter().collect();

    let title = new.title.clone();
    let id = session.add(new)?;

    audit(session.path(), AuditOp::Add, Some(&id), Some(&title));
    output::success(&format!("Added '{title}' ({})", output::short_id(&id)));

    Ok(())
}
