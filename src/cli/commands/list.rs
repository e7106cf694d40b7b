//! `pwvault list`: show entries in a table, optionally filtered.

use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::Result;
use crate::vault::{ListFilter, SortOrder};

/// Execute the `list` command.
pub fn execute(
    cli: &Cli,
    category: Option<String>,
    tag: Option<String>,
    newest_first: bool,
) -> Result<()> {
    let (session, _settings) = open_session(cli)?;

    let filter = ListFilter {
        category,
        tag,
        order: sort_order(newest_first),
    };
    let entries = session.list(&filter)?;

    output::print_entries_table(&entries);
    if !entries.is_empty() {
        output::info(&format!("{} entries", entries.len()));
    }

    Ok(())
}

pub(crate) fn sort_order(newest_first: bool) -> SortOrder {
    if newest_first {
        SortOrder::NewestFirst
    } else {
        SortOrder::OldestFirst
    }
}
