//! `pwvault search`: case-insensitive substring search.

use crate::cli::commands::list::sort_order;
use crate::cli::output;
use crate::cli::{open_session, Cli};
use crate::errors::Result;

/// Execute the `search` command.
pub fn execute(cli: &Cli, query: &str, newest_first: bool) -> Result<()> {
    let (session, _settings) = open_session(cli)?;
    let hits = session.search(query, sort_order(newest_first))?;

    if hits.is_empty() {
        output::info(&format!("No entries match '{query}'."));
        return Ok(());
    }

    output::print_entries_table(&hits);
    Ok(())
}
