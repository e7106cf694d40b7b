//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::PasswordEntry;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// First eight characters of an id, enough to type back as a prefix.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Print a table of entries (never their secrets).
pub fn print_entries_table(entries: &[PasswordEntry]) {
    if entries.is_empty() {
        info("No entries found.");
        tip("Run `pwvault add <TITLE>` to add your first entry.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Title", "Username", "Category", "Tags", "Updated"]);

    for e in entries {
        let tags: Vec<&str> = e.tags.iter().map(String::as_str).collect();
        table.add_row(vec![
            short_id(&e.id).to_string(),
            e.title.clone(),
            e.username.clone().unwrap_or_else(|| "-".into()),
            e.category.clone(),
            tags.join(", "),
            e.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print every field of one entry. The secret is shown only when asked.
pub fn print_entry(entry: &PasswordEntry, show_secret: bool) {
    let field = |name: &str, value: &str| {
        println!("{:>10}  {}", style(name).bold(), value);
    };

    field("ID", &entry.id);
    field("Title", &entry.title);
    field("Username", entry.username.as_deref().unwrap_or("-"));
    if show_secret {
        field("Secret", &entry.secret);
    } else {
        field("Secret", &style("********").dim().to_string());
    }
    field("URL", entry.url.as_deref().unwrap_or("-"));
    field("Category", &entry.category);
    if !entry.tags.is_empty() {
        let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
        field("Tags", &tags.join(", "));
    }
    if let Some(notes) = &entry.notes {
        field("Notes", notes);
    }
    field(
        "Created",
        &entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    field(
        "Updated",
        &entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
}
