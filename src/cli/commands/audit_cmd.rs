//! `pwvault audit`: show the audit trail.
//!
//! The trail holds no secrets, so the vault is not unlocked.

use chrono::{DateTime, Duration, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEvent, AuditLog, AuditQuery};
use crate::cli::output;
use crate::cli::{vault_dir, vault_path, AuditOp, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>, entry: Option<&str>) -> Result<()> {
    let dir = vault_dir(&vault_path(cli)?);
    let log = AuditLog::open(&dir).ok_or_else(|| {
        VaultError::AuditError(format!("cannot open audit database in {}", dir.display()))
    })?;

    let query = AuditQuery {
        limit: last,
        since: since.map(cutoff).transpose()?,
        entry_id: entry.map(str::to_owned),
    };
    let events = log.query(&query)?;

    if events.is_empty() {
        output::info("No audit events recorded.");
        return Ok(());
    }
    print_events(&events);
    Ok(())
}

/// Turn "7d", "24h" or "30m" into the instant that long ago.
fn cutoff(age: &str) -> Result<DateTime<Utc>> {
    let age = age.trim();
    let invalid = || {
        VaultError::CommandFailed(format!(
            "invalid duration '{age}': expected a number followed by d, h or m"
        ))
    };

    let (split, _) = age.char_indices().last().ok_or_else(invalid)?;
    let (amount, unit) = age.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let span = match unit {
        "d" => Duration::days(amount),
        "h" => Duration::hours(amount),
        "m" => Duration::minutes(amount),
        _ => return Err(invalid()),
    };
    Ok(Utc::now() - span)
}

fn print_events(events: &[AuditEvent]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Entry", "Details"]);

    for event in events {
        table.add_row(vec![
            event.at.format("%Y-%m-%d %H:%M:%S").to_string(),
            styled_op(&event.op),
            event
                .entry_id
                .as_deref()
                .map_or("-", output::short_id)
                .to_string(),
            event.note.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!("{}", style(format!("{} audit events", events.len())).bold());
    println!("{table}");
}

fn styled_op(name: &str) -> String {
    let Some(op) = AuditOp::from_name(name) else {
        return name.to_string();
    };
    let styled = style(name);
    let styled = match op {
        AuditOp::Init | AuditOp::Add => styled.green(),
        AuditOp::Show | AuditOp::Copy | AuditOp::Edit => styled.blue(),
        AuditOp::Delete | AuditOp::UnlockFailed => styled.red(),
        AuditOp::Export | AuditOp::Import => styled.cyan(),
        AuditOp::RotatePassphrase | AuditOp::TotpEnable | AuditOp::TotpDisable => styled.yellow(),
    };
    styled.to_string()
}
