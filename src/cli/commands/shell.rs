//! `pwvault shell`: a small REPL over one unlocked session.
//!
//! The vault stays unlocked between commands until it is locked by hand
//! or the auto-lock deadline passes; the next command then asks for the
//! passphrase again.

use dialoguer::Input;

use crate::cli::output;
use crate::cli::{audit, clipboard, open_session, prompt_passphrase, AuditOp, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::session::{LockState, Session};
use crate::vault::{ListFilter, SortOrder};

/// One parsed shell line.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    List,
    Search(&'a str),
    Show(&'a str),
    Copy(&'a str),
    Delete(&'a str),
    Status,
    Lock,
    Help,
    Exit,
    Empty,
    Unknown(&'a str),
}

fn parse_line(line: &str) -> Line<'_> {
    let line = line.trim();
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };
    match (cmd, rest) {
        ("", _) => Line::Empty,
        ("ls" | "list", _) => Line::List,
        ("search" | "find", q) if !q.is_empty() => Line::Search(q),
        ("show", id) if !id.is_empty() => Line::Show(id),
        ("copy", id) if !id.is_empty() => Line::Copy(id),
        ("rm" | "delete", id) if !id.is_empty() => Line::Delete(id),
        ("status", _) => Line::Status,
        ("lock", _) => Line::Lock,
        ("help" | "?", _) => Line::Help,
        ("exit" | "quit" | "q", _) => Line::Exit,
        _ => Line::Unknown(line),
    }
}

/// Execute the `shell` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (session, settings) = open_session(cli)?;
    output::success("Vault unlocked. Type `help` for commands.");

    loop {
        let line: String = Input::new()
            .with_prompt("pwvault")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| VaultError::CommandFailed(format!("input: {e}")))?;

        let parsed = parse_line(&line);
        if parsed == Line::Exit {
            break;
        }

        if session.state() == LockState::Locked
            && !matches!(parsed, Line::Empty | Line::Help | Line::Status)
        {
            output::warning("Vault is locked.");
            if let Err(e) = unlock_again(&session) {
                output::error(&e.to_string());
                continue;
            }
        }

        if let Err(e) = run_line(&session, &settings, parsed) {
            output::error(&e.to_string());
        }
    }

    session.lock();
    Ok(())
}

/// The code given on the command line has long expired by now, so a
/// fresh one is always prompted for.
fn unlock_again(session: &Session) -> Result<()> {
    let passphrase = prompt_passphrase()?;
    let code = prompt_code_if_needed(session)?;
    if let Err(e) = session.unlock(passphrase.as_bytes(), code.as_deref()) {
        audit(session.path(), AuditOp::UnlockFailed, None, Some(&e.to_string()));
        return Err(e);
    }
    output::success("Vault unlocked.");
    Ok(())
}

/// Ask for a code only when the vault's header says one is needed.
fn prompt_code_if_needed(session: &Session) -> Result<Option<String>> {
    let data = crate::vault::format::read_envelope(session.path())?;
    let header = crate::vault::format::parse_header(&data)?;
    if !header.totp_enrolled {
        return Ok(None);
    }
    let code: String = Input::new()
        .with_prompt("TOTP code")
        .interact_text()
        .map_err(|e| VaultError::CommandFailed(format!("input: {e}")))?;
    Ok(Some(code.trim().to_string()))
}

fn run_line(session: &Session, settings: &Settings, line: Line<'_>) -> Result<()> {
    match line {
        Line::List => output::print_entries_table(&session.list(&ListFilter::default())?),
        Line::Search(query) => {
            output::print_entries_table(&session.search(query, SortOrder::OldestFirst)?)
        }
        Line::Show(id) => {
            let entry = session.get(&session.resolve(id)?)?;
            output::print_entry(&entry, true);
        }
        Line::Copy(id) => {
            let entry = session.get(&session.resolve(id)?)?;
            audit(session.path(), AuditOp::Copy, Some(&entry.id), None);
            let clear_after = settings.clipboard_clear_after();
            output::info(&format!(
                "Copied '{}'. Clipboard clears in {}s.",
                entry.title,
                clear_after.as_secs()
            ));
            clipboard::copy_and_clear(&entry.secret, clear_after)?;
        }
        Line::Delete(id) => {
            let id = session.resolve(id)?;
            session.remove(&id)?;
            audit(session.path(), AuditOp::Delete, Some(&id), None);
            output::success(&format!("Deleted {}", output::short_id(&id)));
        }
        Line::Status => {
            let status = session.status();
            match status.state {
                LockState::Locked => output::info("locked"),
                LockState::Unlocked => {
                    output::info(&format!("unlocked, {} entries", status.entry_count));
                    if let Some(left) = status.locks_in {
                        output::tip(&format!("auto-lock in {}s", left.as_secs()));
                    }
                }
            }
        }
        Line::Lock => {
            session.lock();
            output::success("Vault locked.");
        }
        Line::Help => print_help(),
        Line::Empty | Line::Exit => {}
        Line::Unknown(text) => {
            output::warning(&format!("unknown command: {text}"));
            print_help();
        }
    }
    Ok(())
}

fn print_help() {
    println!("  list               list entries");
    println!("  search <query>     search entries");
    println!("  show <id>          show an entry with its secret");
    println!("  copy <id>          copy a secret to the clipboard");
    println!("  delete <id>        delete an entry");
    println!("  status             show lock state and auto-lock timer");
    println!("  lock               lock now");
    println!("  exit               leave the shell");
}
