//! Copy a secret to the system clipboard and clear it after a timeout.

use std::thread;
use std::time::Duration;

use arboard::Clipboard;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Copy `secret`, block for `clear_after`, then clear the clipboard if
/// it still holds `secret`. Something the user copied in the meantime is
/// left alone.
pub fn copy_and_clear(secret: &str, clear_after: Duration) -> Result<()> {
    let mut clipboard =
        Clipboard::new().map_err(|e| VaultError::ClipboardError(format!("unavailable: {e}")))?;
    clipboard
        .set_text(secret.to_owned())
        .map_err(|e| VaultError::ClipboardError(format!("copy failed: {e}")))?;

    if clear_after.is_zero() {
        return Ok(());
    }

    thread::sleep(clear_after);

    let current = clipboard.get_text().map(Zeroizing::new);
    if matches!(&current, Ok(text) if text.as_str() == secret) {
        clipboard
            .clear()
            .map_err(|e| VaultError::ClipboardError(format!("clear failed: {e}")))?;
        tracing::debug!("clipboard cleared");
    }
    Ok(())
}
