//! Vault module: entries, the in-memory store, and the on-disk envelope.
//!
//! This module provides:
//! - `PasswordEntry`, `NewEntry` and `EntryPatch` (`entry`)
//! - The binary envelope codec with atomic writes (`format`)
//! - `EntryStore`, the decrypted collection with CRUD and search (`store`)

pub mod entry;
pub mod format;
pub mod store;

// Re-export the most commonly used items.
pub use entry::{EntryPatch, NewEntry, PasswordEntry, DEFAULT_CATEGORY};
pub use format::{DecodedVault, EnvelopeHeader};
pub use store::{EntryStore, ImportSummary, ListFilter, SortOrder};
