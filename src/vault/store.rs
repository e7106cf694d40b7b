//! The decrypted, in-memory collection of entries.
//!
//! `EntryStore` knows nothing about sessions or files. The session
//! manager owns one while the vault is unlocked and is the only path
//! through which callers reach it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use zeroize::Zeroize;

use super::entry::{EntryPatch, NewEntry, PasswordEntry, DEFAULT_CATEGORY};
use crate::errors::{Result, VaultError};

/// Result ordering for `list` and `search`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// `created_at` ascending, ties broken by id.
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Optional filters for `list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub order: SortOrder,
}

/// Counts returned by `import_json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub replaced: usize,
}

/// In-memory map of entry id -> entry.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EntryStore {
    entries: HashMap<String, PasswordEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from decoded entries. Later duplicates of an id win.
    pub fn from_entries(entries: Vec<PasswordEntry>) -> Self {
        let entries = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self { entries }
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Add a new entry and return its freshly assigned id.
    pub fn add(&mut self, new: NewEntry) -> Result<String> {
        let entry = PasswordEntry::from_new(new)?;
        let id = entry.id.clone();
        self.entries.insert(id.clone(), entry);
        Ok(id)
    }

    /// Apply `patch` to the entry with `id`.
    pub fn update(&mut self, id: &str, patch: EntryPatch) -> Result<()> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?
            .apply(patch)
    }

    pub fn remove(&mut self, id: &str) -> Result<()> {
        match self.entries.remove(id) {
            Some(_) => Ok(()),
            None => Err(VaultError::NotFound(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Result<&PasswordEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Resolve a full id or a unique id prefix.
    ///
    /// Returns `NotFound` when nothing or more than one entry matches.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String> {
        if self.entries.contains_key(id_or_prefix) {
            return Ok(id_or_prefix.to_string());
        }
        if id_or_prefix.is_empty() {
            return Err(VaultError::NotFound(String::new()));
        }
        let mut matches = self.entries.keys().filter(|k| k.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id.clone()),
            _ => Err(VaultError::NotFound(id_or_prefix.to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Case-insensitive substring search, oldest first.
    pub fn search(&self, query: &str, order: SortOrder) -> Vec<&PasswordEntry> {
        let needle = query.to_lowercase();
        let hits = self.entries.values().filter(|e| e.matches(&needle)).collect();
        sorted(hits, order)
    }

    /// All entries, optionally filtered by category and/or tag.
    pub fn list(&self, filter: &ListFilter) -> Vec<&PasswordEntry> {
        let hits = self
            .entries
            .values()
            .filter(|e| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |c| e.in_category(c))
            })
            .filter(|e| filter.tag.as_deref().map_or(true, |t| e.has_tag(t)))
            .collect();
        sorted(hits, filter.order)
    }

    /// Entries in canonical (oldest first) order.
    pub fn entries(&self) -> Vec<&PasswordEntry> {
        sorted(self.entries.values().collect(), SortOrder::OldestFirst)
    }

    /// Distinct categories in use, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self.entries.values().map(|e| e.category.clone()).collect();
        cats.sort();
        cats.dedup();
        cats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------

    /// Plaintext JSON dump of every entry, oldest first.
    ///
    /// The output is unencrypted; callers must warn the user.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries())
            .map_err(|e| VaultError::SerializationError(format!("export: {e}")))
    }

    /// Merge entries from a JSON array produced by `export_json`.
    ///
    /// Every record is validated before anything is applied, so a bad
    /// record leaves the store untouched.
    pub fn import_json(&mut self, data: &str) -> Result<ImportSummary> {
        let records: Vec<ImportRecord> = serde_json::from_str(data)
            .map_err(|e| VaultError::InvalidEntry(format!("import data is not valid: {e}")))?;

        let now = Utc::now();
        let mut prepared = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            prepared.push(record.into_entry(index, now)?);
        }

        let mut summary = ImportSummary::default();
        for (mut entry, has_created_at) in prepared {
            match self.entries.get(&entry.id) {
                Some(existing) => {
                    if !has_created_at {
                        entry.created_at = existing.created_at;
                    }
                    summary.replaced += 1;
                }
                None => summary.added += 1,
            }
            self.entries.insert(entry.id.clone(), entry);
        }
        Ok(summary)
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn sorted(mut entries: Vec<&PasswordEntry>, order: SortOrder) -> Vec<&PasswordEntry> {
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    if order == SortOrder::NewestFirst {
        entries.reverse();
    }
    entries
}

/// Lenient shape used for import; required fields are checked by hand
/// so the error can name the offending record.
#[derive(Deserialize)]
struct ImportRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, alias = "password")]
    secret: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl ImportRecord {
    /// Validate and convert. The flag reports whether the record carried
    /// its own `created_at`.
    fn into_entry(mut self, index: usize, now: DateTime<Utc>) -> Result<(PasswordEntry, bool)> {
        let title = match self.title.take() {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                return Err(VaultError::InvalidEntry(format!(
                    "import record {index} is missing a title"
                )))
            }
        };
        let secret = match self.secret.take() {
            Some(s) if !s.is_empty() => s,
            Some(mut s) => {
                s.zeroize();
                return Err(VaultError::InvalidEntry(format!(
                    "import record {index} is missing a secret"
                )));
            }
            None => {
                return Err(VaultError::InvalidEntry(format!(
                    "import record {index} is missing a secret"
                )))
            }
        };

        let entry = PasswordEntry {
            id: self
                .id
                .take()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title,
            username: self.username.take(),
            secret,
            url: self.url.take(),
            notes: self.notes.take(),
            category: self
                .category
                .take()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            tags: std::mem::take(&mut self.tags).into_iter().collect(),
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        };
        Ok((entry, self.created_at.is_some()))
    }
}

impl Drop for ImportRecord {
    fn drop(&mut self) {
        if let Some(secret) = self.secret.as_mut() {
            secret.zeroize();
        }
    }
}
