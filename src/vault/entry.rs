//! Password entry types stored inside a vault.
//!
//! `PasswordEntry` is the persisted record. `NewEntry` is what callers
//! hand to `add`, and `EntryPatch` describes a partial update. The
//! `secret` and `notes` fields are wiped from memory when an entry is
//! dropped.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::errors::{Result, VaultError};

/// Category assigned when none is given.
pub const DEFAULT_CATEGORY: &str = "general";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A single credential record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordEntry {
    /// Stable identifier (UUID v4). Never changes once assigned.
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// The stored secret. Older exports call this field `password`.
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PasswordEntry {
    /// Build a fresh entry with a new id and both timestamps set to now.
    pub fn from_new(new: NewEntry) -> Result<Self> {
        new.validate()?;
        let NewEntry {
            title,
            secret,
            username,
            url,
            notes,
            category,
            tags,
        } = new;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            username,
            secret,
            url,
            notes,
            category: category.unwrap_or_else(default_category),
            tags,
            created_at: now,
            updated_at: now,
        })
    }

    /// Case-insensitive substring match over the searchable fields.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        let fields = [
            Some(self.title.as_str()),
            self.username.as_deref(),
            self.url.as_deref(),
            self.notes.as_deref(),
            Some(self.category.as_str()),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|f| f.to_lowercase().contains(needle))
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }

    /// Returns `true` if the entry carries `tag` (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }

    /// Category comparison, folded the same way as `matches`.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.to_lowercase() == category.to_lowercase()
    }

    /// Apply a patch in place and bump `updated_at`.
    pub fn apply(&mut self, patch: EntryPatch) -> Result<()> {
        patch.validate()?;
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(secret) = patch.secret {
            self.secret.zeroize();
            self.secret = secret;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(notes) = patch.notes {
            if let Some(old) = self.notes.as_mut() {
                old.zeroize();
            }
            self.notes = notes;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Drop for PasswordEntry {
    fn drop(&mut self) {
        self.secret.zeroize();
        if let Some(notes) = self.notes.as_mut() {
            notes.zeroize();
        }
    }
}

impl std::fmt::Debug for PasswordEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordEntry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("url", &self.url)
            .field("category", &self.category)
            .field("tags", &self.tags)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Input for creating an entry. `title` and `secret` are required.
#[derive(Default, Clone)]
pub struct NewEntry {
    pub title: String,
    pub secret: String,
    pub username: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub tags: BTreeSet<String>,
}

impl NewEntry {
    pub fn new(title: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(VaultError::InvalidEntry("title cannot be empty".into()));
        }
        if self.secret.is_empty() {
            return Err(VaultError::InvalidEntry("secret cannot be empty".into()));
        }
        Ok(())
    }
}

/// A partial update. `None` leaves a field untouched; for optional
/// fields `Some(None)` clears the value.
#[derive(Default, Clone)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub username: Option<Option<String>>,
    pub secret: Option<String>,
    pub url: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub category: Option<String>,
    pub tags: Option<BTreeSet<String>>,
}

impl EntryPatch {
    /// Returns `true` if the patch changes no field.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.username.is_none()
            && self.secret.is_none()
            && self.url.is_none()
            && self.notes.is_none()
            && self.category.is_none()
            && self.tags.is_none()
    }

    fn validate(&self) -> Result<()> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(VaultError::InvalidEntry("title cannot be empty".into()));
        }
        if self.secret.as_deref().is_some_and(str::is_empty) {
            return Err(VaultError::InvalidEntry("secret cannot be empty".into()));
        }
        Ok(())
    }
}
