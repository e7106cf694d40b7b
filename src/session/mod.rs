//! Session lifecycle for an unlocked vault.
//!
//! A `Session` is the only way to reach the decrypted `EntryStore`. It
//! holds the master key and entries while unlocked, enforces the
//! auto-lock deadline on every access, and writes the envelope back to
//! disk after each mutation. Locking drops the key and every entry,
//! which zeroize themselves on drop.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, totp, KdfParams, MasterKey};
use crate::errors::{Result, VaultError};
use crate::vault::format;
use crate::vault::{
    EntryPatch, EntryStore, ImportSummary, ListFilter, NewEntry, PasswordEntry, SortOrder,
};

/// Default idle time before an unlocked session locks itself.
pub const DEFAULT_AUTO_LOCK: Duration = Duration::from_secs(300);

/// Recognized session options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time before auto-lock. `Duration::ZERO` disables auto-lock.
    pub auto_lock_after: Duration,
    /// Refuse to unlock a vault that has no second factor enrolled.
    pub totp_required: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_lock_after: DEFAULT_AUTO_LOCK,
            totp_required: false,
        }
    }
}

/// Public view of the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// Snapshot returned by `Session::status`.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: LockState,
    pub started_at: Option<DateTime<Utc>>,
    /// Time left before auto-lock, if unlocked and auto-lock is enabled.
    pub locks_in: Option<Duration>,
    pub entry_count: usize,
    pub totp_enrolled: bool,
}

enum SessionState {
    Locked,
    Unlocked(Box<UnlockedVault>),
}

struct UnlockedVault {
    key: MasterKey,
    store: EntryStore,
    totp_secret: Option<Zeroizing<String>>,
    started_at: DateTime<Utc>,
    last_activity: Instant,
}

impl UnlockedVault {
    fn new(key: MasterKey, store: EntryStore, totp_secret: Option<Zeroizing<String>>) -> Self {
        Self {
            key,
            store,
            totp_secret,
            started_at: Utc::now(),
            last_activity: Instant::now(),
        }
    }

    fn totp(&self) -> Option<&str> {
        self.totp_secret.as_deref().map(String::as_str)
    }
}

/// An owned handle on one vault file.
pub struct Session {
    path: PathBuf,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl Session {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// A locked session for the vault at `path`. Nothing is read until
    /// `unlock`.
    pub fn new(path: impl Into<PathBuf>, config: SessionConfig) -> Self {
        Self {
            path: path.into(),
            config,
            state: Mutex::new(SessionState::Locked),
        }
    }

    /// Create a new, empty vault at `path` and return it unlocked.
    ///
    /// When `config.totp_required` is set a TOTP secret is enrolled
    /// immediately; read it back with `totp_secret`.
    pub fn create(
        path: impl Into<PathBuf>,
        passphrase: &[u8],
        kdf: KdfParams,
        config: SessionConfig,
    ) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            return Err(VaultError::VaultAlreadyExists(path));
        }

        let salt = crypto::generate_salt();
        let key = crypto::derive(passphrase, &salt, &kdf)?;
        let store = EntryStore::new();
        let totp_secret = config
            .totp_required
            .then(|| Zeroizing::new(totp::generate_secret()));

        persist(
            &path,
            &store,
            totp_secret.as_deref().map(String::as_str),
            &key,
        )?;
        info!(path = %path.display(), kdf = kdf.name(), "vault created");

        Ok(Self {
            path,
            config,
            state: Mutex::new(SessionState::Unlocked(Box::new(UnlockedVault::new(
                key,
                store,
                totp_secret,
            )))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Unlock with `passphrase` and, if enrolled, a TOTP code.
    ///
    /// Calling this on an already unlocked session is a no-op. Any
    /// failure leaves the session locked.
    pub fn unlock(&self, passphrase: &[u8], totp_code: Option<&str>) -> Result<()> {
        let mut guard = self.guard();
        self.expire_if_idle(&mut guard);
        if matches!(*guard, SessionState::Unlocked(_)) {
            debug!("unlock requested on an unlocked session");
            return Ok(());
        }

        let data = format::read_envelope(&self.path)?;
        let header = format::parse_header(&data)?;

        // Structural second-factor checks happen before the KDF runs.
        let code = match (header.totp_enrolled, totp_code) {
            (true, None) => return Err(VaultError::SecondFactorRequired),
            (true, Some(code)) if !totp::is_well_formed(code) => {
                return Err(VaultError::SecondFactorInvalid)
            }
            (true, Some(code)) => Some(code),
            (false, _) if self.config.totp_required => {
                warn!(
                    path = %self.path.display(),
                    "vault has no second factor but one is required"
                );
                return Err(VaultError::SecondFactorRequired);
            }
            (false, _) => None,
        };

        let key = crypto::derive(passphrase, &header.salt, &header.kdf)?;
        let decoded = match format::decode_with_key(&data, header, key) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(path = %self.path.display(), "unlock failed");
                return Err(e);
            }
        };

        if let Some(code) = code {
            let secret = decoded
                .totp_secret
                .as_deref()
                .map(String::as_str)
                .ok_or(VaultError::SecondFactorInvalid)?;
            if !totp::verify(secret, code, unix_now()) {
                warn!(path = %self.path.display(), "second factor rejected");
                return Err(VaultError::SecondFactorInvalid);
            }
        }

        info!(
            path = %self.path.display(),
            entries = decoded.store.len(),
            "vault unlocked"
        );
        *guard = SessionState::Unlocked(Box::new(UnlockedVault::new(
            decoded.key,
            decoded.store,
            decoded.totp_secret,
        )));
        Ok(())
    }

    /// Drop the key and entries from memory. A no-op when already locked.
    ///
    /// Every mutation has already been written, so nothing is saved here.
    pub fn lock(&self) {
        let mut guard = self.guard();
        if matches!(*guard, SessionState::Unlocked(_)) {
            *guard = SessionState::Locked;
            info!(path = %self.path.display(), "vault locked");
        }
    }

    /// Current state, after applying the auto-lock deadline.
    pub fn state(&self) -> LockState {
        let mut guard = self.guard();
        self.expire_if_idle(&mut guard);
        match *guard {
            SessionState::Locked => LockState::Locked,
            SessionState::Unlocked(_) => LockState::Unlocked,
        }
    }

    /// Lock the session if its idle deadline has passed.
    ///
    /// Returns `true` when this call performed the lock.
    pub fn check_timeout(&self) -> bool {
        let mut guard = self.guard();
        self.expire_if_idle(&mut guard)
    }

    /// Refresh the activity timer without touching any entry.
    pub fn touch(&self) -> Result<()> {
        self.with_unlocked(|_| Ok(()))
    }

    /// Does not count as activity.
    pub fn status(&self) -> SessionStatus {
        let mut guard = self.guard();
        self.expire_if_idle(&mut guard);
        match &*guard {
            SessionState::Locked => SessionStatus {
                state: LockState::Locked,
                started_at: None,
                locks_in: None,
                entry_count: 0,
                totp_enrolled: false,
            },
            SessionState::Unlocked(vault) => SessionStatus {
                state: LockState::Unlocked,
                started_at: Some(vault.started_at),
                locks_in: self.auto_lock_enabled().then(|| {
                    self.config
                        .auto_lock_after
                        .saturating_sub(vault.last_activity.elapsed())
                }),
                entry_count: vault.store.len(),
                totp_enrolled: vault.totp_secret.is_some(),
            },
        }
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    pub fn add(&self, new: NewEntry) -> Result<String> {
        let id = self.mutate(|store| store.add(new))?;
        debug!(id = %id, "entry added");
        Ok(id)
    }

    pub fn update(&self, id: &str, patch: EntryPatch) -> Result<()> {
        self.mutate(|store| store.update(id, patch))?;
        debug!(id = %id, "entry updated");
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.mutate(|store| store.remove(id))?;
        debug!(id = %id, "entry removed");
        Ok(())
    }

    /// A copy of the entry. It does not become invalid on lock, but no
    /// further reads succeed through the session.
    pub fn get(&self, id: &str) -> Result<PasswordEntry> {
        self.with_unlocked(|vault| vault.store.get(id).cloned())
    }

    /// Expand a unique id prefix to the full id.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<String> {
        self.with_unlocked(|vault| vault.store.resolve_id(id_or_prefix))
    }

    pub fn search(&self, query: &str, order: SortOrder) -> Result<Vec<PasswordEntry>> {
        self.with_unlocked(|vault| {
            Ok(vault
                .store
                .search(query, order)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    pub fn list(&self, filter: &ListFilter) -> Result<Vec<PasswordEntry>> {
        self.with_unlocked(|vault| Ok(vault.store.list(filter).into_iter().cloned().collect()))
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        self.with_unlocked(|vault| Ok(vault.store.categories()))
    }

    /// Plaintext JSON of every entry. The caller must warn the user.
    pub fn export(&self) -> Result<Zeroizing<String>> {
        self.with_unlocked(|vault| vault.store.export_json().map(Zeroizing::new))
    }

    pub fn import(&self, data: &str) -> Result<ImportSummary> {
        let summary = self.mutate(|store| store.import_json(data))?;
        info!(
            added = summary.added,
            replaced = summary.replaced,
            "entries imported"
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Second factor and passphrase
    // ------------------------------------------------------------------

    /// Enroll a fresh TOTP secret, replacing any existing one.
    ///
    /// Returns the base32 secret for the user's authenticator.
    pub fn enable_totp(&self) -> Result<Zeroizing<String>> {
        let path = &self.path;
        self.with_unlocked(|vault| {
            let secret = Zeroizing::new(totp::generate_secret());
            persist(path, &vault.store, Some(secret.as_str()), &vault.key)?;
            vault.totp_secret = Some(secret.clone());
            info!(path = %path.display(), "second factor enrolled");
            Ok(secret)
        })
    }

    pub fn disable_totp(&self) -> Result<()> {
        if self.config.totp_required {
            return Err(VaultError::SecondFactorRequired);
        }
        let path = &self.path;
        self.with_unlocked(|vault| {
            if vault.totp_secret.is_none() {
                return Ok(());
            }
            persist(path, &vault.store, None, &vault.key)?;
            vault.totp_secret = None;
            info!(path = %path.display(), "second factor removed");
            Ok(())
        })
    }

    pub fn totp_secret(&self) -> Result<Option<Zeroizing<String>>> {
        self.with_unlocked(|vault| Ok(vault.totp_secret.clone()))
    }

    /// Re-key the vault under a new passphrase with a fresh salt.
    ///
    /// `kdf` defaults to the parameters the vault already uses.
    pub fn change_passphrase(&self, new_passphrase: &[u8], kdf: Option<KdfParams>) -> Result<()> {
        let path = &self.path;
        self.with_unlocked(|vault| {
            let kdf = kdf.unwrap_or_else(|| vault.key.kdf());
            let salt = crypto::generate_salt();
            let key = crypto::derive(new_passphrase, &salt, &kdf)?;
            persist(path, &vault.store, vault.totp(), &key)?;
            vault.key = key;
            info!(path = %path.display(), kdf = kdf.name(), "passphrase changed");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn guard(&self) -> MutexGuard<'_, SessionState> {
        // A panic mid-operation cannot leave a half-applied store: the
        // live store is only replaced after a successful write.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn auto_lock_enabled(&self) -> bool {
        !self.config.auto_lock_after.is_zero()
    }

    fn expire_if_idle(&self, state: &mut SessionState) -> bool {
        let expired = match state {
            SessionState::Unlocked(vault) => {
                self.auto_lock_enabled()
                    && vault.last_activity.elapsed() >= self.config.auto_lock_after
            }
            SessionState::Locked => false,
        };
        if expired {
            *state = SessionState::Locked;
            info!(path = %self.path.display(), "vault auto-locked after inactivity");
        }
        expired
    }

    /// Run `f` against the unlocked vault and refresh activity on success.
    fn with_unlocked<T>(&self, f: impl FnOnce(&mut UnlockedVault) -> Result<T>) -> Result<T> {
        let mut guard = self.guard();
        self.expire_if_idle(&mut guard);
        match &mut *guard {
            SessionState::Locked => Err(VaultError::VaultLocked),
            SessionState::Unlocked(vault) => {
                let out = f(vault)?;
                vault.last_activity = Instant::now();
                Ok(out)
            }
        }
    }

    /// Apply `f` to a copy of the store, write it, then swap it in.
    fn mutate<T>(&self, f: impl FnOnce(&mut EntryStore) -> Result<T>) -> Result<T> {
        let path = &self.path;
        self.with_unlocked(|vault| {
            let mut next = vault.store.clone();
            let out = f(&mut next)?;
            persist(path, &next, vault.totp(), &vault.key)?;
            vault.store = next;
            Ok(out)
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.lock();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn persist(
    path: &Path,
    store: &EntryStore,
    totp_secret: Option<&str>,
    key: &MasterKey,
) -> Result<()> {
    let bytes = format::encode(store, totp_secret, key)?;
    format::write_envelope(path, &bytes)
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}
