//! End-to-end tests for `Session`: unlock, lock, auto-lock, and the
//! TOTP second factor against real vault files.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pwvault::crypto::{totp, KdfParams};
use pwvault::errors::VaultError;
use pwvault::session::{LockState, Session, SessionConfig};
use pwvault::vault::{format, EntryPatch, NewEntry, SortOrder};
use tempfile::TempDir;

const FAST: KdfParams = KdfParams::Pbkdf2Sha256 { iterations: 10_000 };

fn vault_in(dir: &TempDir) -> PathBuf {
    dir.path().join("vault.pwv")
}

fn no_auto_lock() -> SessionConfig {
    SessionConfig {
        auto_lock_after: Duration::ZERO,
        ..SessionConfig::default()
    }
}

fn salt_on_disk(path: &Path) -> Vec<u8> {
    let bytes = format::read_envelope(path).unwrap();
    format::parse_header(&bytes).unwrap().salt.to_vec()
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[test]
fn create_add_lock_unlock_search() {
    let dir = TempDir::new().unwrap();
    let path = vault_in(&dir);

    let session = Session::create(&path, b"correct-horse", FAST, no_auto_lock()).unwrap();
    session
        .add(NewEntry::new("Gmail", "p@ss1").username("a@b.com"))
        .unwrap();
    session.lock();
    assert_eq!(session.state(), LockState::Locked);

    session.unlock(b"correct-horse", None).unwrap();
    let hits = session.search("gmail", SortOrder::OldestFirst).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Gmail");
    assert_eq!(hits[0].username.as_deref(), Some("a@b.com"));
    assert_eq!(hits[0].secret, "p@ss1");

    let other = Session::new(&path, no_auto_lock());
    let err = other.unlock(b"wrong-horse", None).unwrap_err();
    assert!(matches!(err, VaultError::WrongPassphraseOrCorrupt));
    assert_eq!(other.state(), LockState::Locked);
}

#[test]
fn idle_session_auto_locks() {
    let dir = TempDir::new().unwrap();
    let config = SessionConfig {
        auto_lock_after: Duration::from_secs(1),
        ..SessionConfig::default()
    };
    let session = Session::create(vault_in(&dir), b"correct-horse", FAST, config).unwrap();

    sleep(Duration::from_millis(1500));
    let err = session.search("x", SortOrder::OldestFirst).unwrap_err();
    assert!(matches!(err, VaultError::VaultLocked));
    assert_eq!(session.state(), LockState::Locked);
}

#[test]
fn activity_pushes_back_the_deadline() {
    let dir = TempDir::new().unwrap();
    let config = SessionConfig {
        auto_lock_after: Duration::from_secs(1),
        ..SessionConfig::default()
    };
    let session = Session::create(vault_in(&dir), b"correct-horse", FAST, config).unwrap();

    sleep(Duration::from_millis(500));
    session.search("x", SortOrder::OldestFirst).unwrap();
    sleep(Duration::from_millis(700));
    session.search("x", SortOrder::OldestFirst).unwrap();
    assert_eq!(session.state(), LockState::Unlocked);
}

#[test]
fn locked_session_refuses_every_operation() {
    let dir = TempDir::new().unwrap();
    let session = Session::create(vault_in(&dir), b"correct-horse", FAST, no_auto_lock()).unwrap();
    let id = session.add(NewEntry::new("Gmail", "p@ss1")).unwrap();
    session.lock();

    assert!(matches!(session.get(&id), Err(VaultError::VaultLocked)));
    assert!(matches!(
        session.update(&id, EntryPatch::default()),
        Err(VaultError::VaultLocked)
    ));
    assert!(matches!(
        session.search("gmail", SortOrder::OldestFirst),
        Err(VaultError::VaultLocked)
    ));
    assert!(matches!(session.remove(&id), Err(VaultError::VaultLocked)));
    assert!(matches!(session.export(), Err(VaultError::VaultLocked)));
}

#[test]
fn mutations_survive_a_fresh_session() {
    let dir = TempDir::new().unwrap();
    let path = vault_in(&dir);
    let session = Session::create(&path, b"correct-horse", FAST, no_auto_lock()).unwrap();

    let id = session.add(NewEntry::new("Bank", "1234")).unwrap();
    session
        .update(
            &id,
            EntryPatch {
                notes: Some(Some("branch 42".into())),
                ..EntryPatch::default()
            },
        )
        .unwrap();
    drop(session);

    let reopened = Session::new(&path, no_auto_lock());
    reopened.unlock(b"correct-horse", None).unwrap();
    let entry = reopened.get(&id).unwrap();
    assert_eq!(entry.notes.as_deref(), Some("branch 42"));

    reopened.remove(&id).unwrap();
    assert!(matches!(reopened.remove(&id), Err(VaultError::NotFound(_))));
}

#[test]
fn totp_unlock_paths() {
    let dir = TempDir::new().unwrap();
    let path = vault_in(&dir);
    let session = Session::create(&path, b"correct-horse", FAST, no_auto_lock()).unwrap();
    let secret = session.enable_totp().unwrap();
    session.lock();

    assert!(matches!(
        session.unlock(b"correct-horse", None),
        Err(VaultError::SecondFactorRequired)
    ));
    assert!(matches!(
        session.unlock(b"correct-horse", Some("12ab")),
        Err(VaultError::SecondFactorInvalid)
    ));

    let good = totp::generate(&secret, now()).unwrap();
    let wrong = if good == "000000" { "111111" } else { "000000" };
    // A wrong code may still fall inside the ±1 step window by chance;
    // only check it when it does not.
    if !totp::verify(&secret, wrong, now()) {
        assert!(matches!(
            session.unlock(b"correct-horse", Some(wrong)),
            Err(VaultError::SecondFactorInvalid)
        ));
        assert_eq!(session.state(), LockState::Locked);
    }

    session.unlock(b"correct-horse", Some(&good)).unwrap();
    assert_eq!(session.state(), LockState::Unlocked);
    assert!(session.status().totp_enrolled);
}

#[test]
fn required_second_factor_without_enrollment() {
    let dir = TempDir::new().unwrap();
    let path = vault_in(&dir);
    Session::create(&path, b"correct-horse", FAST, no_auto_lock()).unwrap();

    let strict = Session::new(
        &path,
        SessionConfig {
            totp_required: true,
            ..no_auto_lock()
        },
    );
    assert!(matches!(
        strict.unlock(b"correct-horse", None),
        Err(VaultError::SecondFactorRequired)
    ));
    assert_eq!(strict.state(), LockState::Locked);
}

#[test]
fn change_passphrase_rekeys_the_file() {
    let dir = TempDir::new().unwrap();
    let path = vault_in(&dir);
    let session = Session::create(&path, b"correct-horse", FAST, no_auto_lock()).unwrap();
    session.add(NewEntry::new("Gmail", "p@ss1")).unwrap();
    session.change_passphrase(b"battery-staple", None).unwrap();
    drop(session);

    let reopened = Session::new(&path, no_auto_lock());
    assert!(matches!(
        reopened.unlock(b"correct-horse", None),
        Err(VaultError::WrongPassphraseOrCorrupt)
    ));
    reopened.unlock(b"battery-staple", None).unwrap();
    assert_eq!(reopened.status().entry_count, 1);
}

#[test]
fn saves_keep_the_salt_and_rotation_replaces_it() {
    let dir = TempDir::new().unwrap();
    let path = vault_in(&dir);
    let session = Session::create(&path, b"correct-horse", FAST, no_auto_lock()).unwrap();
    let created = salt_on_disk(&path);

    let id = session.add(NewEntry::new("Gmail", "p@ss1")).unwrap();
    session
        .update(
            &id,
            EntryPatch {
                notes: Some(Some("recovery codes".into())),
                ..EntryPatch::default()
            },
        )
        .unwrap();
    assert_eq!(salt_on_disk(&path), created);

    session.change_passphrase(b"battery-staple", None).unwrap();
    let rotated = salt_on_disk(&path);
    assert_ne!(rotated, created);

    session.add(NewEntry::new("GitHub", "p@ss2")).unwrap();
    assert_eq!(salt_on_disk(&path), rotated);
}

#[test]
fn clearing_the_totp_flag_on_disk_is_detected() {
    // Byte 6 of the header holds the flags; bit 0 marks TOTP enrolment.
    const FLAGS_BYTE: usize = 6;

    let dir = TempDir::new().unwrap();
    let path = vault_in(&dir);
    let session = Session::create(&path, b"correct-horse", FAST, no_auto_lock()).unwrap();
    session.enable_totp().unwrap();
    session.lock();
    drop(session);

    let mut bytes = fs::read(&path).unwrap();
    assert_eq!(bytes[FLAGS_BYTE] & 1, 1);
    bytes[FLAGS_BYTE] &= !1;
    fs::write(&path, &bytes).unwrap();

    let session = Session::new(&path, no_auto_lock());
    assert!(matches!(
        session.unlock(b"correct-horse", None),
        Err(VaultError::WrongPassphraseOrCorrupt)
    ));
    assert_eq!(session.state(), LockState::Locked);
}

#[test]
fn missing_vault_file_is_a_storage_error() {
    let dir = TempDir::new().unwrap();
    let session = Session::new(dir.path().join("absent.pwv"), no_auto_lock());
    assert!(matches!(
        session.unlock(b"correct-horse", None),
        Err(VaultError::StorageIoFailure(_))
    ));
}
