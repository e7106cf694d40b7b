//! Integration tests for the pwvault entry store and envelope codec.

use pwvault::crypto::{self, KdfParams, SALT_LEN};
use pwvault::errors::VaultError;
use pwvault::vault::format;
use pwvault::vault::{EntryPatch, EntryStore, ListFilter, NewEntry, SortOrder};
use tempfile::TempDir;

const FAST: KdfParams = KdfParams::Pbkdf2Sha256 { iterations: 10_000 };

fn populated() -> EntryStore {
    let mut store = EntryStore::new();
    store
        .add(
            NewEntry::new("Gmail", "p@ss1")
                .username("a@b.com")
                .category("email")
                .tag("personal"),
        )
        .unwrap();
    store
        .add(
            NewEntry::new("GitHub", "gh-token")
                .url("https://github.com")
                .notes("work account")
                .tag("work"),
        )
        .unwrap();
    store
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[test]
fn encode_decode_reproduces_store() {
    let store = populated();
    let key = crypto::derive(b"correct-horse", &crypto::generate_salt(), &FAST).unwrap();

    let bytes = format::encode(&store, None, &key).unwrap();
    let decoded = format::decode(&bytes, b"correct-horse").unwrap();

    assert_eq!(decoded.store, store);
    assert!(decoded.totp_secret.is_none());
    assert_eq!(decoded.header.kdf, FAST);
}

#[test]
fn wrong_passphrase_is_indistinguishable_from_corruption() {
    let key = crypto::derive(b"correct-horse", &[9u8; SALT_LEN], &FAST).unwrap();
    let bytes = format::encode(&populated(), None, &key).unwrap();

    let wrong = format::decode(&bytes, b"wrong-horse").unwrap_err();

    let mut corrupt = bytes.clone();
    corrupt[format::HEADER_LEN + 3] ^= 0x01;
    let corrupted = format::decode(&corrupt, b"correct-horse").unwrap_err();

    assert!(matches!(wrong, VaultError::WrongPassphraseOrCorrupt));
    assert!(matches!(corrupted, VaultError::WrongPassphraseOrCorrupt));
    assert_eq!(wrong.to_string(), corrupted.to_string());
}

#[test]
fn same_store_encodes_to_different_bytes() {
    let store = populated();
    let key = crypto::derive(b"pw", &[1u8; SALT_LEN], &FAST).unwrap();
    let a = format::encode(&store, None, &key).unwrap();
    let b = format::encode(&store, None, &key).unwrap();

    let ha = format::parse_header(&a).unwrap();
    let hb = format::parse_header(&b).unwrap();
    assert_ne!(ha.nonce, hb.nonce);
    assert_eq!(ha.salt, hb.salt);
    assert_ne!(a[format::HEADER_LEN..], b[format::HEADER_LEN..]);
}

#[test]
fn unknown_version_is_malformed() {
    let key = crypto::derive(b"pw", &[1u8; SALT_LEN], &FAST).unwrap();
    let mut bytes = format::encode(&EntryStore::new(), None, &key).unwrap();
    bytes[4] = 0x09;
    assert!(matches!(
        format::decode(&bytes, b"pw"),
        Err(VaultError::MalformedEnvelope(_))
    ));
    assert!(matches!(
        format::decode(&bytes[..10], b"pw"),
        Err(VaultError::MalformedEnvelope(_))
    ));
}

#[test]
fn write_then_read_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("vault.pwv");
    let key = crypto::derive(b"pw", &[1u8; SALT_LEN], &FAST).unwrap();

    let bytes = format::encode(&populated(), None, &key).unwrap();
    format::write_envelope(&path, &bytes).unwrap();

    let read = format::read_envelope(&path).unwrap();
    assert_eq!(read, bytes);
    assert_eq!(format::decode(&read, b"pw").unwrap().store.len(), 2);
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[test]
fn remove_twice_is_not_found() {
    let mut store = populated();
    let id = store.search("gmail", SortOrder::OldestFirst)[0].id.clone();

    store.remove(&id).unwrap();
    assert!(matches!(store.remove(&id), Err(VaultError::NotFound(_))));
    assert!(matches!(store.get(&id), Err(VaultError::NotFound(_))));
}

#[test]
fn empty_patch_keeps_fields() {
    let mut store = populated();
    let id = store.search("github", SortOrder::OldestFirst)[0].id.clone();
    let before = store.get(&id).unwrap().clone();

    store.update(&id, EntryPatch::default()).unwrap();
    let after = store.get(&id).unwrap();

    assert_eq!(after.title, before.title);
    assert_eq!(after.secret, before.secret);
    assert_eq!(after.url, before.url);
    assert_eq!(after.notes, before.notes);
    assert_eq!(after.tags, before.tags);
    assert_eq!(after.created_at, before.created_at);
}

#[test]
fn search_covers_notes_url_and_tags() {
    let store = populated();
    assert_eq!(store.search("WORK ACC", SortOrder::OldestFirst).len(), 1);
    assert_eq!(store.search("github.com", SortOrder::OldestFirst).len(), 1);
    assert_eq!(store.search("personal", SortOrder::OldestFirst).len(), 1);
    assert_eq!(store.search("g", SortOrder::OldestFirst).len(), 2);
    assert!(store.search("nothing-here", SortOrder::OldestFirst).is_empty());
}

#[test]
fn list_filters_by_category_and_tag() {
    let store = populated();

    let email = store.list(&ListFilter {
        category: Some("EMAIL".into()),
        ..ListFilter::default()
    });
    assert_eq!(email.len(), 1);
    assert_eq!(email[0].title, "Gmail");

    let work = store.list(&ListFilter {
        tag: Some("work".into()),
        ..ListFilter::default()
    });
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].title, "GitHub");

    assert_eq!(store.list(&ListFilter::default()).len(), 2);
}

#[test]
fn export_import_into_fresh_store() {
    let store = populated();
    let json = store.export_json().unwrap();

    let mut fresh = EntryStore::new();
    let summary = fresh.import_json(&json).unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(summary.replaced, 0);
    assert_eq!(fresh, store);

    // Importing the same export again replaces rather than duplicates.
    let again = fresh.import_json(&json).unwrap();
    assert_eq!(again.replaced, 2);
    assert_eq!(fresh.len(), 2);
}

#[test]
fn import_rejects_record_without_secret() {
    let mut store = populated();
    let bad = r#"[{"title": "ok", "secret": "s"}, {"title": "no secret"}]"#;

    let err = store.import_json(bad).unwrap_err();
    assert!(matches!(err, VaultError::InvalidEntry(ref msg) if msg.contains("record 1")));
    assert_eq!(store.len(), 2);
}
