//! Binary vault envelope and atomic file I/O.
//!
//! A vault file has this layout (integers little-endian):
//!
//! ```text
//! [PWVT: 4][version: u16][flags: u8][kdf id: u8][kdf params: 3 x u32]
//! [salt: 32][nonce: 12][ciphertext || tag]
//! ```
//!
//! - **Magic** (`PWVT`): identifies the file as a pwvault vault.
//! - **Version**: format version (currently `1`). Unknown versions are rejected.
//! - **Flags**: bit 0 set means a TOTP second factor is enrolled.
//! - **KDF id / params**: `1` = PBKDF2-SHA256 (iterations, 0, 0),
//!   `2` = Argon2id (memory KiB, iterations, parallelism).
//! - **Salt**: fixed at vault creation, replaced only on passphrase change.
//! - **Nonce**: fresh for every write.
//! - **Body**: AES-256-GCM over the JSON payload. The whole 64-byte
//!   header is authenticated as associated data.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

use super::entry::PasswordEntry;
use super::store::EntryStore;
use crate::crypto::{self, KdfParams, MasterKey, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::errors::{Result, VaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"PWVT";

/// Current binary format version.
pub const CURRENT_VERSION: u16 = 1;

/// Total size of the fixed header.
pub const HEADER_LEN: usize = 64;

/// Header flag: a TOTP secret is enrolled.
const FLAG_TOTP: u8 = 0b0000_0001;

const KDF_PBKDF2_SHA256: u8 = 1;
const KDF_ARGON2ID: u8 = 2;

// Field offsets.
const OFF_VERSION: usize = 4;
const OFF_FLAGS: usize = 6;
const OFF_KDF_ID: usize = 7;
const OFF_KDF_PARAMS: usize = 8;
const OFF_SALT: usize = 20;
const OFF_NONCE: usize = OFF_SALT + SALT_LEN;

/// Unix mode for vault files.
const PRIVATE_FILE_MODE: u32 = 0o600;

// ---------------------------------------------------------------------------
// EnvelopeHeader
// ---------------------------------------------------------------------------

/// Parsed fixed-size header of a vault file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub format_version: u16,
    pub totp_enrolled: bool,
    pub kdf: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
}

impl EnvelopeHeader {
    /// Serialize to the fixed 64-byte layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..OFF_VERSION].copy_from_slice(MAGIC);
        buf[OFF_VERSION..OFF_FLAGS].copy_from_slice(&self.format_version.to_le_bytes());
        buf[OFF_FLAGS] = if self.totp_enrolled { FLAG_TOTP } else { 0 };

        let (kdf_id, params) = match self.kdf {
            KdfParams::Pbkdf2Sha256 { iterations } => (KDF_PBKDF2_SHA256, [iterations, 0, 0]),
            KdfParams::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => (KDF_ARGON2ID, [memory_kib, iterations, parallelism]),
        };
        buf[OFF_KDF_ID] = kdf_id;
        for (i, value) in params.iter().enumerate() {
            let start = OFF_KDF_PARAMS + i * 4;
            buf[start..start + 4].copy_from_slice(&value.to_le_bytes());
        }

        buf[OFF_SALT..OFF_NONCE].copy_from_slice(&self.salt);
        buf[OFF_NONCE..HEADER_LEN].copy_from_slice(&self.nonce);
        buf
    }
}

/// Parse and validate the header of a vault file.
///
/// This runs before any key derivation, so a truncated file, a foreign
/// file, or a future format version fails fast.
pub fn parse_header(data: &[u8]) -> Result<EnvelopeHeader> {
    if data.len() < HEADER_LEN + TAG_LEN {
        return Err(VaultError::MalformedEnvelope("file too small to be a valid vault".into()));
    }

    if &data[..OFF_VERSION] != MAGIC {
        return Err(VaultError::MalformedEnvelope("missing PWVT magic bytes".into()));
    }

    let format_version = u16::from_le_bytes([data[OFF_VERSION], data[OFF_VERSION + 1]]);
    if format_version != CURRENT_VERSION {
        return Err(VaultError::MalformedEnvelope(format!(
            "unsupported version {format_version}, expected {CURRENT_VERSION}"
        )));
    }

    let flags = data[OFF_FLAGS];
    if flags & !FLAG_TOTP != 0 {
        return Err(VaultError::MalformedEnvelope(format!(
            "unknown header flags {flags:#04x}"
        )));
    }

    let param = |i: usize| {
        let start = OFF_KDF_PARAMS + i * 4;
        u32::from_le_bytes([
            data[start],
            data[start + 1],
            data[start + 2],
            data[start + 3],
        ])
    };
    let kdf = match data[OFF_KDF_ID] {
        KDF_PBKDF2_SHA256 => KdfParams::Pbkdf2Sha256 {
            iterations: param(0),
        },
        KDF_ARGON2ID => KdfParams::Argon2id {
            memory_kib: param(0),
            iterations: param(1),
            parallelism: param(2),
        },
        other => {
            return Err(VaultError::MalformedEnvelope(format!(
                "unknown KDF id {other}"
            )))
        }
    };
    kdf.validate().map_err(VaultError::MalformedEnvelope)?;

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[OFF_SALT..OFF_NONCE]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[OFF_NONCE..HEADER_LEN]);

    Ok(EnvelopeHeader {
        format_version,
        totp_enrolled: flags & FLAG_TOTP != 0,
        kdf,
        salt,
        nonce,
    })
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The decrypted JSON document inside the envelope.
#[derive(Serialize, Deserialize)]
struct Payload {
    format_version: u16,
    #[serde(default)]
    entries: Vec<PasswordEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    totp_secret: Option<String>,
}

impl Drop for Payload {
    fn drop(&mut self) {
        if let Some(secret) = self.totp_secret.as_mut() {
            secret.zeroize();
        }
    }
}

/// Everything recovered from a successful `decode`.
#[derive(Debug)]
pub struct DecodedVault {
    pub header: EnvelopeHeader,
    pub key: MasterKey,
    pub store: EntryStore,
    pub totp_secret: Option<Zeroizing<String>>,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Serialize and seal `store` (and the TOTP secret, if any) under `key`.
///
/// A fresh random nonce is drawn on every call.
pub fn encode(store: &EntryStore, totp_secret: Option<&str>, key: &MasterKey) -> Result<Vec<u8>> {
    let header = EnvelopeHeader {
        format_version: CURRENT_VERSION,
        totp_enrolled: totp_secret.is_some(),
        kdf: key.kdf(),
        salt: *key.salt(),
        nonce: crypto::generate_nonce(),
    };
    let header_bytes = header.to_bytes();

    let payload = Payload {
        format_version: CURRENT_VERSION,
        entries: store.entries().into_iter().cloned().collect(),
        totp_secret: totp_secret.map(str::to_string),
    };
    let plaintext = Zeroizing::new(
        serde_json::to_vec(&payload)
            .map_err(|e| VaultError::SerializationError(format!("payload: {e}")))?,
    );

    let sealed = crypto::seal(key.as_bytes(), &header.nonce, &plaintext, &header_bytes)?;

    let mut buf = Vec::with_capacity(HEADER_LEN + sealed.len());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&sealed);
    Ok(buf)
}

/// Parse, derive the key from `passphrase`, authenticate and decrypt.
///
/// A wrong passphrase and a modified file both surface as
/// `WrongPassphraseOrCorrupt`.
pub fn decode(data: &[u8], passphrase: &[u8]) -> Result<DecodedVault> {
    let header = parse_header(data)?;
    let key = crypto::derive(passphrase, &header.salt, &header.kdf)?;
    decode_with_key(data, header, key)
}

/// Decrypt with an already-derived key. The key's salt and KDF must
/// match the header.
pub fn decode_with_key(
    data: &[u8],
    header: EnvelopeHeader,
    key: MasterKey,
) -> Result<DecodedVault> {
    let plaintext = Zeroizing::new(crypto::open(
        key.as_bytes(),
        &header.nonce,
        &data[HEADER_LEN..],
        &data[..HEADER_LEN],
    )?);

    let mut payload: Payload = serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::MalformedEnvelope(format!("payload JSON: {e}")))?;
    if payload.format_version != CURRENT_VERSION {
        return Err(VaultError::MalformedEnvelope(format!(
            "unsupported payload version {}",
            payload.format_version
        )));
    }
    if payload.totp_secret.is_some() != header.totp_enrolled {
        return Err(VaultError::MalformedEnvelope(
            "TOTP flag does not match payload".into(),
        ));
    }

    let totp_secret = payload.totp_secret.take().map(Zeroizing::new);
    let store = EntryStore::from_entries(std::mem::take(&mut payload.entries));

    Ok(DecodedVault {
        header,
        key,
        store,
        totp_secret,
    })
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read the raw envelope bytes. A missing file is an I/O error.
pub fn read_envelope(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Write the envelope to disk **atomically** with owner-only permissions.
///
/// 1. Create a temp file in the same directory with mode 0600.
/// 2. Write and fsync it.
/// 3. Rename it over the target path, then fsync the directory.
///
/// The rename ensures readers never see a half-written file. On any
/// failure the temp file is removed and the previous vault is untouched.
pub fn write_envelope(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp_path = temp_path_for(path);
    let result = write_and_rename(&tmp_path, path, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
        return result;
    }

    sync_dir(&parent);
    tracing::debug!(path = %path.display(), size = bytes.len(), "vault written");
    Ok(())
}

fn write_and_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = create_private(tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn create_private(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(PRIVATE_FILE_MODE);
    }
    #[cfg(not(unix))]
    let _ = PRIVATE_FILE_MODE;
    Ok(options.open(path)?)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("vault");
    path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Best effort: persists the rename on filesystems that need it.
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::entry::NewEntry;
    use tempfile::TempDir;

    const FAST: KdfParams = KdfParams::Pbkdf2Sha256 { iterations: 10_000 };

    fn key_for(passphrase: &[u8]) -> MasterKey {
        crypto::derive(passphrase, &[5u8; SALT_LEN], &FAST).unwrap()
    }

    fn sample_store() -> EntryStore {
        let mut store = EntryStore::new();
        store
            .add(NewEntry::new("Gmail", "p@ss1").username("a@b.com"))
            .unwrap();
        store
    }

    #[test]
    fn header_layout_is_64_bytes() {
        let header = EnvelopeHeader {
            format_version: CURRENT_VERSION,
            totp_enrolled: true,
            kdf: KdfParams::Argon2id {
                memory_kib: 65_536,
                iterations: 3,
                parallelism: 4,
            },
            salt: [1; SALT_LEN],
            nonce: [2; NONCE_LEN],
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..4], b"PWVT");
        assert_eq!(bytes[OFF_FLAGS], FLAG_TOTP);
        assert_eq!(bytes[OFF_KDF_ID], KDF_ARGON2ID);

        let mut padded = bytes.to_vec();
        padded.extend_from_slice(&[0u8; TAG_LEN]);
        assert_eq!(parse_header(&padded).unwrap(), header);
    }

    #[test]
    fn decode_roundtrip() {
        let key = key_for(b"pw");
        let store = sample_store();
        let bytes = encode(&store, Some("JBSWY3DPEHPK3PXP"), &key).unwrap();

        let decoded = decode(&bytes, b"pw").unwrap();
        assert_eq!(decoded.store, store);
        assert_eq!(decoded.totp_secret.as_deref().map(String::as_str), Some("JBSWY3DPEHPK3PXP"));
        assert!(decoded.header.totp_enrolled);
        assert_eq!(decoded.key.as_bytes(), key.as_bytes());
    }

    #[test]
    fn wrong_passphrase_and_corruption_look_identical() {
        let key = key_for(b"pw");
        let bytes = encode(&sample_store(), None, &key).unwrap();

        let wrong = decode(&bytes, b"other").unwrap_err();
        assert!(matches!(wrong, VaultError::WrongPassphraseOrCorrupt));

        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[HEADER_LEN + 1] ^= 0x01;
        assert!(matches!(
            decode(&flipped, b"pw"),
            Err(VaultError::WrongPassphraseOrCorrupt)
        ));

        let mut tag_flipped = bytes.clone();
        tag_flipped[last] ^= 0x80;
        assert!(matches!(
            decode(&tag_flipped, b"pw"),
            Err(VaultError::WrongPassphraseOrCorrupt)
        ));
    }

    #[test]
    fn header_is_authenticated() {
        let key = key_for(b"pw");
        let bytes = encode(&sample_store(), None, &key).unwrap();
        // Each tweak parses fine but fails authentication.
        for (offset, mask) in [(OFF_NONCE, 0x01), (OFF_SALT, 0x80), (OFF_FLAGS, FLAG_TOTP)] {
            let mut tampered = bytes.clone();
            tampered[offset] ^= mask;
            assert!(parse_header(&tampered).is_ok());
            assert!(matches!(
                decode(&tampered, b"pw"),
                Err(VaultError::WrongPassphraseOrCorrupt)
            ));
        }
    }

    #[test]
    fn each_encode_uses_a_fresh_nonce() {
        let key = key_for(b"pw");
        let store = sample_store();
        let a = encode(&store, None, &key).unwrap();
        let b = encode(&store, None, &key).unwrap();

        assert_ne!(a[OFF_NONCE..HEADER_LEN], b[OFF_NONCE..HEADER_LEN]);
        assert_ne!(a[HEADER_LEN..], b[HEADER_LEN..]);
        assert_eq!(a[OFF_SALT..OFF_NONCE], b[OFF_SALT..OFF_NONCE]);
    }

    #[test]
    fn rejects_malformed_headers() {
        let key = key_for(b"pw");
        let bytes = encode(&EntryStore::new(), None, &key).unwrap();

        assert!(matches!(
            parse_header(&bytes[..HEADER_LEN]),
            Err(VaultError::MalformedEnvelope(_))
        ));

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(parse_header(&bad_magic), Err(VaultError::MalformedEnvelope(_))));

        let mut future = bytes.clone();
        future[OFF_VERSION] = 2;
        assert!(matches!(
            decode(&future, b"pw"),
            Err(VaultError::MalformedEnvelope(_))
        ));

        let mut bad_kdf = bytes.clone();
        bad_kdf[OFF_KDF_ID] = 9;
        assert!(matches!(parse_header(&bad_kdf), Err(VaultError::MalformedEnvelope(_))));

        let mut weak_kdf = bytes.clone();
        weak_kdf[OFF_KDF_PARAMS..OFF_KDF_PARAMS + 4].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(parse_header(&weak_kdf), Err(VaultError::MalformedEnvelope(_))));

        let mut bad_flags = bytes;
        bad_flags[OFF_FLAGS] = 0x80;
        assert!(matches!(parse_header(&bad_flags), Err(VaultError::MalformedEnvelope(_))));
    }

    #[test]
    fn write_envelope_is_private_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.pwv");

        write_envelope(&path, b"first").unwrap();
        write_envelope(&path, b"second").unwrap();
        assert_eq!(read_envelope(&path).unwrap(), b"second");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        // No temp files are left behind.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_rename_leaves_target_and_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.pwv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"keep").unwrap();

        assert!(write_envelope(&path, b"new").is_err());
        assert_eq!(fs::read(path.join("inner")).unwrap(), b"keep");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn read_missing_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let err = read_envelope(&dir.path().join("missing.pwv")).unwrap_err();
        assert!(matches!(err, VaultError::StorageIoFailure(_)));
    }
}
