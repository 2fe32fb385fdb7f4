//! Persistent store for session-cookie key pairs. The secret file is a flat
//! concatenation of 64 byte records (`hash_key(32) || block_key(32)`), so a
//! rotation can append a fresh record while older keys keep verifying
//! existing sessions. The store never rotates on its own; it materializes
//! whatever the file holds, or creates the very first record.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroize;

use crate::keys::codec::{CodecList, Keypair, BLOCK_KEY_LEN, HASH_KEY_LEN, RECORD_LEN};
use crate::repo::Repo;

/// Directory under the data directory that holds web-facing state.
pub const SECRET_DIR: &str = "web";
/// File name of the cookie secret inside [`SECRET_DIR`].
pub const SECRET_FILE: &str = "cookie-secret";

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("failed to create folder for cookie secret at {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to load cookie secrets from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("expected a multiple of 64 bytes in cookie secret file but got: {len}")]
    CorruptSecretFile { len: usize },
    #[error("failed to persist cookie secrets to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: io::Error,
    },
}

/// Location of the cookie secret file inside a data directory.
pub fn secret_file_path(repo: &Repo) -> PathBuf {
    repo.get_path([SECRET_DIR, SECRET_FILE])
}

/// Either parses the key pairs from `<data-dir>/web/cookie-secret` or creates
/// a new file holding one freshly generated pair.
///
/// Every failure is fatal to the cookie subsystem: a file that exists but
/// cannot be read or parsed is never silently replaced, because regenerating
/// keys would invalidate every session issued so far. Conversely a pair that
/// could not be persisted is never returned, because cookies signed with it
/// would be unverifiable after the next restart.
pub fn load_or_create(repo: &Repo) -> Result<CodecList, KeystoreError> {
    load_or_create_at(&secret_file_path(repo))
}

/// Same as [`load_or_create`], addressed by the secret file path directly.
pub fn load_or_create_at(secret_path: &Path) -> Result<CodecList, KeystoreError> {
    ensure_secret_dir(secret_path)?;

    match fs::read(secret_path) {
        Ok(mut bytes) => {
            let parsed = parse_records(&bytes);
            bytes.zeroize();
            parsed
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => create_first_pair(secret_path),
        Err(source) => Err(KeystoreError::Read {
            path: secret_path.to_path_buf(),
            source,
        }),
    }
}

/// Reads and parses an existing secret file. Unlike [`load_or_create_at`] a
/// missing file is an error, so inspection tooling never creates keys as a
/// side effect.
pub fn load(secret_path: &Path) -> Result<CodecList, KeystoreError> {
    match fs::read(secret_path) {
        Ok(mut bytes) => {
            let parsed = parse_records(&bytes);
            bytes.zeroize();
            parsed
        }
        Err(source) => Err(KeystoreError::Read {
            path: secret_path.to_path_buf(),
            source,
        }),
    }
}

/// Appends one freshly generated pair to an existing secret file and returns
/// the re-parsed list. This is the manual rotation action; existing records
/// are kept so sessions signed with older keys stay verifiable. Like first-run
/// creation it must not race against other writers on the same path.
pub fn rotate(secret_path: &Path) -> Result<CodecList, KeystoreError> {
    let existing = load(secret_path)?;
    let fresh = Keypair::generate(&mut OsRng);

    let mut data = Vec::with_capacity((existing.len() + 1) * RECORD_LEN);
    for pair in existing.iter() {
        data.extend_from_slice(pair.hash_key());
        data.extend_from_slice(pair.block_key());
    }
    data.extend_from_slice(fresh.hash_key());
    data.extend_from_slice(fresh.block_key());

    let written = write_secret_file(secret_path, &data);
    data.zeroize();
    written.map_err(|source| KeystoreError::Write {
        path: secret_path.to_path_buf(),
        source,
    })?;

    load(secret_path)
}

/// Creates the parent directory of the secret file, owner-only. An already
/// existing directory is fine; any other failure is surfaced.
fn ensure_secret_dir(secret_path: &Path) -> Result<(), KeystoreError> {
    let dir = match secret_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => return Ok(()),
    };

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder
        .create(dir)
        .map_err(|source| KeystoreError::DirectoryCreation {
            path: dir.to_path_buf(),
            source,
        })
}

fn create_first_pair(secret_path: &Path) -> Result<CodecList, KeystoreError> {
    let pair = Keypair::generate(&mut OsRng);

    let mut record = pair.to_record();
    let written = write_secret_file(secret_path, &record);
    record.zeroize();
    // On failure the pair is dropped (and zeroized) instead of returned:
    // unpersisted keys must never sign a cookie.
    written.map_err(|source| KeystoreError::Write {
        path: secret_path.to_path_buf(),
        source,
    })?;

    Ok(CodecList::new(vec![pair]))
}

fn write_secret_file(secret_path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(secret_path)?;
    file.write_all(data)
}

/// Splits the file contents into key pairs. The record count is fixed up
/// front and every record is addressed by index, so the "length is a multiple
/// of 64, all records consumed" invariant holds structurally.
fn parse_records(bytes: &[u8]) -> Result<CodecList, KeystoreError> {
    if bytes.len() % RECORD_LEN != 0 {
        return Err(KeystoreError::CorruptSecretFile { len: bytes.len() });
    }

    let count = bytes.len() / RECORD_LEN;
    let mut pairs = Vec::with_capacity(count);
    for index in 0..count {
        let start = index * RECORD_LEN;
        let mut hash_key = [0u8; HASH_KEY_LEN];
        hash_key.copy_from_slice(&bytes[start..start + HASH_KEY_LEN]);
        let mut block_key = [0u8; BLOCK_KEY_LEN];
        block_key.copy_from_slice(&bytes[start + HASH_KEY_LEN..start + RECORD_LEN]);
        pairs.push(Keypair::from_parts(hash_key, block_key));
    }

    Ok(CodecList::new(pairs))
}

#[cfg(test)]
mod tests {
    use super::{
        load, load_or_create, load_or_create_at, rotate, secret_file_path, KeystoreError,
        RECORD_LEN, SECRET_DIR, SECRET_FILE,
    };
    use crate::repo::Repo;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn secret_path_in(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(SECRET_DIR).join(SECRET_FILE)
    }

    #[test]
    fn first_run_creates_one_record() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);

        let codecs = load_or_create_at(&path).expect("first run should succeed");
        assert_eq!(codecs.len(), 1);

        let on_disk = fs::read(&path).expect("file should exist");
        assert_eq!(on_disk.len(), RECORD_LEN);
        let pair = codecs.get(0).expect("one pair");
        assert_eq!(&on_disk[..32], pair.hash_key());
        assert_eq!(&on_disk[32..], pair.block_key());
    }

    #[cfg(unix)]
    #[test]
    fn first_run_restricts_permissions_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);
        load_or_create_at(&path).expect("first run should succeed");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode();
        assert_eq!(file_mode & 0o077, 0, "file mode {file_mode:o} leaks to group/other");

        let dir_mode = fs::metadata(path.parent().expect("parent"))
            .expect("dir metadata")
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o077, 0, "dir mode {dir_mode:o} leaks to group/other");
    }

    #[test]
    fn parses_existing_records_in_file_order() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");

        let mut seeded = Vec::new();
        for record in 0u8..3 {
            seeded.extend(std::iter::repeat(record).take(32));
            seeded.extend(std::iter::repeat(record | 0x80).take(32));
        }
        fs::write(&path, &seeded).expect("seed file");

        let codecs = load_or_create_at(&path).expect("load should succeed");
        assert_eq!(codecs.len(), 3);
        for (index, pair) in codecs.iter().enumerate() {
            assert_eq!(pair.hash_key(), &[index as u8; 32]);
            assert_eq!(pair.block_key(), &[index as u8 | 0x80; 32]);
        }
    }

    #[test]
    fn rejects_length_not_multiple_of_64() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, vec![0u8; 65]).expect("seed file");

        let err = load_or_create_at(&path).expect_err("65 bytes must be rejected");
        assert!(matches!(err, KeystoreError::CorruptSecretFile { len: 65 }));

        // The corrupt file must be left untouched for forensics.
        assert_eq!(fs::read(&path).expect("file still there").len(), 65);
    }

    #[test]
    fn second_call_reuses_existing_keys_without_writing() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);

        let first = load_or_create_at(&path).expect("first run");
        let bytes_after_first = fs::read(&path).expect("file exists");

        let second = load_or_create_at(&path).expect("second run");
        let bytes_after_second = fs::read(&path).expect("file exists");

        assert_eq!(first, second);
        assert_eq!(bytes_after_first, bytes_after_second);
    }

    #[test]
    fn empty_file_yields_empty_list() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"").expect("seed empty file");

        let codecs = load_or_create_at(&path).expect("empty file parses");
        assert!(codecs.is_empty());
        assert_eq!(fs::read(&path).expect("file exists").len(), 0);
    }

    #[test]
    fn rotation_appends_one_record() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);

        let initial = load_or_create_at(&path).expect("first run");
        let original_record = fs::read(&path).expect("file exists");

        let rotated = rotate(&path).expect("rotation should succeed");
        assert_eq!(rotated.len(), 2);
        assert_eq!(rotated.get(0), initial.get(0));
        assert_ne!(rotated.get(1), rotated.get(0));
        assert_eq!(rotated.newest(), rotated.get(1));

        let on_disk = fs::read(&path).expect("file exists");
        assert_eq!(on_disk.len(), 2 * RECORD_LEN);
        assert_eq!(&on_disk[..RECORD_LEN], original_record.as_slice());
    }

    #[test]
    fn load_and_rotate_require_an_existing_file() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);

        assert!(matches!(load(&path), Err(KeystoreError::Read { .. })));
        assert!(matches!(rotate(&path), Err(KeystoreError::Read { .. })));
        assert!(!path.exists(), "read-only operations must not create the file");
    }

    #[test]
    fn unreadable_file_is_surfaced_not_regenerated() {
        let dir = tempdir().expect("temp dir");
        let path = secret_path_in(&dir);
        // A directory at the secret path makes the read fail with something
        // other than NotFound, which must not trigger key generation.
        fs::create_dir_all(&path).expect("mkdir at secret path");

        let err = load_or_create_at(&path).expect_err("directory is unreadable");
        assert!(matches!(err, KeystoreError::Read { .. }));
    }

    #[test]
    fn repo_entry_point_resolves_conventional_path() {
        let dir = tempdir().expect("temp dir");
        let repo = Repo::new(dir.path());
        assert_eq!(secret_file_path(&repo), secret_path_in(&dir));

        let codecs = load_or_create(&repo).expect("first run via repo");
        assert_eq!(codecs.len(), 1);
        assert!(secret_path_in(&dir).exists());
    }
}
