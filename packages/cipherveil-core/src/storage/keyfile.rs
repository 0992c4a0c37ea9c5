//! # Key Files
//!
//! Long-lived keys kept as raw 16-byte files next to the database.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KEY FILE LIFECYCLE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  load_or_create_key(path)                                               │
//! │     │                                                                   │
//! │     ├── open(create_new, 0600) ── ok ──► write 16 random bytes          │
//! │     │                                    sync_all                       │
//! │     │                                    warn: back this file up        │
//! │     │                                                                   │
//! │     └── AlreadyExists ──────────────────► read file                     │
//! │                                            │                            │
//! │                                            ├── 16 bytes ──► key         │
//! │                                            └── otherwise ─► KeyFile-    │
//! │                                                             Corrupted   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An existing key file is never overwritten. A corrupted one stops startup:
//! replacing it would orphan every value sealed under the old key.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::field_cipher::FieldCipher;
use crate::config::{DEFAULT_BIOMETRIC_KEY_FILE, DEFAULT_MASTER_KEY_FILE};
use crate::crypto::{SymmetricKey, KEY_SIZE};
use crate::error::{Error, Result};

/// Where a key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Read from an existing file
    Loaded,
    /// Generated and written on this call
    Generated,
}

/// Result of inspecting a key file without creating it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFileStatus {
    /// No file at the path
    Missing,
    /// A usable 16-byte key
    Valid,
    /// File exists but cannot be used
    Corrupted(String),
}

/// Read an existing key file
///
/// ## Errors
///
/// - `StorageReadError` if the file does not exist
/// - `KeyFileCorrupted` if it exists but is unreadable or not 16 bytes
pub fn read_key(path: &Path) -> Result<SymmetricKey> {
    let bytes = Zeroizing::new(std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            Error::StorageReadError(format!("Key file {} not found", path.display()))
        }
        _ => Error::KeyFileCorrupted(format!("Cannot read {}: {}", path.display(), e)),
    })?);

    if bytes.len() != KEY_SIZE {
        return Err(Error::KeyFileCorrupted(format!(
            "{} is {} bytes, expected {}",
            path.display(),
            bytes.len(),
            KEY_SIZE
        )));
    }

    SymmetricKey::from_slice(&bytes)
}

/// Load the key at `path`, creating it first if absent
///
/// Creation is atomic with respect to other processes: whichever opens the
/// file with `create_new` first writes the key, and everyone else reads it.
pub fn load_or_create_key(path: &Path) -> Result<(SymmetricKey, KeyOrigin)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::StorageWriteError(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = match options.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::debug!("Loading key from {}", path.display());
            return Ok((read_key(path)?, KeyOrigin::Loaded));
        }
        Err(e) => {
            return Err(Error::StorageWriteError(format!(
                "Failed to create key file {}: {}",
                path.display(),
                e
            )))
        }
    };

    let key = SymmetricKey::generate();
    if let Err(e) = file.write_all(key.as_bytes()).and_then(|_| file.sync_all()) {
        drop(file);
        // Only our own partial file is removed here
        let _ = std::fs::remove_file(path);
        return Err(Error::StorageWriteError(format!(
            "Failed to write key file {}: {}",
            path.display(),
            e
        )));
    }

    tracing::warn!(
        "Generated new key at {}. Back this file up; anything sealed under it is unrecoverable without it",
        path.display()
    );
    Ok((key, KeyOrigin::Generated))
}

/// Check a key file without creating or modifying it
pub fn inspect_key_file(path: &Path) -> KeyFileStatus {
    if !path.exists() {
        return KeyFileStatus::Missing;
    }
    match read_key(path) {
        Ok(_) => KeyFileStatus::Valid,
        Err(e) => KeyFileStatus::Corrupted(e.to_string()),
    }
}

/// Locations of the long-lived key files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConfig {
    /// Field-encryption master key
    pub master_key_path: PathBuf,
    /// Biometric template key
    pub biometric_key_path: PathBuf,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            master_key_path: PathBuf::from(DEFAULT_MASTER_KEY_FILE),
            biometric_key_path: PathBuf::from(DEFAULT_BIOMETRIC_KEY_FILE),
        }
    }
}

/// Holds the process's long-lived keys
///
/// Built once at startup and passed by reference to whatever needs a key.
#[derive(Debug)]
pub struct KeyProvider {
    master: SymmetricKey,
    master_origin: KeyOrigin,
    biometric: SymmetricKey,
    biometric_origin: KeyOrigin,
}

impl KeyProvider {
    /// Load both keys, creating any that are missing
    pub fn load(config: &KeyConfig) -> Result<Self> {
        let (master, master_origin) = load_or_create_key(&config.master_key_path)?;
        let (biometric, biometric_origin) = load_or_create_key(&config.biometric_key_path)?;

        tracing::info!(
            "Keys ready (master: {:?}, biometric: {:?})",
            master_origin,
            biometric_origin
        );

        Ok(Self {
            master,
            master_origin,
            biometric,
            biometric_origin,
        })
    }

    /// Build from keys already in memory
    pub fn from_keys(master: SymmetricKey, biometric: SymmetricKey) -> Self {
        Self {
            master,
            master_origin: KeyOrigin::Loaded,
            biometric,
            biometric_origin: KeyOrigin::Loaded,
        }
    }

    /// Key for stored fields
    pub fn master_key(&self) -> &SymmetricKey {
        &self.master
    }

    /// Key for biometric templates
    pub fn biometric_key(&self) -> &SymmetricKey {
        &self.biometric
    }

    /// Whether the master key was loaded or freshly generated
    pub fn master_origin(&self) -> KeyOrigin {
        self.master_origin
    }

    /// Whether the biometric key was loaded or freshly generated
    pub fn biometric_origin(&self) -> KeyOrigin {
        self.biometric_origin
    }

    /// Field cipher bound to the master key
    pub fn field_cipher(&self) -> FieldCipher {
        FieldCipher::new(self.master.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db_master.key");

        let (first, origin) = load_or_create_key(&path).unwrap();
        assert_eq!(origin, KeyOrigin::Generated);
        assert_eq!(std::fs::read(&path).unwrap().len(), KEY_SIZE);

        let (second, origin) = load_or_create_key(&path).unwrap();
        assert_eq!(origin, KeyOrigin::Loaded);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_concurrent_create_has_one_winner() {
        use std::sync::{Arc, Barrier};

        const THREADS: usize = 8;

        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("db_master.key"));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    load_or_create_key(&path)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let on_disk = std::fs::read(path.as_path()).unwrap();
        assert_eq!(on_disk.len(), KEY_SIZE);

        let mut generated = 0;
        for result in results {
            match result {
                Ok((key, origin)) => {
                    assert_eq!(&key.as_bytes()[..], &on_disk[..]);
                    if origin == KeyOrigin::Generated {
                        generated += 1;
                    }
                }
                Err(e) => assert!(matches!(e, Error::KeyFileCorrupted(_)), "{:?}", e),
            }
        }
        assert_eq!(generated, 1);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keys").join("k.key");
        load_or_create_key(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_wrong_length_is_fatal_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db_master.key");
        std::fs::write(&path, [7u8; 10]).unwrap();

        assert!(matches!(
            load_or_create_key(&path),
            Err(Error::KeyFileCorrupted(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8; 10]);
    }

    #[test]
    fn test_empty_file_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_master.key");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(read_key(&path), Err(Error::KeyFileCorrupted(_))));
    }

    #[test]
    fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_key(&dir.path().join("absent.key")),
            Err(Error::StorageReadError(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db_master.key");
        load_or_create_key(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.key");
        assert_eq!(inspect_key_file(&path), KeyFileStatus::Missing);

        load_or_create_key(&path).unwrap();
        assert_eq!(inspect_key_file(&path), KeyFileStatus::Valid);

        std::fs::write(&path, b"short").unwrap();
        assert!(matches!(inspect_key_file(&path), KeyFileStatus::Corrupted(_)));
    }

    #[test]
    fn test_provider_loads_independent_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = KeyConfig {
            master_key_path: dir.path().join("db_master.key"),
            biometric_key_path: dir.path().join("face_master.key"),
        };

        let provider = KeyProvider::load(&config).unwrap();
        assert_eq!(provider.master_origin(), KeyOrigin::Generated);
        assert_ne!(
            provider.master_key().as_bytes(),
            provider.biometric_key().as_bytes()
        );

        let again = KeyProvider::load(&config).unwrap();
        assert_eq!(again.master_origin(), KeyOrigin::Loaded);
        assert_eq!(again.biometric_origin(), KeyOrigin::Loaded);
        assert_eq!(
            again.master_key().as_bytes(),
            provider.master_key().as_bytes()
        );
    }
}
