//! # Configuration
//!
//! File locations and chain policy, read from TOML.
//!
//! ```toml
//! data_dir = "/var/lib/cipherveil"
//! database_file = "secure_messenger.db"
//! master_key_file = "db_master.key"
//! biometric_key_file = "face_master.key"
//! min_chain_stages = 2
//! ```
//!
//! Every field is optional. Relative file names are resolved against
//! `data_dir`; absolute paths are used as given.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::KeyConfig;

/// Default SQLite file name
pub const DEFAULT_DATABASE_FILE: &str = "secure_messenger.db";
/// Default master key file name
pub const DEFAULT_MASTER_KEY_FILE: &str = "db_master.key";
/// Default biometric key file name
pub const DEFAULT_BIOMETRIC_KEY_FILE: &str = "face_master.key";
/// Default minimum number of classical stages for a sent message
pub const DEFAULT_MIN_CHAIN_STAGES: usize = 2;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the database and key files
    pub data_dir: PathBuf,
    /// Message database
    pub database_file: PathBuf,
    /// Field-encryption master key
    pub master_key_file: PathBuf,
    /// Biometric template key
    pub biometric_key_file: PathBuf,
    /// Fewest classical stages `Messenger::send` accepts
    pub min_chain_stages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
            master_key_file: PathBuf::from(DEFAULT_MASTER_KEY_FILE),
            biometric_key_file: PathBuf::from(DEFAULT_BIOMETRIC_KEY_FILE),
            min_chain_stages: DEFAULT_MIN_CHAIN_STAGES,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no component can run with
    pub fn validate(&self) -> Result<()> {
        for (name, file) in [
            ("database_file", &self.database_file),
            ("master_key_file", &self.master_key_file),
            ("biometric_key_file", &self.biometric_key_file),
        ] {
            if file.as_os_str().is_empty() {
                return Err(Error::ConfigError(format!("{} must not be empty", name)));
            }
        }
        if self.min_chain_stages < 1 {
            return Err(Error::ConfigError(
                "min_chain_stages must be at least 1".into(),
            ));
        }
        if self.master_key_file == self.biometric_key_file {
            return Err(Error::ConfigError(
                "master_key_file and biometric_key_file must differ".into(),
            ));
        }
        Ok(())
    }

    /// Replace the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    /// Full path of the message database
    pub fn resolve_database(&self) -> PathBuf {
        self.resolve(&self.database_file)
    }

    /// Full path of the master key file
    pub fn resolve_master_key(&self) -> PathBuf {
        self.resolve(&self.master_key_file)
    }

    /// Full path of the biometric key file
    pub fn resolve_biometric_key(&self) -> PathBuf {
        self.resolve(&self.biometric_key_file)
    }

    /// Key file locations for [`crate::storage::KeyProvider::load`]
    pub fn key_config(&self) -> KeyConfig {
        KeyConfig {
            master_key_path: self.resolve_master_key(),
            biometric_key_path: self.resolve_biometric_key(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
