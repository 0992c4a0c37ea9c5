//! # Field Cipher
//!
//! Transparent AEAD layer applied to every stored text field with the master
//! key. Sits on top of whatever the caller already encrypted.
//!
//! ## Legacy Data
//!
//! Databases written before this layer existed hold plaintext in the same
//! columns. There is no per-row flag, so each value is classified on read:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         reveal(stored)                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  classify(stored)                                                       │
//! │     │                                                                   │
//! │     ├── < 30 chars, or none of '+' '/' '='  ──► Revealed::Plaintext     │
//! │     │                                                                   │
//! │     └── Encrypted                                                       │
//! │           │                                                             │
//! │           ├── not base64, or shorter than nonce+tag                     │
//! │           │                                 ──► Revealed::Plaintext     │
//! │           ├── opens under master key        ──► Revealed::Decrypted     │
//! │           └── tag mismatch / not UTF-8      ──► Revealed::Undecryptable │
//! │                                                 (logged at warn)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The classifier is a compatibility shim, not a security boundary.
//!
//! A sealed value carries no `+`, `/` or `=` about a quarter of the time, so
//! [`FieldCipher::protect`] re-seals under a fresh nonce until the output
//! classifies as encrypted. Otherwise those values would be read back as
//! plaintext blobs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::crypto::{self, SymmetricKey, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// Values shorter than this are always treated as plaintext
pub const MIN_ENCRYPTED_LEN: usize = 30;

/// Upper bound on re-seals in [`FieldCipher::protect`]
pub const MAX_SEAL_ATTEMPTS: usize = 64;

/// Outcome of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Legacy clear text
    Plaintext,
    /// Looks like a sealed blob
    Encrypted,
}

/// Guess whether a stored value was written by the field cipher
pub fn classify(value: &str) -> FieldClass {
    if value.chars().count() < MIN_ENCRYPTED_LEN
        || !value.contains(|c: char| matches!(c, '+' | '/' | '='))
    {
        FieldClass::Plaintext
    } else {
        FieldClass::Encrypted
    }
}

/// What [`FieldCipher::reveal`] found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revealed {
    /// Stored in the clear
    Plaintext(String),
    /// Opened under the master key
    Decrypted(String),
    /// Looked sealed but did not open; carries the raw stored value
    Undecryptable(String),
}

impl Revealed {
    /// The value to show: plaintext, decrypted text, or the raw stored value
    pub fn into_value(self) -> String {
        match self {
            Revealed::Plaintext(v) | Revealed::Decrypted(v) | Revealed::Undecryptable(v) => v,
        }
    }

    /// Borrowing form of [`into_value`](Self::into_value)
    pub fn as_str(&self) -> &str {
        match self {
            Revealed::Plaintext(v) | Revealed::Decrypted(v) | Revealed::Undecryptable(v) => v,
        }
    }

    /// Whether the stored value failed to open
    pub fn is_undecryptable(&self) -> bool {
        matches!(self, Revealed::Undecryptable(_))
    }
}

fn is_sealed_blob(value: &str) -> bool {
    BASE64
        .decode(value)
        .map(|raw| raw.len() >= NONCE_SIZE + TAG_SIZE)
        .unwrap_or(false)
}

/// AEAD wrapper for stored fields, bound to one master key
#[derive(Debug, Clone)]
pub struct FieldCipher {
    key: SymmetricKey,
}

impl FieldCipher {
    /// Bind to a master key
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }

    /// Seal a value for storage
    ///
    /// Empty input is stored as is.
    pub fn protect(&self, value: &str) -> Result<String> {
        if value.is_empty() {
            return Ok(String::new());
        }

        for _ in 0..MAX_SEAL_ATTEMPTS {
            let sealed = crypto::seal(value, &self.key)?;
            if classify(&sealed) == FieldClass::Encrypted {
                return Ok(sealed);
            }
        }

        Err(Error::EncryptionFailed(format!(
            "no sealed form classified as encrypted after {} attempts",
            MAX_SEAL_ATTEMPTS
        )))
    }

    /// Recover a stored value
    pub fn reveal(&self, stored: &str) -> Revealed {
        if classify(stored) == FieldClass::Plaintext || !is_sealed_blob(stored) {
            return Revealed::Plaintext(stored.to_string());
        }

        match crypto::open(stored, &self.key) {
            Ok(value) => Revealed::Decrypted(value),
            Err(e) => {
                tracing::warn!("Stored field looks encrypted but did not open: {}", e);
                Revealed::Undecryptable(stored.to_string())
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
