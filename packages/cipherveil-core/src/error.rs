//! # Error Handling
//!
//! This module provides the error types for Cipherveil Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Configuration Errors                                              │
//! │  │   ├── Configuration         - Invalid cipher stage or chain policy  │
//! │  │   └── ConfigError           - Unreadable configuration file         │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── AuthenticationFailed  - AEAD tag mismatch (wrong key/tamper)  │
//! │  │   ├── MalformedCiphertext   - Not base64, too short, not UTF-8      │
//! │  │   ├── EncryptionFailed      - Encryption operation failed           │
//! │  │   └── InvalidKey            - Wrong key length or encoding          │
//! │  │                                                                      │
//! │  ├── Envelope Errors                                                   │
//! │  │   ├── MalformedEnvelope     - Missing separator, bad JSON/key       │
//! │  │   └── UnsupportedAlgorithm  - Unknown cipher stage name             │
//! │  │                                                                      │
//! │  ├── Stego Errors                                                      │
//! │  │   ├── Capacity              - Payload too large for the carrier     │
//! │  │   ├── PayloadNotFound       - No valid payload in the image         │
//! │  │   ├── UnsupportedFormat     - Lossy or unknown output format        │
//! │  │   └── ImageError            - Image decode/encode failure           │
//! │  │                                                                      │
//! │  └── Storage Errors                                                    │
//! │      ├── KeyFileCorrupted      - Key file exists but is unusable       │
//! │      ├── StorageReadError      - Failed to read from disk              │
//! │      ├── StorageWriteError     - Failed to write to disk               │
//! │      ├── DatabaseError         - SQLite failure                        │
//! │      └── MessageNotFound       - No message with that id               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these errors is retried anywhere in the core. Every failure is a
//! deterministic function of its inputs and is reported to the caller.

use thiserror::Error;

/// Result type alias for Cipherveil Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cipherveil Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors (100-199)
    // ========================================================================

    /// Invalid cipher stage key or chain policy violation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration: {0}")]
    ConfigError(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// AEAD tag did not verify: wrong key or tampered data
    #[error("Authentication failed: wrong key or tampered data")]
    AuthenticationFailed,

    /// Ciphertext is structurally invalid
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Envelope Errors (400-499)
    // ========================================================================

    /// Envelope string does not follow `metadata::ciphertext`
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope names a cipher stage this build does not know
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // ========================================================================
    // Stego Errors (500-599)
    // ========================================================================

    /// Carrier image cannot hold the payload plus end marker
    #[error("Image too small to hide payload: need {required} bits, image has {available} bits available")]
    Capacity {
        /// Bits needed for payload and marker
        required: usize,
        /// LSB slots offered by the carrier
        available: usize,
    },

    /// Image carries no recognisable payload
    #[error("Payload not found or corrupt: {0}")]
    PayloadNotFound(String),

    /// Requested image format would destroy LSB data
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Image decode or encode failure
    #[error("Image error: {0}")]
    ImageError(String),

    // ========================================================================
    // Storage Errors (600-699)
    // ========================================================================

    /// Key file exists but cannot be used; never regenerated automatically
    #[error("Key file corrupted: {0}")]
    KeyFileCorrupted(String),

    /// Failed to read from storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Message not found
    #[error("Message not found: {0}")]
    MessageNotFound(i64),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Numeric error code, grouped by category:
    /// - 100-199: Configuration
    /// - 300-399: Crypto
    /// - 400-499: Envelope
    /// - 500-599: Stego
    /// - 600-699: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::Configuration(_) => 100,
            Error::ConfigError(_) => 101,

            Error::AuthenticationFailed => 300,
            Error::MalformedCiphertext(_) => 301,
            Error::EncryptionFailed(_) => 302,
            Error::InvalidKey(_) => 303,

            Error::MalformedEnvelope(_) => 400,
            Error::UnsupportedAlgorithm(_) => 401,

            Error::Capacity { .. } => 500,
            Error::PayloadNotFound(_) => 501,
            Error::UnsupportedFormat(_) => 502,
            Error::ImageError(_) => 503,

            Error::KeyFileCorrupted(_) => 600,
            Error::StorageReadError(_) => 601,
            Error::StorageWriteError(_) => 602,
            Error::DatabaseError(_) => 603,
            Error::MessageNotFound(_) => 604,

            Error::SerializationError(_) => 900,
        }
    }

    /// Whether the error was caused by user-supplied input (bad key, bad
    /// file, wrong chain) rather than the local environment.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::AuthenticationFailed
                | Error::UnsupportedAlgorithm(_)
                | Error::Capacity { .. }
                | Error::UnsupportedFormat(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
