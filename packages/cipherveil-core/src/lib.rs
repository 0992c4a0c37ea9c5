//! # Cipherveil Core
//!
//! Layered message encryption, at-rest field encryption and LSB image
//! steganography for a local, single-machine messenger.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CIPHERVEIL CORE MODULES                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────┐                         ┌──────────────────────────┐  │
//! │  │  Messaging   │                         │          Stego           │  │
//! │  │              │                         │                          │  │
//! │  │ - send       │                         │ - hide_message           │  │
//! │  │ - inbox      │                         │ - reveal_message         │  │
//! │  │ - read       │                         │ - LSB embed / extract    │  │
//! │  └──────┬───────┘                         └────────────┬─────────────┘  │
//! │         │                                              │                │
//! │         ▼                                              ▼                │
//! │  ┌──────────────┐   ┌──────────────┐      ┌──────────────────────────┐  │
//! │  │   Envelope   │──►│    Crypto    │◄─────│   Envelope::container    │  │
//! │  │              │   │              │      │                          │  │
//! │  │ - metadata   │   │ - classical  │      │ - key::blob              │  │
//! │  │   ::blob     │   │   chain      │      │ - .enc files             │  │
//! │  │              │   │ - AES-GCM    │      │                          │  │
//! │  └──────┬───────┘   └──────▲───────┘      └──────────────────────────┘  │
//! │         │                  │                                            │
//! │         ▼                  │                                            │
//! │  ┌─────────────────────────┴──────────────────────────────────────────┐ │
//! │  │                           Storage                                  │ │
//! │  │  KeyProvider (key files) ─► FieldCipher ─► MessageStore (SQLite)   │ │
//! │  └────────────────────────────────────────────────────────────────────┘ │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - TOML configuration (file locations, chain policy)
//! - [`crypto`] - Classical cipher chain and the AES-GCM envelope
//! - [`envelope`] - Message envelope codec and keyed containers
//! - [`storage`] - Key files, field cipher, message database
//! - [`stego`] - LSB steganography over PNG
//! - [`messaging`] - Send / inbox / read workflow
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Classical chain (substitution, shift, stream-xor)             │
//! │  ──────────────────────────────────────────────────────────             │
//! │  Obfuscation only. The reader needs the same stage keys to read.        │
//! │                                                                         │
//! │  Layer 2: Message envelope (AES-128-GCM, per-message key)               │
//! │  ────────────────────────────────────────────────────────               │
//! │  Integrity of the message body. The key travels in the metadata.        │
//! │                                                                         │
//! │  Layer 3: Field cipher (AES-128-GCM, master key from db_master.key)     │
//! │  ──────────────────────────────────────────────────────────────────     │
//! │  Confidentiality at rest for sender, receiver and content.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are held in an explicit [`storage::KeyProvider`]; there is no global
//! instance.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod messaging;
pub mod stego;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::Config;
pub use crypto::{ChainKeys, CipherStage, StageKind, SymmetricKey};
pub use envelope::MessageEnvelope;
pub use error::{Error, Result};
pub use messaging::Messenger;
pub use storage::{FieldCipher, KeyProvider, MessageStore};

/// Returns the version of Cipherveil Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        target: std::env::consts::OS,
        schema_version: storage::SCHEMA_VERSION,
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Library version
    pub version: &'static str,
    /// Target OS
    pub target: &'static str,
    /// Message database schema version
    pub schema_version: i32,
}
