//! # Storage Module
//!
//! Key files, the field cipher and the message database.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        STORAGE LAYERS                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   db_master.key ───┐          face_master.key                           │
//! │   (16 raw bytes)   │          (16 raw bytes, loaded for the             │
//! │                    ▼           biometric login, unused here)            │
//! │             ┌──────────────┐                                            │
//! │             │ KeyProvider  │  built once, passed by reference           │
//! │             └──────┬───────┘                                            │
//! │                    │ master key                                         │
//! │                    ▼                                                    │
//! │             ┌──────────────┐                                            │
//! │             │ FieldCipher  │  AES-GCM per field, legacy classifier      │
//! │             └──────┬───────┘                                            │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │             ┌──────────────┐                                            │
//! │             │ MessageStore │  SQLite: secure_messenger.db               │
//! │             └──────────────┘                                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! Anyone with the database file but not `db_master.key` sees sealed blobs
//! for sender, receiver and content. Timestamps and row ids stay in the
//! clear. Losing the master key makes every sealed field unrecoverable.

mod database;
mod field_cipher;
mod keyfile;
mod schema;

pub use database::{EncryptionReport, MessageRecord, MessageStore};
pub use field_cipher::{
    classify, FieldCipher, FieldClass, Revealed, MAX_SEAL_ATTEMPTS, MIN_ENCRYPTED_LEN,
};
pub use keyfile::{
    inspect_key_file, load_or_create_key, read_key, KeyConfig, KeyFileStatus, KeyOrigin,
    KeyProvider,
};
pub use schema::SCHEMA_VERSION;
