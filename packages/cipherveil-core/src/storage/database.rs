//! # Message Store
//!
//! SQLite message table with every text field passed through the
//! [`FieldCipher`].
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │   Messenger /   │                                                    │
//! │  │      CLI        │                                                    │
//! │  └────────┬────────┘                                                    │
//! │           │  clear values                                               │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                    │
//! │  │  MessageStore   │  protect() on write, reveal() on read              │
//! │  │  (this file)    │  - store / fetch / delete / clear                  │
//! │  │                 │  - legacy migration and report                     │
//! │  └────────┬────────┘                                                    │
//! │           │  sealed values                                              │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                    │
//! │  │    rusqlite     │  file, or in-memory for tests                      │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sender and receiver are sealed, so the database cannot filter on them.
//! Per-user lookups read the whole table, reveal every row and filter here.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use super::field_cipher::{FieldCipher, Revealed};
use super::schema;
use crate::error::{Error, Result};

/// A message as read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Row id
    pub id: i64,
    /// Sender username
    pub sender: String,
    /// Receiver username
    pub receiver: String,
    /// Message envelope (`metadata::ciphertext`)
    pub content: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC
    pub timestamp: String,
    /// At least one field looked encrypted but would not open; such fields
    /// hold the raw stored value
    pub suspect: bool,
}

/// Field-level encryption state of the whole table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncryptionReport {
    /// Rows examined
    pub rows: usize,
    /// Fields that opened under the master key
    pub encrypted_fields: usize,
    /// Fields stored in the clear
    pub plaintext_fields: usize,
    /// Fields that looked sealed but did not open
    pub undecryptable_fields: usize,
}

impl EncryptionReport {
    /// Every field is sealed and opens
    pub fn fully_encrypted(&self) -> bool {
        self.plaintext_fields == 0 && self.undecryptable_fields == 0
    }

    fn count(&mut self, field: &Revealed) {
        match field {
            Revealed::Decrypted(_) => self.encrypted_fields += 1,
            Revealed::Plaintext(_) => self.plaintext_fields += 1,
            Revealed::Undecryptable(_) => self.undecryptable_fields += 1,
        }
    }
}

struct StoredRow {
    id: i64,
    sender: String,
    receiver: String,
    content: String,
    timestamp: Option<String>,
}

const SELECT_ALL: &str = "SELECT id, sender, receiver, content, timestamp
     FROM messages ORDER BY timestamp DESC, id DESC";

/// Handle on the message database
pub struct MessageStore {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
    cipher: FieldCipher,
}

impl MessageStore {
    /// Open or create the database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&Path>, cipher: FieldCipher) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            cipher,
        };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                // Fresh database, or a legacy one without version tracking
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| {
                    Error::DatabaseError(format!("Failed to set schema version: {}", e))
                })?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    fn read_rows(conn: &Connection) -> Result<Vec<StoredRow>> {
        let mut stmt = conn
            .prepare(SELECT_ALL)
            .map_err(|e| Error::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    sender: row.get(1)?,
                    receiver: row.get(2)?,
                    content: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })
            .map_err(|e| Error::DatabaseError(format!("Failed to query messages: {}", e)))?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(
                row.map_err(|e| Error::DatabaseError(format!("Failed to read message: {}", e)))?,
            );
        }
        Ok(messages)
    }

    fn reveal_row(&self, row: StoredRow) -> MessageRecord {
        let sender = self.cipher.reveal(&row.sender);
        let receiver = self.cipher.reveal(&row.receiver);
        let content = self.cipher.reveal(&row.content);

        let suspect =
            sender.is_undecryptable() || receiver.is_undecryptable() || content.is_undecryptable();
        if suspect {
            tracing::warn!("Message {} has fields that did not decrypt", row.id);
        }

        MessageRecord {
            id: row.id,
            sender: sender.into_value(),
            receiver: receiver.into_value(),
            content: content.into_value(),
            timestamp: row.timestamp.unwrap_or_default(),
            suspect,
        }
    }

    // ========================================================================
    // MESSAGE OPERATIONS
    // ========================================================================

    /// Seal and store a message, returning its row id
    pub fn store_message(&self, sender: &str, receiver: &str, content: &str) -> Result<i64> {
        let sender = self.cipher.protect(sender)?;
        let receiver = self.cipher.protect(receiver)?;
        let content = self.cipher.protect(content)?;
        let timestamp = chrono::Utc::now()
            .format(schema::TIMESTAMP_FORMAT)
            .to_string();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (sender, receiver, content, timestamp) VALUES (?, ?, ?, ?)",
            params![sender, receiver, content, timestamp],
        )
        .map_err(|e| Error::DatabaseError(format!("Failed to store message: {}", e)))?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Stored message {}", id);
        Ok(id)
    }

    /// Messages sent or received by `username`, newest first
    pub fn fetch_messages(&self, username: &str) -> Result<Vec<MessageRecord>> {
        Ok(self
            .fetch_all_messages()?
            .into_iter()
            .filter(|m| m.sender == username || m.receiver == username)
            .collect())
    }

    /// Every message, newest first
    pub fn fetch_all_messages(&self) -> Result<Vec<MessageRecord>> {
        let rows = {
            let conn = self.conn.lock();
            Self::read_rows(&conn)?
        };
        Ok(rows.into_iter().map(|row| self.reveal_row(row)).collect())
    }

    /// Get a single message by id
    pub fn get_message(&self, id: i64) -> Result<Option<MessageRecord>> {
        let result = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT id, sender, receiver, content, timestamp FROM messages WHERE id = ?",
                params![id],
                |row| {
                    Ok(StoredRow {
                        id: row.get(0)?,
                        sender: row.get(1)?,
                        receiver: row.get(2)?,
                        content: row.get(3)?,
                        timestamp: row.get(4)?,
                    })
                },
            )
        };

        match result {
            Ok(row) => Ok(Some(self.reveal_row(row))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::DatabaseError(format!("Failed to get message: {}", e))),
        }
    }

    /// Delete a message; false if no such id
    pub fn delete_message(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM messages WHERE id = ?", params![id])
            .map_err(|e| Error::DatabaseError(format!("Failed to delete message: {}", e)))?;
        Ok(rows > 0)
    }

    /// Delete every message and restart ids at 1
    pub fn clear_messages(&self) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let deleted = tx
            .execute("DELETE FROM messages", [])
            .map_err(|e| Error::DatabaseError(format!("Failed to clear messages: {}", e)))?;

        // Legacy tables without AUTOINCREMENT have no sequence row to reset
        let has_sequence: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::DatabaseError(format!("Failed to inspect schema: {}", e)))?;
        if has_sequence {
            tx.execute("DELETE FROM sqlite_sequence WHERE name = 'messages'", [])
                .map_err(|e| Error::DatabaseError(format!("Failed to reset id sequence: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| Error::DatabaseError(format!("Failed to commit: {}", e)))?;

        tracing::info!("Cleared {} messages", deleted);
        Ok(deleted)
    }

    // ========================================================================
    // LEGACY DATA
    // ========================================================================

    /// Seal every field still stored in the clear
    ///
    /// Runs in one transaction. Returns the number of fields sealed.
    /// Fields that look encrypted but do not open are left as they are.
    pub fn migrate_plaintext(&self) -> Result<usize> {
        let mut conn = self.conn.lock();
        let rows = Self::read_rows(&conn)?;

        let tx = conn
            .transaction()
            .map_err(|e| Error::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let mut sealed = 0;
        for row in rows {
            let mut changed = false;
            let mut fields = [row.sender, row.receiver, row.content];
            for field in fields.iter_mut() {
                if !field.is_empty() && matches!(self.cipher.reveal(field), Revealed::Plaintext(_)) {
                    *field = self.cipher.protect(field)?;
                    sealed += 1;
                    changed = true;
                }
            }

            if changed {
                let [sender, receiver, content] = fields;
                tx.execute(
                    "UPDATE messages SET sender = ?, receiver = ?, content = ? WHERE id = ?",
                    params![sender, receiver, content, row.id],
                )
                .map_err(|e| {
                    Error::DatabaseError(format!("Failed to migrate message {}: {}", row.id, e))
                })?;
                tracing::debug!("Migrated message {}", row.id);
            }
        }

        tx.commit()
            .map_err(|e| Error::DatabaseError(format!("Failed to commit: {}", e)))?;

        tracing::info!("Sealed {} plaintext fields", sealed);
        Ok(sealed)
    }

    /// Count encrypted, plaintext and undecryptable fields
    pub fn encryption_report(&self) -> Result<EncryptionReport> {
        let rows = {
            let conn = self.conn.lock();
            Self::read_rows(&conn)?
        };

        let mut report = EncryptionReport::default();
        for row in &rows {
            report.rows += 1;
            for field in [&row.sender, &row.receiver, &row.content] {
                report.count(&self.cipher.reveal(field));
            }
        }
        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================
