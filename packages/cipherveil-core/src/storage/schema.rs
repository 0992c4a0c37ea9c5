//! # Database Schema
//!
//! SQL schema definitions for the message database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐      ┌──────────────────────────────────────┐      │
//! │  │ schema_version  │      │              messages                │      │
//! │  ├─────────────────┤      ├──────────────────────────────────────┤      │
//! │  │ version         │      │ id          INTEGER autoincrement    │      │
//! │  └─────────────────┘      │ sender      TEXT  (field cipher)     │      │
//! │                           │ receiver    TEXT  (field cipher)     │      │
//! │                           │ content     TEXT  (field cipher)     │      │
//! │                           │ timestamp   DATETIME, UTC, clear     │      │
//! │                           └──────────────────────────────────────┘      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no "is encrypted" column. Databases written before field
//! encryption existed hold plaintext in the same columns, and the field
//! cipher tells the two apart per value.
//!
//! Every statement uses `IF NOT EXISTS`, so opening a legacy database that
//! already has a `messages` table only adds the version table and index.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Messages table
-- sender, receiver and content each hold a field-cipher blob or legacy plaintext
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    receiver TEXT NOT NULL,
    -- Message envelope: metadata::ciphertext
    content TEXT NOT NULL,
    -- "YYYY-MM-DD HH:MM:SS", UTC
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp DESC);
"#;

/// Timestamp format shared with SQLite's `CURRENT_TIMESTAMP`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_applies_twice() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_TABLES).unwrap();
        conn.execute_batch(CREATE_TABLES).unwrap();
    }

    #[test]
    fn test_schema_over_legacy_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                receiver TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO messages (sender, receiver, content) VALUES ('alice', 'bob', 'hi');",
        )
        .unwrap();

        conn.execute_batch(CREATE_TABLES).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
