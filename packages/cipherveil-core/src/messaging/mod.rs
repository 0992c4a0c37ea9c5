//! # Messaging Module
//!
//! Send and read workflow on top of the envelope codec and message store.
//!
//! ## Send / Read Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         MESSAGE FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  send(alice, bob, "Hello Bob!", [substitution, shift])                  │
//! │  ─────────────────────────────────────────────────────                  │
//! │                                                                         │
//! │  1. Policy: non-empty names and text, ≥ min_chain_stages stages         │
//! │  2. Classical chain        stages applied in the given order            │
//! │  3. AEAD seal              fresh 16-byte message key                    │
//! │  4. Envelope               {"algorithms":[...],"aes_key":"..."}::blob   │
//! │  5. MessageStore           every field sealed with the master key       │
//! │                                                                         │
//! │  read(id, keys)                                                         │
//! │  ──────────────                                                         │
//! │                                                                         │
//! │  1. MessageStore           reveal sender / receiver / content           │
//! │  2. Envelope parse         algorithm order + message key                │
//! │  3. AEAD open, then the chain inverses in reverse order                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reader must supply the same per-stage keys the sender used. A wrong
//! key does not fail: it decodes to different text.

use std::sync::Arc;

use crate::crypto::{ChainKeys, CipherStage, StageKind};
use crate::envelope::{self, MessageEnvelope};
use crate::error::{Error, Result};
use crate::storage::MessageStore;

/// Inbox line: who, when, and which stages the reader will need keys for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    /// Row id
    pub id: i64,
    /// Sender username
    pub sender: String,
    /// Receiver username
    pub receiver: String,
    /// Stored timestamp
    pub timestamp: String,
    /// Stage order, or `None` if the content is not a readable envelope
    pub algorithm_order: Option<Vec<StageKind>>,
    /// A stored field did not decrypt
    pub suspect: bool,
}

/// A fully decoded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMessage {
    /// Row id
    pub id: i64,
    /// Sender username
    pub sender: String,
    /// Receiver username
    pub receiver: String,
    /// Stored timestamp
    pub timestamp: String,
    /// Recovered text
    pub plaintext: String,
    /// Stages the sender applied
    pub algorithm_order: Vec<StageKind>,
}

/// Guided send/read over a [`MessageStore`]
pub struct Messenger {
    store: Arc<MessageStore>,
    min_chain_stages: usize,
}

impl Messenger {
    /// Create a messenger that requires at least `min_chain_stages` stages
    ///
    /// A guided send always applies at least one stage, so zero is raised
    /// to one.
    pub fn new(store: Arc<MessageStore>, min_chain_stages: usize) -> Self {
        Self {
            store,
            min_chain_stages: min_chain_stages.max(1),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Encrypt and store a message
    ///
    /// ## Errors
    ///
    /// `Configuration` for an empty sender, receiver or message, or a chain
    /// shorter than the configured minimum.
    pub fn send(
        &self,
        sender: &str,
        receiver: &str,
        plaintext: &str,
        stages: &[CipherStage],
    ) -> Result<i64> {
        let sender = sender.trim();
        let receiver = receiver.trim();
        if sender.is_empty() || receiver.is_empty() {
            return Err(Error::Configuration("sender and receiver are required".into()));
        }
        if plaintext.trim().is_empty() {
            return Err(Error::Configuration("message must not be empty".into()));
        }
        if stages.len() < self.min_chain_stages {
            return Err(Error::Configuration(format!(
                "at least {} cipher stages are required, got {}",
                self.min_chain_stages,
                stages.len()
            )));
        }

        let envelope = envelope::build(plaintext, stages)?;
        let id = self.store.store_message(sender, receiver, &envelope)?;

        tracing::info!(
            "Message {} stored ({} stage{})",
            id,
            stages.len(),
            if stages.len() == 1 { "" } else { "s" }
        );
        Ok(id)
    }

    /// Messages to or from `username`, newest first
    pub fn inbox(&self, username: &str) -> Result<Vec<InboxEntry>> {
        let records = self.store.fetch_messages(username.trim())?;

        Ok(records
            .into_iter()
            .map(|record| InboxEntry {
                algorithm_order: MessageEnvelope::parse(&record.content)
                    .ok()
                    .map(|env| env.algorithm_order().to_vec()),
                id: record.id,
                sender: record.sender,
                receiver: record.receiver,
                timestamp: record.timestamp,
                suspect: record.suspect,
            })
            .collect())
    }

    /// Decode a stored message with the reader's stage keys
    pub fn read(&self, id: i64, keys: &ChainKeys) -> Result<ReadMessage> {
        let record = self
            .store
            .get_message(id)?
            .ok_or(Error::MessageNotFound(id))?;

        let envelope = MessageEnvelope::parse(&record.content)?;
        let plaintext = envelope.open(keys)?;

        tracing::debug!("Read message {}", id);
        Ok(ReadMessage {
            id: record.id,
            sender: record.sender,
            receiver: record.receiver,
            timestamp: record.timestamp,
            plaintext,
            algorithm_order: envelope.algorithm_order().to_vec(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
