//! # Message Envelope
//!
//! The stored form of a message: which classical stages were applied, the
//! per-message AES key, and the sealed ciphertext.
//!
//! ## Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         MESSAGE ENVELOPE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  {"algorithms":["substitution","shift"],"aes_key":"q8F0...=="}::AbC...  │
//! │  └──────────────────── metadata (JSON) ─────────────────────┘  └──┬──┘  │
//! │                                                               sealed    │
//! │                                                               blob      │
//! │                                                                         │
//! │  Split on the FIRST "::" only. The blob is base64 and never contains    │
//! │  ':'; compact JSON of these two fields never contains "::".             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parsing only touches the metadata. The ciphertext is carried through
//! untouched until [`MessageEnvelope::open`] is called with the chain keys.
//!
//! The per-message key rides alongside the ciphertext it protects. The AEAD
//! layer here only gives integrity and a uniform format; confidentiality of
//! stored messages comes from the field cipher wrapped around the whole
//! envelope.

pub mod container;

use serde::{Deserialize, Serialize};

use crate::crypto::{self, ChainKeys, CipherStage, StageKind, SymmetricKey};
use crate::error::{Error, Result};

pub use container::{decrypt_file, encrypt_file, open_keyed, seal_keyed};

/// Separator between metadata and ciphertext
pub const SEPARATOR: &str = "::";

/// JSON half of an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    /// Stage names in encode order
    pub algorithms: Vec<String>,
    /// Base64 per-message key
    pub aes_key: String,
}

/// A parsed or freshly built envelope
#[derive(Debug, Clone)]
pub struct MessageEnvelope {
    algorithm_order: Vec<StageKind>,
    message_key: SymmetricKey,
    ciphertext: String,
}

impl MessageEnvelope {
    /// Encode `plaintext` through `stages` and seal it under a fresh key
    pub fn seal(plaintext: &str, stages: &[CipherStage]) -> Result<Self> {
        let encoded = crypto::encode(plaintext, stages)?;
        let message_key = SymmetricKey::generate();
        let ciphertext = crypto::seal(&encoded, &message_key)?;

        Ok(Self {
            algorithm_order: stages.iter().map(CipherStage::kind).collect(),
            message_key,
            ciphertext,
        })
    }

    /// Parse `metadata::ciphertext`
    ///
    /// ## Errors
    ///
    /// - `MalformedEnvelope` if the separator is missing, the metadata is
    ///   not the expected JSON, or the key is not 16 base64 bytes
    /// - `UnsupportedAlgorithm` if a stage name is unknown
    pub fn parse(envelope: &str) -> Result<Self> {
        let (metadata, ciphertext) = envelope
            .split_once(SEPARATOR)
            .ok_or_else(|| Error::MalformedEnvelope("missing '::' separator".into()))?;

        let metadata: EnvelopeMetadata = serde_json::from_str(metadata)
            .map_err(|e| Error::MalformedEnvelope(format!("invalid metadata: {}", e)))?;

        let algorithm_order = metadata
            .algorithms
            .iter()
            .map(|name| name.parse::<StageKind>())
            .collect::<Result<Vec<_>>>()?;

        let message_key = SymmetricKey::from_base64(&metadata.aes_key)
            .map_err(|e| Error::MalformedEnvelope(format!("bad aes_key: {}", e)))?;

        Ok(Self {
            algorithm_order,
            message_key,
            ciphertext: ciphertext.to_string(),
        })
    }

    /// Render as `metadata::ciphertext`
    pub fn to_envelope_string(&self) -> Result<String> {
        let metadata = EnvelopeMetadata {
            algorithms: self
                .algorithm_order
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
            aes_key: self.message_key.to_base64(),
        };
        let metadata = serde_json::to_string(&metadata)?;

        if metadata.contains(SEPARATOR) {
            return Err(Error::SerializationError(
                "envelope metadata contains the separator".into(),
            ));
        }

        Ok(format!("{}{}{}", metadata, SEPARATOR, self.ciphertext))
    }

    /// Stages applied by the sender, in encode order
    pub fn algorithm_order(&self) -> &[StageKind] {
        &self.algorithm_order
    }

    /// Per-message AES key
    pub fn message_key(&self) -> &SymmetricKey {
        &self.message_key
    }

    /// Sealed blob, base64
    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    /// Open the blob and undo the classical chain with the reader's keys
    pub fn open(&self, keys: &ChainKeys) -> Result<String> {
        let stages = keys.stages_for(&self.algorithm_order)?;
        self.open_with_stages(&stages)
    }

    /// Like [`open`](Self::open) with explicit stages, which must match the
    /// envelope's algorithm order
    pub fn open_with_stages(&self, stages: &[CipherStage]) -> Result<String> {
        let kinds: Vec<StageKind> = stages.iter().map(CipherStage::kind).collect();
        if kinds != self.algorithm_order {
            return Err(Error::Configuration(
                "stages do not match the envelope's algorithm order".into(),
            ));
        }

        let encoded = crypto::open(&self.ciphertext, &self.message_key)?;
        crypto::decode(&encoded, stages)
    }
}

/// Build an envelope string in one step
pub fn build(plaintext: &str, stages: &[CipherStage]) -> Result<String> {
    MessageEnvelope::seal(plaintext, stages)?.to_envelope_string()
}

/// Parse an envelope string
pub fn parse(envelope: &str) -> Result<MessageEnvelope> {
    MessageEnvelope::parse(envelope)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn keys() -> ChainKeys {
        ChainKeys::new()
            .with_substitution("LEMON")
            .with_shift(11)
            .with_stream_xor("s3cr3t")
    }

    #[test]
    fn test_build_parse_open() {
        let stages = keys()
            .stages_for(&[StageKind::Substitution, StageKind::StreamXor])
            .unwrap();
        let envelope = build("see you at noon", &stages).unwrap();

        let parsed = parse(&envelope).unwrap();
        assert_eq!(
            parsed.algorithm_order(),
            &[StageKind::Substitution, StageKind::StreamXor]
        );
        assert_eq!(parsed.open(&keys()).unwrap(), "see you at noon");
    }

    #[test]
    fn test_metadata_uses_canonical_names() {
        let stages = keys()
            .stages_for(&[StageKind::Shift, StageKind::StreamXor])
            .unwrap();
        let envelope = build("x", &stages).unwrap();
        assert!(envelope.starts_with(r#"{"algorithms":["shift","stream-xor"],"aes_key":""#));
    }

    #[test]
    fn test_parse_ignores_ciphertext_content() {
        let key = SymmetricKey::generate().to_base64();
        let raw = format!(
            r#"{{"algorithms":["substitution","shift"],"aes_key":"{}"}}::anything"#,
            key
        );
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.algorithm_order(), &[StageKind::Substitution, StageKind::Shift]);
        assert_eq!(parsed.message_key().to_base64(), key);
        assert_eq!(parsed.ciphertext(), "anything");
    }

    #[test]
    fn test_splits_on_first_separator_only() {
        let key = SymmetricKey::generate().to_base64();
        let raw = format!(r#"{{"algorithms":[],"aes_key":"{}"}}::a::b"#, key);
        assert_eq!(parse(&raw).unwrap().ciphertext(), "a::b");
    }

    #[test]
    fn test_legacy_spacing_and_aliases() {
        let key = SymmetricKey::generate().to_base64();
        let raw = format!(
            r#"{{"algorithms": ["vigenere", "caesar", "xor"], "aes_key": "{}"}}::blob"#,
            key
        );
        let parsed = parse(&raw).unwrap();
        assert_eq!(
            parsed.algorithm_order(),
            &[StageKind::Substitution, StageKind::Shift, StageKind::StreamXor]
        );
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(
            parse(r#"{"algorithms":[],"aes_key":"AAAA"}"#),
            Err(Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            parse("not json::blob"),
            Err(Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_bad_key() {
        assert!(matches!(
            parse(r#"{"algorithms":[],"aes_key":"c2hvcnQ="}::blob"#),
            Err(Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm() {
        let key = SymmetricKey::generate().to_base64();
        let raw = format!(r#"{{"algorithms":["rot13"],"aes_key":"{}"}}::blob"#, key);
        assert!(matches!(parse(&raw), Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_wrong_chain_keys_do_not_recover_plaintext() {
        let stages = keys().stages_for(&[StageKind::Substitution]).unwrap();
        let envelope = build("HELLO", &stages).unwrap();

        let wrong = ChainKeys::new().with_substitution("OTHER");
        let out = parse(&envelope).unwrap().open(&wrong).unwrap();
        assert_ne!(out, "HELLO");
    }

    #[test]
    fn test_mismatched_stage_order_rejected() {
        let stages = keys()
            .stages_for(&[StageKind::Substitution, StageKind::Shift])
            .unwrap();
        let envelope = parse(&build("hi", &stages).unwrap()).unwrap();

        let reversed: Vec<_> = stages.into_iter().rev().collect();
        assert!(matches!(
            envelope.open_with_stages(&reversed),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let envelope = build("hi", &[]).unwrap();
        let (meta, blob) = envelope.split_once(SEPARATOR).unwrap();
        let mut bytes = BASE64.decode(blob).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x40;
        let tampered = format!("{}::{}", meta, BASE64.encode(&bytes));

        assert!(matches!(
            parse(&tampered).unwrap().open(&ChainKeys::new()),
            Err(Error::AuthenticationFailed)
        ));
    }
}
