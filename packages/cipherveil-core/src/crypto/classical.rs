//! # Classical Cipher Chain
//!
//! Keyed, reversible text transforms applied in a caller-chosen order before
//! the AEAD layer.
//!
//! ```text
//! encode:  text ──► stage[0] ──► stage[1] ──► ... ──► stage[n-1] ──► out
//! decode:  out  ──► stage[n-1]⁻¹ ──► ... ──► stage[1]⁻¹ ──► stage[0]⁻¹ ──► text
//! ```
//!
//! | Stage | Wire name | Legacy alias | Key |
//! |-------|-----------|--------------|-----|
//! | Polyalphabetic substitution (Vigenère) | `substitution` | `vigenere` | text, ≥ 3 chars |
//! | Shift (Caesar) | `shift` | `caesar` | integer in 1..=25 |
//! | Stream XOR | `stream-xor` | `xor` | text, ≥ 3 chars |
//!
//! Only ASCII letters are touched by substitution and shift. Stream XOR works
//! on UTF-8 bytes and emits base64, so any stage placed after it sees ASCII.
//!
//! Every stage is validated before the first transform runs; an invalid
//! chain never produces partial output.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{Error, Result};

/// Shortest accepted key for substitution and stream-xor stages
pub const MIN_TEXT_KEY_LEN: usize = 3;

/// Name-only identifier of a cipher stage, as carried in envelope metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Polyalphabetic substitution (Vigenère)
    Substitution,
    /// Fixed alphabet shift (Caesar)
    Shift,
    /// Repeating-key XOR with base64 output
    StreamXor,
}

impl StageKind {
    /// All stage kinds, in their conventional display order
    pub const ALL: [StageKind; 3] = [StageKind::Substitution, StageKind::Shift, StageKind::StreamXor];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Substitution => "substitution",
            StageKind::Shift => "shift",
            StageKind::StreamXor => "stream-xor",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = Error;

    /// Accepts the canonical names and the legacy `vigenere`/`caesar`/`xor`,
    /// matched exactly.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "substitution" | "vigenere" => Ok(StageKind::Substitution),
            "shift" | "caesar" => Ok(StageKind::Shift),
            "stream-xor" | "xor" => Ok(StageKind::StreamXor),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// One keyed stage of the chain
#[derive(Clone, PartialEq, Eq)]
pub enum CipherStage {
    /// Vigenère keyword
    Substitution(String),
    /// Caesar shift amount
    Shift(u8),
    /// XOR keystream source
    StreamXor(String),
}

impl CipherStage {
    /// The stage's kind
    pub fn kind(&self) -> StageKind {
        match self {
            CipherStage::Substitution(_) => StageKind::Substitution,
            CipherStage::Shift(_) => StageKind::Shift,
            CipherStage::StreamXor(_) => StageKind::StreamXor,
        }
    }

    /// Check the key against the stage's constraints
    ///
    /// ## Errors
    ///
    /// `Configuration` if a shift is outside 1..=25 or a text key is shorter
    /// than [`MIN_TEXT_KEY_LEN`] characters.
    pub fn validate(&self) -> Result<()> {
        match self {
            CipherStage::Shift(k) if !(1..=25).contains(k) => Err(Error::Configuration(format!(
                "shift must be between 1 and 25, got {}",
                k
            ))),
            CipherStage::Substitution(key) | CipherStage::StreamXor(key)
                if key.chars().count() < MIN_TEXT_KEY_LEN =>
            {
                Err(Error::Configuration(format!(
                    "{} key must be at least {} characters",
                    self.kind(),
                    MIN_TEXT_KEY_LEN
                )))
            }
            _ => Ok(()),
        }
    }

    fn apply(&self, text: &str) -> String {
        match self {
            CipherStage::Substitution(key) => vigenere(text, key, true),
            CipherStage::Shift(k) => text.chars().map(|c| shift_letter(c, *k)).collect(),
            CipherStage::StreamXor(key) => BASE64.encode(xor_cycle(text.as_bytes(), key.as_bytes())),
        }
    }

    fn invert(&self, text: &str) -> Result<String> {
        match self {
            CipherStage::Substitution(key) => Ok(vigenere(text, key, false)),
            CipherStage::Shift(k) => Ok(text.chars().map(|c| shift_letter(c, 26 - *k)).collect()),
            CipherStage::StreamXor(key) => {
                let bytes = BASE64.decode(text).map_err(|e| {
                    Error::MalformedCiphertext(format!("stream-xor input is not base64: {}", e))
                })?;
                String::from_utf8(xor_cycle(&bytes, key.as_bytes())).map_err(|_| {
                    Error::MalformedCiphertext("stream-xor output is not valid UTF-8".into())
                })
            }
        }
    }
}

impl fmt::Debug for CipherStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherStage::{}(..)", self.kind())
    }
}

fn shift_letter(c: char, shift: u8) -> char {
    let base = if c.is_ascii_uppercase() {
        b'A'
    } else if c.is_ascii_lowercase() {
        b'a'
    } else {
        return c;
    };
    ((c as u8 - base + shift % 26) % 26 + base) as char
}

fn vigenere(text: &str, key: &str, forward: bool) -> String {
    let key: Vec<char> = key.to_uppercase().chars().collect();
    if key.is_empty() {
        return text.to_string();
    }

    // The key position advances on every character, letter or not.
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let k = (key[i % key.len()] as i64 - 'A' as i64).rem_euclid(26) as u8;
            let k = if forward { k } else { (26 - k) % 26 };
            shift_letter(c, k)
        })
        .collect()
}

fn xor_cycle(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

fn validate_all(stages: &[CipherStage]) -> Result<()> {
    stages.iter().try_for_each(CipherStage::validate)
}

/// Run `text` through each stage in order
///
/// ## Example
///
/// ```
/// use cipherveil_core::crypto::{encode, CipherStage};
///
/// let out = encode("HELLO", &[CipherStage::Substitution("KEY".into())]).unwrap();
/// assert_eq!(out, "RIJVS");
/// ```
pub fn encode(text: &str, stages: &[CipherStage]) -> Result<String> {
    validate_all(stages)?;
    if text.is_empty() {
        return Ok(String::new());
    }

    Ok(stages
        .iter()
        .fold(text.to_string(), |acc, stage| stage.apply(&acc)))
}

/// Undo [`encode`]
///
/// `stages` is the order used for encoding; inverses run in reverse.
pub fn decode(text: &str, stages: &[CipherStage]) -> Result<String> {
    validate_all(stages)?;
    if text.is_empty() {
        return Ok(String::new());
    }

    stages
        .iter()
        .rev()
        .try_fold(text.to_string(), |acc, stage| stage.invert(&acc))
}

/// One key per stage kind, as collected from the user
///
/// Resolves an algorithm order from an envelope into concrete stages.
#[derive(Clone, Default)]
pub struct ChainKeys {
    /// Key for `substitution` stages
    pub substitution: Option<String>,
    /// Amount for `shift` stages
    pub shift: Option<u8>,
    /// Key for `stream-xor` stages
    pub stream_xor: Option<String>,
}

impl ChainKeys {
    /// Empty key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the substitution key
    pub fn with_substitution(mut self, key: impl Into<String>) -> Self {
        self.substitution = Some(key.into());
        self
    }

    /// Set the shift amount
    pub fn with_shift(mut self, shift: u8) -> Self {
        self.shift = Some(shift);
        self
    }

    /// Set the stream-xor key
    pub fn with_stream_xor(mut self, key: impl Into<String>) -> Self {
        self.stream_xor = Some(key.into());
        self
    }

    /// Build the stage for `kind`, or fail if no key was supplied for it
    pub fn stage(&self, kind: StageKind) -> Result<CipherStage> {
        let missing = || Error::Configuration(format!("no key supplied for the {} stage", kind));
        match kind {
            StageKind::Substitution => self
                .substitution
                .clone()
                .map(CipherStage::Substitution)
                .ok_or_else(missing),
            StageKind::Shift => self.shift.map(CipherStage::Shift).ok_or_else(missing),
            StageKind::StreamXor => self
                .stream_xor
                .clone()
                .map(CipherStage::StreamXor)
                .ok_or_else(missing),
        }
    }

    /// Resolve an algorithm order into validated stages
    pub fn stages_for(&self, order: &[StageKind]) -> Result<Vec<CipherStage>> {
        let stages = order
            .iter()
            .map(|kind| self.stage(*kind))
            .collect::<Result<Vec<_>>>()?;
        validate_all(&stages)?;
        Ok(stages)
    }
}

impl fmt::Debug for ChainKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainKeys")
            .field("substitution", &self.substitution.is_some())
            .field("shift", &self.shift.is_some())
            .field("stream_xor", &self.stream_xor.is_some())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
