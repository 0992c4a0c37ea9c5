//! # Cryptography Module
//!
//! The two cipher layers every message passes through before it is stored.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE CIPHER LAYERS                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  plaintext                                                              │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            CLASSICAL CHAIN (classical.rs)                       │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  0..N stages in caller order:                                   │   │
//! │  │  • substitution  (Vigenère, keyword ≥ 3 chars)                  │   │
//! │  │  • shift         (Caesar, 1..=25)                               │   │
//! │  │  • stream-xor    (repeating key XOR, base64 out)                │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            AEAD ENVELOPE (aead.rs)                              │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  AES-128-GCM, 16-byte random nonce, 16-byte tag                 │   │
//! │  │  base64(nonce || tag || ciphertext)                             │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  envelope / field cipher / .enc file / stego payload                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The classical stages add no security on top of AES. They exist because
//! readers of stored envelopes must replay the same chain the sender chose.
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: `SymmetricKey` is zeroized when dropped
//! 2. **Secure Random**: `rand::rngs::OsRng` for keys and nonces
//! 3. **No Key Reuse**: Fresh nonce for every seal

mod aead;
mod classical;

pub use aead::{
    open, open_bytes, seal, seal_bytes, Nonce, SymmetricKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
pub use classical::{decode, encode, CipherStage, ChainKeys, StageKind, MIN_TEXT_KEY_LEN};
