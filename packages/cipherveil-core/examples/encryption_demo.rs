//! # Encryption Demo
//!
//! Walks a message through every layer: cipher chain, AEAD envelope,
//! field encryption at rest, and back.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example encryption_demo
//! ```

use std::sync::Arc;

use cipherveil_core::crypto::{self, ChainKeys, StageKind, SymmetricKey};
use cipherveil_core::envelope::MessageEnvelope;
use cipherveil_core::storage::{classify, FieldCipher, MessageStore};
use cipherveil_core::Messenger;

fn main() {
    println!("=== Cipherveil Core: Layered Encryption Demo ===\n");

    let message = "Meet me at the old bridge at 6pm.";
    let keys = ChainKeys::new()
        .with_substitution("LANTERN")
        .with_shift(7)
        .with_stream_xor("harbor");
    let order = [StageKind::Substitution, StageKind::Shift, StageKind::StreamXor];

    // Step 1: Classical chain
    println!("Step 1: Running the cipher chain {:?}...", order);
    let stages = keys.stages_for(&order).expect("All stage keys are present");

    let mut text = message.to_string();
    for stage in &stages {
        text = crypto::encode(&text, std::slice::from_ref(stage)).expect("Stage failed");
        println!("  after {:<12} {}", stage.kind(), text);
    }
    println!();

    // Step 2: Envelope
    println!("Step 2: Sealing under a fresh message key (AES-128-GCM)...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                      ENVELOPE FORMAT                        │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │   {{\"algorithms\":[...],\"aes_key\":\"...\"}} :: base64 blob     │");
    println!("  │                                                             │");
    println!("  │   blob = nonce (16) ‖ tag (16) ‖ ciphertext                 │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let envelope = MessageEnvelope::seal(message, &stages).expect("Sealing failed");
    let wire = envelope.to_envelope_string().expect("Serialization failed");
    println!("  Envelope: {}...", &wire[..wire.len().min(72)]);
    println!();

    // Step 3: Field encryption
    println!("Step 3: Encrypting the envelope for storage...");
    let cipher = FieldCipher::new(SymmetricKey::generate());
    let stored = cipher.protect(&wire).expect("Field sealing failed");
    println!("  Stored value: {}...", &stored[..stored.len().min(48)]);
    println!("  Classified as: {:?}", classify(&stored));
    println!();

    // Step 4: Full round trip through the messenger
    println!("Step 4: Sending and reading through an in-memory store...");
    let store = MessageStore::open(None, cipher).expect("Failed to open store");
    let messenger = Messenger::new(Arc::new(store), 2);

    let id = messenger
        .send("alice", "bob", message, &stages)
        .expect("Send failed");
    let inbox = messenger.inbox("bob").expect("Inbox failed");
    println!("  Bob's inbox: {} message(s)", inbox.len());

    let read = messenger.read(id, &keys).expect("Read failed");
    println!("  Decrypted: {}", read.plaintext);
    assert_eq!(read.plaintext, message);
    println!();

    // Step 5: Wrong key
    println!("Step 5: Reading with the wrong substitution key...");
    let wrong = keys.clone().with_substitution("LANTERM");
    match messenger.read(id, &wrong) {
        Ok(msg) => println!("  Got different text: {}", msg.plaintext),
        Err(e) => println!("  Failed: {}", e),
    }
    println!();

    println!("=== Demo Complete ===");
}
