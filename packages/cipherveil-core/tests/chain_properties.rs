//! Property-based tests for the cipher chain, the AEAD envelope and the
//! LSB codec.
//!
//! Each layer must invert exactly for any input it accepts, in any stage
//! order, with any valid key.

use cipherveil_core::crypto::{self, CipherStage, StageKind, SymmetricKey};
use cipherveil_core::envelope::{self, MessageEnvelope};
use cipherveil_core::stego::lsb;
use cipherveil_core::storage::{classify, FieldCipher, FieldClass, Revealed};
use proptest::prelude::*;

/// Text keys of at least three characters, including non-ASCII.
fn text_key() -> impl Strategy<Value = String> {
    "\\PC{3,12}"
}

/// A single valid stage.
fn stage_strategy() -> impl Strategy<Value = CipherStage> {
    prop_oneof![
        text_key().prop_map(CipherStage::Substitution),
        (1u8..=25).prop_map(CipherStage::Shift),
        text_key().prop_map(CipherStage::StreamXor),
    ]
}

/// Chains of up to five stages, repeats allowed.
fn chain_strategy() -> impl Strategy<Value = Vec<CipherStage>> {
    prop::collection::vec(stage_strategy(), 0..5)
}

/// One stage of each kind, in arbitrary order.
fn distinct_chain_strategy() -> impl Strategy<Value = Vec<CipherStage>> {
    (text_key(), 1u8..=25, text_key())
        .prop_map(|(sub, shift, xor)| {
            vec![
                CipherStage::Substitution(sub),
                CipherStage::Shift(shift),
                CipherStage::StreamXor(xor),
            ]
        })
        .prop_shuffle()
}

proptest! {
    /// decode(encode(t)) == t for every chain.
    #[test]
    fn prop_chain_round_trip(text in "\\PC*", stages in chain_strategy()) {
        let encoded = crypto::encode(&text, &stages).unwrap();
        let decoded = crypto::decode(&encoded, &stages).unwrap();
        prop_assert_eq!(decoded, text);
    }

    /// Shift and substitution never change length or non-letters.
    #[test]
    fn prop_letter_stages_preserve_shape(text in "\\PC*", key in text_key(), shift in 1u8..=25) {
        for stage in [CipherStage::Substitution(key.clone()), CipherStage::Shift(shift)] {
            let out = crypto::encode(&text, std::slice::from_ref(&stage)).unwrap();
            prop_assert_eq!(out.chars().count(), text.chars().count());
            for (a, b) in text.chars().zip(out.chars()) {
                if !a.is_ascii_alphabetic() {
                    prop_assert_eq!(a, b);
                } else {
                    prop_assert_eq!(a.is_ascii_uppercase(), b.is_ascii_uppercase());
                }
            }
        }
    }

    /// Out-of-range shifts are rejected before any stage runs.
    #[test]
    fn prop_invalid_shift_rejected(shift in 26u8..=255) {
        let stages = [CipherStage::Shift(shift)];
        prop_assert!(crypto::encode("abc", &stages).is_err());
    }

    /// AEAD seal/open with a fresh key recovers the input.
    #[test]
    fn prop_aead_round_trip(text in "\\PC*") {
        let key = SymmetricKey::generate();
        let blob = crypto::seal(&text, &key).unwrap();
        prop_assert_eq!(crypto::open(&blob, &key).unwrap(), text);
    }

    /// Flipping any byte of a sealed blob fails authentication.
    #[test]
    fn prop_aead_tamper_detected(data in prop::collection::vec(any::<u8>(), 0..64), idx in any::<prop::sample::Index>()) {
        let key = SymmetricKey::generate();
        let mut blob = crypto::seal_bytes(&data, &key).unwrap();
        let i = idx.index(blob.len());
        blob[i] ^= 0x01;
        prop_assert!(crypto::open_bytes(&blob, &key).is_err());
    }

    /// Envelope strings parse back to the same order and open to the text.
    #[test]
    fn prop_envelope_round_trip(text in "\\PC*", stages in distinct_chain_strategy()) {
        let wire = envelope::build(&text, &stages).unwrap();
        let parsed = MessageEnvelope::parse(&wire).unwrap();

        let order: Vec<StageKind> = stages.iter().map(CipherStage::kind).collect();
        prop_assert_eq!(parsed.algorithm_order(), &order[..]);
        prop_assert_eq!(parsed.open_with_stages(&stages).unwrap(), text);
    }

    /// Protected fields always classify as encrypted and reveal to the input.
    #[test]
    fn prop_field_cipher_round_trip(value in "\\PC{1,80}") {
        let cipher = FieldCipher::new(SymmetricKey::generate());
        let stored = cipher.protect(&value).unwrap();

        prop_assert_eq!(classify(&stored), FieldClass::Encrypted);
        prop_assert_eq!(cipher.reveal(&stored), Revealed::Decrypted(value));
    }

    /// LSB extract(embed(p)) == p for payloads without the marker pair.
    #[test]
    fn prop_lsb_round_trip(payload in "[ -~]{0,64}", channels in prop_oneof![Just(3usize), Just(4usize)], slack in 0usize..50) {
        let pixels = (lsb::required_bits(payload.len()) + 2) / 3 + slack;
        let mut samples: Vec<u8> = (0..pixels * channels).map(|i| (i * 31 % 256) as u8).collect();

        lsb::embed(&mut samples, channels, payload.as_bytes()).unwrap();
        prop_assert_eq!(lsb::extract(&samples, channels).unwrap(), payload.as_bytes());
    }

    /// Undersized carriers are rejected without modification.
    #[test]
    fn prop_lsb_capacity_enforced(payload in prop::collection::vec(any::<u8>(), 1..32)) {
        let pixels = lsb::required_bits(payload.len()) / 3 - 1;
        let original = vec![0xAAu8; pixels * 3];
        let mut samples = original.clone();

        prop_assert!(lsb::embed(&mut samples, 3, &payload).is_err());
        prop_assert_eq!(samples, original);
    }
}
