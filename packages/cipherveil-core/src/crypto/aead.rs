//! # AEAD Envelope
//!
//! AES-128-GCM sealing of a single string or byte buffer. This is the unit
//! that the message envelope, the field cipher, `.enc` files and stego
//! payloads all build on.
//!
//! ## Blob Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SEALED BLOB                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   0                16                32                                 │
//! │   ┌────────────────┬────────────────┬──────────────────────────────┐    │
//! │   │  nonce (16 B)  │   tag (16 B)   │  ciphertext (len(plaintext)) │    │
//! │   └────────────────┴────────────────┴──────────────────────────────┘    │
//! │                                                                         │
//! │   Text form: standard base64 of the whole blob                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The 16-byte nonce is wider than the 12 bytes GCM usually takes. It is a
//! fixed wire contract with every blob already written, so the cipher is
//! instantiated as `AesGcm<Aes128, U16>` rather than the stock `Aes128Gcm`.
//!
//! ## Security Properties
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Confidentiality | Only holders of the 16-byte key can read the data |
//! | Integrity | Any modification of nonce, tag or ciphertext is detected |
//! | Nonce uniqueness | Fresh OS-random nonce per seal |

use std::fmt;

use aes_gcm::aead::{consts::U16, generic_array::GenericArray, AeadInPlace, KeyInit};
use aes_gcm::aes::Aes128;
use aes_gcm::AesGcm;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of a symmetric key in bytes (128 bits)
pub const KEY_SIZE: usize = 16;

/// Size of the nonce prefix in bytes
pub const NONCE_SIZE: usize = 16;

/// Size of the authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// AES-128-GCM with a 16-byte nonce and the default 16-byte tag
type Aes128Gcm16 = AesGcm<Aes128, U16>;

/// A nonce (number used once) for AES-GCM encryption
///
/// **NEVER reuse a nonce with the same key!** Every seal draws a new one
/// from the operating system RNG.
#[derive(Clone, Copy, Debug)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A 128-bit symmetric key
///
/// Used for master keys, biometric keys and ephemeral message keys alike.
/// Zeroized when dropped. `Debug` never prints the key bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generate a fresh random key from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly [`KEY_SIZE`] bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Decode a standard base64 key
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidKey(format!("key is not valid base64: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Encode the key as standard base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

fn cipher_for(key: &SymmetricKey) -> Result<Aes128Gcm16> {
    Aes128Gcm16::new_from_slice(key.as_bytes())
        .map_err(|e| Error::InvalidKey(format!("Invalid key: {}", e)))
}

/// Seal raw bytes, returning `nonce || tag || ciphertext`
pub fn seal_bytes(plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;
    let nonce = Nonce::random();

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce.as_bytes()), b"", &mut buffer)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buffer.len());
    blob.extend_from_slice(nonce.as_bytes());
    blob.extend_from_slice(tag.as_slice());
    blob.extend_from_slice(&buffer);
    Ok(blob)
}

/// Open a raw `nonce || tag || ciphertext` blob
///
/// ## Errors
///
/// - `MalformedCiphertext` if the blob is shorter than nonce + tag
/// - `AuthenticationFailed` if the tag does not verify (wrong key, or any
///   byte of the blob was altered)
pub fn open_bytes(blob: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::MalformedCiphertext(format!(
            "blob is {} bytes, need at least {}",
            blob.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }

    let (nonce, rest) = blob.split_at(NONCE_SIZE);
    let (tag, ciphertext) = rest.split_at(TAG_SIZE);

    let cipher = cipher_for(key)?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| Error::AuthenticationFailed)?;

    Ok(buffer)
}

/// Seal a string and return the base64 text form
///
/// ## Example
///
/// ```
/// use cipherveil_core::crypto::{open, seal, SymmetricKey};
///
/// let key = SymmetricKey::generate();
/// let blob = seal("Hello", &key).unwrap();
/// assert_eq!(open(&blob, &key).unwrap(), "Hello");
/// ```
pub fn seal(plaintext: &str, key: &SymmetricKey) -> Result<String> {
    Ok(BASE64.encode(seal_bytes(plaintext.as_bytes(), key)?))
}

/// Open a base64 blob produced by [`seal`]
pub fn open(blob_b64: &str, key: &SymmetricKey) -> Result<String> {
    let blob = BASE64
        .decode(blob_b64.trim())
        .map_err(|e| Error::MalformedCiphertext(format!("not valid base64: {}", e)))?;
    let plaintext = open_bytes(&blob, key)?;
    String::from_utf8(plaintext)
        .map_err(|_| Error::MalformedCiphertext("plaintext is not valid UTF-8".into()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_basic() {
        let key = SymmetricKey::from_bytes([42u8; KEY_SIZE]);
        let blob = seal("Hello, World!", &key).unwrap();
        assert_eq!(open(&blob, &key).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_seal_open_empty() {
        let key = SymmetricKey::from_bytes([42u8; KEY_SIZE]);
        let blob = seal("", &key).unwrap();
        assert_eq!(BASE64.decode(&blob).unwrap().len(), NONCE_SIZE + TAG_SIZE);
        assert_eq!(open(&blob, &key).unwrap(), "");
    }

    #[test]
    fn test_blob_layout() {
        let key = SymmetricKey::generate();
        let raw = seal_bytes(b"abcde", &key).unwrap();
        assert_eq!(raw.len(), NONCE_SIZE + TAG_SIZE + 5);
    }

    #[test]
    fn test_zero_key_nonce_uniqueness() {
        let key = SymmetricKey::from_bytes([0u8; KEY_SIZE]);

        let first = seal("test", &key).unwrap();
        let second = seal("test", &key).unwrap();

        assert_ne!(first, second);
        assert_eq!(open(&first, &key).unwrap(), "test");
        assert_eq!(open(&second, &key).unwrap(), "test");
    }

    #[test]
    fn test_every_flipped_byte_fails_authentication() {
        let key = SymmetricKey::generate();
        let blob = seal_bytes(b"attack at dawn", &key).unwrap();

        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            let result = open_bytes(&tampered, &key);
            assert!(
                matches!(result, Err(Error::AuthenticationFailed)),
                "flip at byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = SymmetricKey::from_bytes([1u8; KEY_SIZE]);
        let key2 = SymmetricKey::from_bytes([2u8; KEY_SIZE]);

        let blob = seal("secret", &key1).unwrap();
        assert!(matches!(open(&blob, &key2), Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_short_blob_rejected() {
        let key = SymmetricKey::generate();
        let short = BASE64.encode([0u8; NONCE_SIZE + TAG_SIZE - 1]);
        assert!(matches!(
            open(&short, &key),
            Err(Error::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let key = SymmetricKey::generate();
        assert!(matches!(
            open("not base64 at all!", &key),
            Err(Error::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_non_utf8_plaintext_rejected_by_text_open() {
        let key = SymmetricKey::generate();
        let blob = BASE64.encode(seal_bytes(&[0xFF, 0xFE, 0x00], &key).unwrap());
        assert!(matches!(
            open(&blob, &key),
            Err(Error::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_key_from_slice_length() {
        assert!(SymmetricKey::from_slice(&[0u8; 15]).is_err());
        assert!(SymmetricKey::from_slice(&[0u8; 32]).is_err());
        assert!(SymmetricKey::from_slice(&[0u8; 16]).is_ok());
    }

    #[test]
    fn test_key_base64_round_trip() {
        let key = SymmetricKey::generate();
        let decoded = SymmetricKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(decoded.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_key_debug_hides_bytes() {
        let key = SymmetricKey::from_bytes([0xAB; KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "SymmetricKey(..)");
    }
}
