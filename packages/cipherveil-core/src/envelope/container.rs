//! Keyed containers: `<base64 key>::<base64 sealed blob>`.
//!
//! Used for `.enc` files and for stego payloads. Unlike a message envelope
//! there is no classical chain, only a fresh AES key carried in the clear
//! next to the blob it opens.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::SEPARATOR;
use crate::crypto::{self, SymmetricKey};
use crate::error::{Error, Result};

/// Seal `plaintext` under a fresh key and prepend the key
pub fn seal_keyed(plaintext: &str) -> Result<String> {
    let key = SymmetricKey::generate();
    let blob = crypto::seal(plaintext, &key)?;
    Ok(format!("{}{}{}", key.to_base64(), SEPARATOR, blob))
}

/// Open a keyed container
///
/// Surrounding whitespace is ignored.
///
/// ## Errors
///
/// - `MalformedEnvelope` if the separator is missing or the key is not
///   16 base64 bytes
/// - whatever [`crypto::open`] reports for the blob
pub fn open_keyed(container: &str) -> Result<String> {
    let (key, blob) = container
        .trim()
        .split_once(SEPARATOR)
        .ok_or_else(|| Error::MalformedEnvelope("missing '::' separator".into()))?;

    let key = SymmetricKey::from_base64(key)
        .map_err(|e| Error::MalformedEnvelope(format!("bad container key: {}", e)))?;

    crypto::open(blob.trim(), &key)
}

/// Encrypt any file into an ASCII `.enc` container
///
/// The file bytes are base64-encoded before sealing so binary content
/// survives the text-only AEAD path.
pub fn encrypt_file(input: &Path, output: &Path) -> Result<()> {
    let raw = std::fs::read(input).map_err(|e| {
        Error::StorageReadError(format!("Failed to read {}: {}", input.display(), e))
    })?;

    let container = seal_keyed(&BASE64.encode(&raw))?;

    std::fs::write(output, container).map_err(|e| {
        Error::StorageWriteError(format!("Failed to write {}: {}", output.display(), e))
    })?;

    tracing::info!(
        "Encrypted {} ({} bytes) to {}",
        input.display(),
        raw.len(),
        output.display()
    );
    Ok(())
}

/// Reverse [`encrypt_file`]
///
/// Nothing is written unless the container opens and decodes cleanly.
pub fn decrypt_file(input: &Path, output: &Path) -> Result<()> {
    let container = std::fs::read_to_string(input).map_err(|e| {
        Error::StorageReadError(format!("Failed to read {}: {}", input.display(), e))
    })?;

    let encoded = open_keyed(&container)?;
    let raw = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| Error::MalformedCiphertext(format!("file body is not base64: {}", e)))?;

    std::fs::write(output, &raw).map_err(|e| {
        Error::StorageWriteError(format!("Failed to write {}: {}", output.display(), e))
    })?;

    tracing::info!("Decrypted {} to {}", input.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_round_trip() {
        let sealed = seal_keyed("hidden words").unwrap();
        assert!(sealed.contains("::"));
        assert_eq!(open_keyed(&sealed).unwrap(), "hidden words");
    }

    #[test]
    fn test_keyed_tolerates_whitespace() {
        let sealed = format!("\n  {}  \n", seal_keyed("x").unwrap());
        assert_eq!(open_keyed(&sealed).unwrap(), "x");
    }

    #[test]
    fn test_keyed_missing_separator() {
        assert!(matches!(
            open_keyed("no separator here"),
            Err(Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_keyed_bad_key() {
        assert!(matches!(
            open_keyed("AAAA::AAAA"),
            Err(Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_file_round_trip_binary() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("photo.bin");
        let enc = dir.path().join("photo.enc");
        let back = dir.path().join("photo.out");

        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std::fs::write(&plain, &data).unwrap();

        encrypt_file(&plain, &enc).unwrap();
        let stored = std::fs::read_to_string(&enc).unwrap();
        assert!(stored.is_ascii());

        decrypt_file(&enc, &back).unwrap();
        assert_eq!(std::fs::read(&back).unwrap(), data);
    }

    #[test]
    fn test_decrypt_garbage_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let enc = dir.path().join("bad.enc");
        let out = dir.path().join("out.bin");
        std::fs::write(&enc, "definitely not a container").unwrap();

        assert!(decrypt_file(&enc, &out).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_encrypt_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = encrypt_file(&dir.path().join("nope"), &dir.path().join("x.enc"));
        assert!(matches!(result, Err(Error::StorageReadError(_))));
    }
}
