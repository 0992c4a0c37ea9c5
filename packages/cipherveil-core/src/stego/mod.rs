//! # Steganography Module
//!
//! Hides sealed messages in the least significant bits of an image.
//!
//! ## Hide / Reveal Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        STEGO PIPELINE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  hide_message(src, message, out)                                        │
//! │     │                                                                   │
//! │     ├── out must end in .png                                            │
//! │     ├── load_carrier(src)      PNG, BMP, ... → 8-bit RGB / RGBA          │
//! │     ├── seal_keyed(message)    "<key b64>::<blob b64>"                  │
//! │     ├── lsb::embed             capacity checked before any write        │
//! │     └── save_png(out)                                                   │
//! │                                                                         │
//! │  reveal_message(path)                                                   │
//! │     │                                                                   │
//! │     ├── load_carrier(path)                                              │
//! │     ├── lsb::extract           up to the 0xFF 0xFE marker               │
//! │     ├── UTF-8, "key::blob", AEAD open                                   │
//! │     └── any failure here ──► PayloadNotFound                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output is always PNG. A lossy format would scramble the LSBs, so the
//! output path is rejected up front rather than silently re-encoded.
//!
//! The embedding itself carries no integrity check. A payload that survives
//! extraction is trusted only after the AEAD tag verifies.

pub mod lsb;

use std::path::Path;

use image::{ImageFormat, RgbImage, RgbaImage};

use crate::envelope::{open_keyed, seal_keyed};
use crate::error::{Error, Result};

/// An 8-bit carrier image
#[derive(Debug, Clone)]
pub enum Carrier {
    /// Three channels, every sample usable
    Rgb(RgbImage),
    /// Four channels, alpha left alone
    Rgba(RgbaImage),
}

impl Carrier {
    /// Width and height in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Carrier::Rgb(img) => img.dimensions(),
            Carrier::Rgba(img) => img.dimensions(),
        }
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        let (w, h) = self.dimensions();
        w as usize * h as usize
    }

    /// LSB slots available for payload and marker
    pub fn capacity_bits(&self) -> usize {
        lsb::capacity_bits(self.pixel_count())
    }

    /// Largest payload, in bytes, this carrier can hold
    pub fn max_payload_len(&self) -> usize {
        (self.capacity_bits() / 8).saturating_sub(lsb::EOF_MARKER.len())
    }

    /// Embed `payload` into the pixel data
    pub fn embed(&mut self, payload: &[u8]) -> Result<()> {
        match self {
            Carrier::Rgb(img) => lsb::embed(img, 3, payload),
            Carrier::Rgba(img) => lsb::embed(img, 4, payload),
        }
    }

    /// Extract a payload from the pixel data
    pub fn extract(&self) -> Result<Vec<u8>> {
        match self {
            Carrier::Rgb(img) => lsb::extract(img, 3),
            Carrier::Rgba(img) => lsb::extract(img, 4),
        }
    }
}

/// Decode an image file into a carrier
///
/// Images with alpha become [`Carrier::Rgba`], everything else
/// [`Carrier::Rgb`]. Samples wider than 8 bits are narrowed.
pub fn load_carrier(path: &Path) -> Result<Carrier> {
    let img = image::ImageReader::open(path)
        .map_err(|e| Error::StorageReadError(format!("Failed to open {}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| Error::StorageReadError(format!("Failed to read {}: {}", path.display(), e)))?
        .decode()?;

    let carrier = if img.color().has_alpha() {
        Carrier::Rgba(img.to_rgba8())
    } else {
        Carrier::Rgb(img.to_rgb8())
    };

    tracing::debug!(
        "Loaded carrier {} ({}x{}, {} bits)",
        path.display(),
        carrier.dimensions().0,
        carrier.dimensions().1,
        carrier.capacity_bits()
    );
    Ok(carrier)
}

fn ensure_png_path(path: &Path) -> Result<()> {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);

    if is_png {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat(format!(
            "{} must be a .png file; other formats can destroy hidden data",
            path.display()
        )))
    }
}

/// Write a carrier as PNG
pub fn save_png(carrier: &Carrier, path: &Path) -> Result<()> {
    ensure_png_path(path)?;

    match carrier {
        Carrier::Rgb(img) => img.save_with_format(path, ImageFormat::Png)?,
        Carrier::Rgba(img) => img.save_with_format(path, ImageFormat::Png)?,
    }
    Ok(())
}

/// Seal `message` under a fresh key and hide it in `source`, writing `output`
///
/// ## Errors
///
/// - `UnsupportedFormat` if `output` is not a `.png` path
/// - `Capacity` if the image is too small; nothing is written
pub fn hide_message(source: &Path, message: &str, output: &Path) -> Result<()> {
    ensure_png_path(output)?;
    if message.trim().is_empty() {
        return Err(Error::Configuration("message must not be empty".into()));
    }

    let mut carrier = load_carrier(source)?;
    let payload = seal_keyed(message)?;
    carrier.embed(payload.as_bytes())?;
    save_png(&carrier, output)?;

    tracing::info!(
        "Hid {} byte payload in {}",
        payload.len(),
        output.display()
    );
    Ok(())
}

/// Recover a message hidden by [`hide_message`]
pub fn reveal_message(path: &Path) -> Result<String> {
    let carrier = load_carrier(path)?;
    let payload = carrier.extract()?;

    let payload = String::from_utf8(payload)
        .map_err(|_| Error::PayloadNotFound("payload is not text".into()))?;

    open_keyed(&payload).map_err(|e| Error::PayloadNotFound(e.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    fn cover_rgb(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_hide_reveal_png() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("cover.png");
        let out = dir.path().join("stego.png");
        cover_rgb(64, 64).save(&src).unwrap();

        hide_message(&src, "the eagle lands at dawn", &out).unwrap();
        assert_eq!(reveal_message(&out).unwrap(), "the eagle lands at dawn");
    }

    #[test]
    fn test_hide_reveal_from_bmp() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("cover.bmp");
        let out = dir.path().join("stego.png");
        cover_rgb(48, 48).save(&src).unwrap();

        hide_message(&src, "bitmap cover", &out).unwrap();
        assert_eq!(reveal_message(&out).unwrap(), "bitmap cover");
    }

    #[test]
    fn test_rgba_alpha_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("cover.png");
        let out = dir.path().join("stego.png");
        let cover = RgbaImage::from_fn(40, 40, |x, y| {
            Rgba([x as u8, y as u8, 99, ((x * y) % 256) as u8])
        });
        cover.save(&src).unwrap();

        hide_message(&src, "translucent", &out).unwrap();

        let Carrier::Rgba(stego) = load_carrier(&out).unwrap() else {
            panic!("expected an RGBA carrier");
        };
        for (before, after) in cover.pixels().zip(stego.pixels()) {
            assert_eq!(before.0[3], after.0[3]);
        }
        assert_eq!(reveal_message(&out).unwrap(), "translucent");
    }

    #[test]
    fn test_capacity_leaves_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tiny.png");
        let out = dir.path().join("out.png");
        cover_rgb(2, 2).save(&src).unwrap();
        let before = std::fs::read(&src).unwrap();

        let err = hide_message(&src, "far too long for four pixels", &out).unwrap_err();
        assert!(matches!(err, Error::Capacity { available: 12, .. }));
        assert!(!out.exists());
        assert_eq!(std::fs::read(&src).unwrap(), before);
    }

    #[test]
    fn test_non_png_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("cover.png");
        cover_rgb(64, 64).save(&src).unwrap();

        let result = hide_message(&src, "hi", &dir.path().join("out.jpg"));
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_clean_image_has_no_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]))
            .save(&path)
            .unwrap();

        assert!(matches!(
            reveal_message(&path),
            Err(Error::PayloadNotFound(_))
        ));
    }

    #[test]
    fn test_raw_payload_without_container_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.png");
        let mut carrier = Carrier::Rgb(cover_rgb(32, 32));
        carrier.embed(b"just some text").unwrap();
        save_png(&carrier, &path).unwrap();

        assert!(matches!(
            reveal_message(&path),
            Err(Error::PayloadNotFound(_))
        ));
    }

    #[test]
    fn test_max_payload_len() {
        let carrier = Carrier::Rgb(cover_rgb(8, 1));
        assert_eq!(carrier.capacity_bits(), 24);
        assert_eq!(carrier.max_payload_len(), 1);
    }
}
