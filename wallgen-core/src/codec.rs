//! Transport encoding for generated images.
//!
//! The image service hands back compressed images wrapped in base64. Decoding
//! is lazy: [`decode`] returns an iterator that only touches an element when it
//! is pulled, so a malformed payload surfaces exactly where it sits in the batch.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};

use crate::error::{Result, WallgenError};

/// Base64 text of a compressed image, as carried over JSON/HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(Vec<u8>);

impl EncodedImage {
    pub fn new(encoded: impl Into<Vec<u8>>) -> Self {
        Self(encoded.into())
    }

    /// Wraps raw compressed image bytes (e.g. a downloaded JPEG).
    pub fn from_raw(raw: &[u8]) -> Self {
        Self(STANDARD.encode(raw).into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lazy, single-pass decoder over a batch of encoded images.
pub struct Decoded<I> {
    inner: I,
    position: usize,
}

impl<I> Iterator for Decoded<I>
where
    I: Iterator<Item = EncodedImage>,
{
    type Item = Result<RgbImage>;

    fn next(&mut self) -> Option<Self::Item> {
        let encoded = self.inner.next()?;
        let position = self.position;
        self.position += 1;

        Some(decode_one(&encoded).map_err(|e| match e {
            WallgenError::Decode(reason) => {
                WallgenError::Decode(format!("batch element {}: {}", position, reason))
            }
            other => other,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Decodes a batch lazily, preserving input order.
pub fn decode<B>(batch: B) -> Decoded<B::IntoIter>
where
    B: IntoIterator<Item = EncodedImage>,
{
    Decoded {
        inner: batch.into_iter(),
        position: 0,
    }
}

/// Decodes a single payload into an RGB raster.
pub fn decode_one(encoded: &EncodedImage) -> Result<RgbImage> {
    // MIME-style payloads wrap lines; the base64 engine itself is strict.
    let compact: Vec<u8> = encoded
        .as_bytes()
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let raw = STANDARD
        .decode(&compact)
        .map_err(|e| WallgenError::Decode(format!("invalid base64: {}", e)))?;

    let decoded = image::load_from_memory(&raw)
        .map_err(|e| WallgenError::Decode(format!("invalid image data: {}", e)))?;

    let rgb = decoded.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(WallgenError::Decode("image has no pixels".to_string()));
    }

    log::debug!("Decoded {}x{} image from {} bytes", rgb.width(), rgb.height(), raw.len());
    Ok(rgb)
}

/// Compresses and base64-wraps a raster.
pub fn encode(image: &RgbImage, format: ImageFormat) -> Result<EncodedImage> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format)?;
    Ok(EncodedImage::from_raw(buffer.get_ref()))
}
