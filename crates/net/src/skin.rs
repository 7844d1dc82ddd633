//! Skin thumbnails carried in status payloads and player detail records.
//!
//! A thumbnail is an 8x8 RGB texture stored row-major, three bytes per pixel.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use thiserror::Error;

/// Width and height of a skin thumbnail in pixels.
pub const SKIN_SIDE: usize = 8;

/// Encoded size of a skin thumbnail in bytes.
pub const SKIN_BYTES: usize = SKIN_SIDE * SKIN_SIDE * 3;

/// Errors produced while decoding a skin thumbnail.
#[derive(Debug, Error)]
pub enum SkinError {
    /// The block did not contain exactly [`SKIN_BYTES`] bytes.
    #[error("skin block must be 192 bytes, got {0}")]
    Length(usize),
    /// The base64 text could not be decoded.
    #[error("invalid base64 skin: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Fixed-size RGB thumbnail (8x8 pixels).
#[derive(Clone, PartialEq, Eq)]
pub struct SkinBlock([u8; SKIN_BYTES]);

impl SkinBlock {
    /// Wrap raw bytes, rejecting anything that is not exactly [`SKIN_BYTES`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SkinError> {
        let block: [u8; SKIN_BYTES] = bytes
            .try_into()
            .map_err(|_| SkinError::Length(bytes.len()))?;
        Ok(Self(block))
    }

    /// Decode a base64 string as sent by the player detail endpoint.
    pub fn from_base64(text: &str) -> Result<Self, SkinError> {
        let bytes = STANDARD.decode(text.trim())?;
        Self::from_slice(&bytes)
    }

    /// Encode to base64 (inverse of [`SkinBlock::from_base64`]).
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Raw bytes in wire order.
    pub fn as_bytes(&self) -> &[u8; SKIN_BYTES] {
        &self.0
    }

    /// RGB value of the pixel at column `x`, row `y`.
    ///
    /// Returns `None` for coordinates outside the 8x8 grid.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= SKIN_SIDE || y >= SKIN_SIDE {
            return None;
        }
        let offset = (y * SKIN_SIDE + x) * 3;
        Some([self.0[offset], self.0[offset + 1], self.0[offset + 2]])
    }

    /// Iterate rows top to bottom, each row yielding its eight pixels.
    pub fn rows(&self) -> impl Iterator<Item = [[u8; 3]; SKIN_SIDE]> + '_ {
        self.0.chunks_exact(SKIN_SIDE * 3).map(|row| {
            let mut pixels = [[0u8; 3]; SKIN_SIDE];
            for (pixel, rgb) in pixels.iter_mut().zip(row.chunks_exact(3)) {
                pixel.copy_from_slice(rgb);
            }
            pixels
        })
    }
}

impl fmt::Debug for SkinBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkinBlock")
            .field("first_pixel", &self.pixel(0, 0))
            .finish_non_exhaustive()
    }
}
