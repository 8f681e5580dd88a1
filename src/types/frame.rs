//! Frame types for the broadcast engine

use std::sync::Arc;
use tokio::time::Instant;

/// Uncompressed RGB8 image as returned by a frame source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triplets, `width * height * 3` bytes
    pub pixels: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }

    /// Solid-colour image.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let len = width as usize * height as usize * 3;
        let pixels = rgb.iter().copied().cycle().take(len).collect();
        Self { width, height, pixels }
    }

    /// Whether the pixel buffer length matches the dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * 3
    }
}

/// Published JPEG frame.
///
/// Immutable once constructed; the broadcast buffer hands out `Arc`s so
/// every reader shares the same bytes.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// JPEG bytes (zero-copy via Arc)
    pub bytes: Arc<[u8]>,

    /// Publish counter, starting at 1 for the first frame
    pub version: u64,

    /// When the frame was published
    pub published_at: Instant,
}

impl EncodedFrame {
    /// Wrap bytes that are already in shared storage.
    pub fn from_shared(bytes: Arc<[u8]>, version: u64) -> Self {
        Self { bytes, version, published_at: Instant::now() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
