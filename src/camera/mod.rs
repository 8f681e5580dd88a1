//! Camera collaborators: frame sources and frame encoders.
//!
//! The physical camera driver lives outside this crate. It plugs in by
//! implementing [`FrameSource`]; compression plugs in through
//! [`FrameEncoder`]. [`JpegFrameEncoder`] covers the common case and
//! [`SyntheticCamera`] stands in when no sensor is attached.

mod jpeg;
mod placeholder;
mod synthetic;

pub use jpeg::{JpegFrameEncoder, Orientation};
pub use placeholder::{PLACEHOLDER_SIZE, placeholder_jpeg};
pub use synthetic::SyntheticCamera;

use crate::Result;
use crate::types::RawImage;

/// Trait for camera drivers.
///
/// A source is owned by exactly one capture loop. Each call to
/// [`capture`](FrameSource::capture) produces one image on demand; pacing is
/// the capture loop's job, not the source's.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Acquire and configure the device.
    ///
    /// An error here means the camera is unavailable: the capture loop never
    /// starts and viewers receive the placeholder frame.
    async fn initialize(&mut self) -> Result<()>;

    /// Capture one raw image.
    ///
    /// An error skips this frame only; the loop tries again on the next tick.
    async fn capture(&mut self) -> Result<RawImage>;

    /// Release the device. Called once after the capture loop exits.
    async fn close(&mut self) {}

    /// Human-readable device name for logs.
    fn name(&self) -> &str {
        "camera"
    }
}

/// Trait for still-image compressors.
///
/// Encoding runs on the blocking thread pool, so implementations must be
/// shareable across threads.
pub trait FrameEncoder: Send + Sync + 'static {
    /// Compress `image` into JPEG bytes at `quality` (1-100).
    fn encode(&self, image: &RawImage, quality: u8) -> Result<Vec<u8>>;
}

#[async_trait::async_trait]
impl FrameSource for Box<dyn FrameSource> {
    async fn initialize(&mut self) -> Result<()> {
        (**self).initialize().await
    }

    async fn capture(&mut self) -> Result<RawImage> {
        (**self).capture().await
    }

    async fn close(&mut self) {
        (**self).close().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
