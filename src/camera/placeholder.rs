//! Static "camera unavailable" frame

use std::sync::{Arc, OnceLock};

use tracing::{debug, error};

use super::{FrameEncoder, JpegFrameEncoder};
use crate::types::RawImage;

/// Placeholder dimensions, matching the default capture resolution.
pub const PLACEHOLDER_SIZE: (u32, u32) = (640, 480);

const PLACEHOLDER_QUALITY: u8 = 80;

static PLACEHOLDER: OnceLock<Arc<[u8]>> = OnceLock::new();

/// JPEG shown to viewers when no camera is available.
///
/// Generated on first use and shared afterwards. If encoding fails the
/// result is empty, which still yields a well-formed (bodyless) multipart
/// unit.
pub fn placeholder_jpeg() -> Arc<[u8]> {
    Arc::clone(PLACEHOLDER.get_or_init(|| {
        let (width, height) = PLACEHOLDER_SIZE;
        match JpegFrameEncoder::default().encode(&render(width, height), PLACEHOLDER_QUALITY) {
            Ok(jpeg) => {
                debug!("Generated placeholder frame ({} bytes)", jpeg.len());
                jpeg.into()
            }
            Err(e) => {
                error!("Error generating placeholder: {}", e);
                Arc::from(Vec::new())
            }
        }
    }))
}

/// Black field crossed by a dim red "no signal" X.
fn render(width: u32, height: u32) -> RawImage {
    let mut image = RawImage::filled(width, height, [0, 0, 0]);
    let thickness = (width.min(height) / 60).max(1) as i64;

    for y in 0..height {
        let expected = y as u64 * width as u64 / height as u64;
        for x in 0..width {
            let down = (x as i64 - expected as i64).abs();
            let up = (x as i64 - (width as i64 - 1 - expected as i64)).abs();
            if down <= thickness || up <= thickness {
                let offset = (y as usize * width as usize + x as usize) * 3;
                image.pixels[offset..offset + 3].copy_from_slice(&[96, 16, 16]);
            }
        }
    }
    image
}
