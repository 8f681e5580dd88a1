//! Test-pattern camera for running without a sensor

use tracing::info;

use super::FrameSource;
use crate::Result;
use crate::types::RawImage;

/// Camera that renders a scrolling colour gradient.
///
/// Useful on a development machine or for soak-testing the broadcast path;
/// every frame differs from the previous one so viewers can see motion.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_index: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, frame_index: 0 }
    }

    /// Number of frames produced so far.
    pub fn frames_captured(&self) -> u64 {
        self.frame_index
    }

    fn render(&self) -> RawImage {
        let (width, height) = (self.width as usize, self.height as usize);
        let shift = (self.frame_index * 4) as usize;
        let mut pixels = Vec::with_capacity(width * height * 3);

        for y in 0..height {
            for x in 0..width {
                pixels.push(((x + shift) * 255 / width.max(1)) as u8);
                pixels.push((y * 255 / height.max(1)) as u8);
                pixels.push((self.frame_index % 256) as u8);
            }
        }
        RawImage::new(self.width, self.height, pixels)
    }
}

#[async_trait::async_trait]
impl FrameSource for SyntheticCamera {
    async fn initialize(&mut self) -> Result<()> {
        info!("Synthetic camera initialized: {}x{}", self.width, self.height);
        Ok(())
    }

    async fn capture(&mut self) -> Result<RawImage> {
        let image = self.render();
        self.frame_index += 1;
        Ok(image)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_change_over_time() {
        let mut camera = SyntheticCamera::new(16, 8);
        camera.initialize().await.expect("initializes");

        let first = camera.capture().await.expect("captures");
        let second = camera.capture().await.expect("captures");

        assert!(first.is_well_formed());
        assert_eq!((first.width, first.height), (16, 8));
        assert_ne!(first.pixels, second.pixels);
        assert_eq!(camera.frames_captured(), 2);
    }
}
