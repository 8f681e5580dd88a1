//! JPEG encoding with mount-orientation correction

use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, imageops};

use super::FrameEncoder;
use crate::config::CameraConfig;
use crate::types::RawImage;
use crate::{PicarError, Result};

/// How the camera is mounted relative to the car.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orientation {
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    pub rotation: u16,
    pub hflip: bool,
    pub vflip: bool,
}

impl Orientation {
    pub fn is_identity(&self) -> bool {
        self.rotation == 0 && !self.hflip && !self.vflip
    }

    fn apply(&self, mut image: RgbImage) -> RgbImage {
        image = match self.rotation {
            90 => imageops::rotate90(&image),
            180 => {
                imageops::rotate180_in_place(&mut image);
                image
            }
            270 => imageops::rotate270(&image),
            _ => image,
        };
        if self.hflip {
            imageops::flip_horizontal_in_place(&mut image);
        }
        if self.vflip {
            imageops::flip_vertical_in_place(&mut image);
        }
        image
    }
}

impl From<&CameraConfig> for Orientation {
    fn from(config: &CameraConfig) -> Self {
        Self { rotation: config.rotation, hflip: config.hflip, vflip: config.vflip }
    }
}

/// Baseline JPEG encoder backed by the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct JpegFrameEncoder {
    orientation: Orientation,
}

impl JpegFrameEncoder {
    pub fn new(orientation: Orientation) -> Self {
        Self { orientation }
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, image: &RawImage, quality: u8) -> Result<Vec<u8>> {
        if !image.is_well_formed() {
            return Err(PicarError::encode_failed(format!(
                "{}x{} image carries {} bytes, expected {}",
                image.width,
                image.height,
                image.pixels.len(),
                image.width as usize * image.height as usize * 3
            )));
        }

        let buffer = RgbImage::from_raw(image.width, image.height, image.pixels.clone())
            .ok_or_else(|| PicarError::encode_failed("pixel buffer rejected by codec"))?;
        let buffer =
            if self.orientation.is_identity() { buffer } else { self.orientation.apply(buffer) };

        let mut jpeg = Vec::with_capacity(image.pixels.len() / 8);
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode_image(&buffer)?;
        Ok(jpeg)
    }
}
