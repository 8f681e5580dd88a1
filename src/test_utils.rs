//! Test doubles shared by unit tests and benchmarks
//!
//! Sinks, cameras and encoders with scripted behaviour so the broadcast
//! engine can be driven deterministically without hardware.

#![cfg(any(test, feature = "benchmark"))]

use std::io;

use crate::Result;
use crate::PicarError;
use crate::camera::{FrameEncoder, FrameSource};
use crate::stream::{FrameSink, mjpeg};
use crate::types::RawImage;

/// Sink that records every multipart unit it accepts.
#[derive(Debug, Default)]
pub struct RecordingSink {
    parts: Vec<Vec<u8>>,
    /// Accept this many units, then report the viewer as gone
    accept_limit: Option<usize>,
    /// Fail every emit with this error kind
    failure: Option<io::ErrorKind>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `count` units, then fail with `BrokenPipe`.
    pub fn disconnect_after(count: usize) -> Self {
        Self { accept_limit: Some(count), ..Self::default() }
    }

    /// Fail every emit with `kind`.
    pub fn fail_with(kind: io::ErrorKind) -> Self {
        Self { failure: Some(kind), ..Self::default() }
    }

    /// Raw multipart units in emit order.
    pub fn parts(&self) -> &[Vec<u8>] {
        &self.parts
    }

    /// JPEG payloads extracted from the recorded units.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.parts.iter().filter_map(|part| mjpeg::decode_part(part)).map(<[u8]>::to_vec).collect()
    }
}

#[async_trait::async_trait]
impl FrameSink for RecordingSink {
    async fn emit(&mut self, chunk: &[u8]) -> io::Result<()> {
        if let Some(kind) = self.failure {
            return Err(io::Error::from(kind));
        }
        if self.accept_limit.is_some_and(|limit| self.parts.len() >= limit) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.parts.push(chunk.to_vec());
        Ok(())
    }
}

/// Camera with scripted availability and failures.
#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    available: bool,
    /// Every n-th capture fails (0 disables)
    fail_every: u64,
    /// Capture panics instead of returning
    panics: bool,
    captures: u64,
}

impl ScriptedCamera {
    pub fn healthy() -> Self {
        Self { available: true, fail_every: 0, panics: false, captures: 0 }
    }

    /// Camera whose initialization always fails.
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::healthy() }
    }

    /// Camera where every `n`-th capture fails.
    pub fn failing_every(n: u64) -> Self {
        Self { fail_every: n, ..Self::healthy() }
    }

    /// Camera that initializes, then panics on its first capture.
    pub fn panicking() -> Self {
        Self { panics: true, ..Self::healthy() }
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedCamera {
    async fn initialize(&mut self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(PicarError::capture_failed("no camera detected"))
        }
    }

    async fn capture(&mut self) -> Result<RawImage> {
        self.captures += 1;
        if self.panics {
            panic!("scripted camera crash on capture #{}", self.captures);
        }
        if self.fail_every > 0 && self.captures % self.fail_every == 0 {
            return Err(PicarError::capture_failed(format!("scripted failure #{}", self.captures)));
        }
        Ok(RawImage::filled(8, 8, [(self.captures % 256) as u8, 0, 0]))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Encoder that returns the raw pixels unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEncoder;

impl FrameEncoder for PassthroughEncoder {
    fn encode(&self, image: &RawImage, _quality: u8) -> Result<Vec<u8>> {
        Ok(image.pixels.clone())
    }
}

/// Encoder that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEncoder;

impl FrameEncoder for FailingEncoder {
    fn encode(&self, _image: &RawImage, _quality: u8) -> Result<Vec<u8>> {
        Err(PicarError::encode_failed("scripted encoder failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_sink_disconnects_after_limit() {
        let mut sink = RecordingSink::disconnect_after(1);
        sink.emit(&mjpeg::encode_part(b"a")).await.expect("first accepted");
        let err = sink.emit(&mjpeg::encode_part(b"b")).await.expect_err("second rejected");

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.payloads(), vec![b"a".to_vec()]);
    }

    #[tokio::test]
    async fn scripted_camera_fails_on_schedule() {
        let mut camera = ScriptedCamera::failing_every(3);
        camera.initialize().await.expect("available");

        let results: Vec<bool> = {
            let mut out = Vec::new();
            for _ in 0..6 {
                out.push(camera.capture().await.is_ok());
            }
            out
        };
        assert_eq!(results, vec![true, true, false, true, true, false]);
    }
}
