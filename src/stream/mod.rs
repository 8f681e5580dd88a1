//! Multi-viewer video broadcast engine.
//!
//! One [`CaptureLoop`] publishes encoded frames into a [`BroadcastBuffer`];
//! any number of [`StreamSession`]s poll that buffer at their own pace and
//! write each new frame to their viewer in the MJPEG multipart format.
//!
//! ```text
//! FrameSource ─▶ CaptureLoop ─▶ BroadcastBuffer ─┬─▶ StreamSession ─▶ FrameSink
//!                                                ├─▶ StreamSession ─▶ FrameSink
//!                                                └─▶ ...
//! ```
//!
//! The buffer only ever holds the latest frame. A viewer on a slow link
//! skips intermediate versions instead of queueing them, so memory use does
//! not grow with the number or speed of viewers and the publisher is never
//! held up by a reader.

mod buffer;
mod capture;
mod hub;
pub mod mjpeg;
mod session;

pub use buffer::BroadcastBuffer;
pub use capture::{CaptureHandle, CaptureLoop, CaptureStats};
pub use hub::StreamHub;
pub use session::{FrameSink, SessionEnd, SessionReport, SessionState, StreamSession};
