//! Latest-frame buffer shared by the producer and all viewers

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::types::EncodedFrame;

/// Holds the most recently published frame and its version.
///
/// Publishing swaps in a new `Arc<EncodedFrame>` under the channel's write
/// lock; readers clone the `Arc` under the read lock and release it before
/// touching the bytes. Neither side holds the lock across I/O.
///
/// Versions start at 1 for the first publish and increase by exactly one per
/// publish. A `u64` counter cannot wrap in any realistic uptime.
pub struct BroadcastBuffer {
    latest: watch::Sender<Option<Arc<EncodedFrame>>>,
}

impl BroadcastBuffer {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self { latest }
    }

    /// Store `jpeg` as the latest frame and return its version.
    pub fn publish(&self, jpeg: Vec<u8>) -> u64 {
        // Copy into shared storage before taking the lock
        let bytes: Arc<[u8]> = jpeg.into();
        let mut version = 0;

        self.latest.send_modify(|slot| {
            version = slot.as_ref().map_or(0, |frame| frame.version) + 1;
            *slot = Some(Arc::new(EncodedFrame::from_shared(bytes, version)));
        });

        version
    }

    /// Latest frame, or `None` before the first publish.
    pub fn read(&self) -> Option<Arc<EncodedFrame>> {
        self.latest.borrow().clone()
    }

    /// Version of the latest frame, 0 before the first publish.
    pub fn version(&self) -> u64 {
        self.latest.borrow().as_ref().map_or(0, |frame| frame.version)
    }

    /// Stream of published frames.
    ///
    /// Yields the current frame immediately (if any), then each new one.
    /// A consumer that falls behind sees only the newest frame when it
    /// catches up.
    pub fn updates(&self) -> impl Stream<Item = Arc<EncodedFrame>> + Send + 'static {
        WatchStream::new(self.latest.subscribe()).filter_map(|opt| async move { opt })
    }
}

impl Default for BroadcastBuffer {
    fn default() -> Self {
        Self::new()
    }
}
