//! Shared state behind every stream session

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::buffer::BroadcastBuffer;
use super::session::{SessionReport, StreamSession};

/// Broadcast buffer plus viewer accounting.
///
/// Wrap in an `Arc` and hand clones to the capture loop and to whatever
/// transport accepts viewer connections.
pub struct StreamHub {
    buffer: BroadcastBuffer,

    /// True while a capture loop is publishing
    producer_online: AtomicBool,

    next_client_id: AtomicU64,
    active_clients: AtomicUsize,

    /// Delay between buffer checks in each session
    poll_interval: Duration,

    /// Cancelled on process shutdown; sessions and the capture loop watch it
    shutdown: CancellationToken,
}

impl StreamHub {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            buffer: BroadcastBuffer::new(),
            producer_online: AtomicBool::new(false),
            next_client_id: AtomicU64::new(0),
            active_clients: AtomicUsize::new(0),
            poll_interval,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn buffer(&self) -> &BroadcastBuffer {
        &self.buffer
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Whether a capture loop is currently running.
    pub fn producer_online(&self) -> bool {
        self.producer_online.load(Ordering::Acquire)
    }

    pub(crate) fn set_producer_online(&self, online: bool) {
        self.producer_online.store(online, Ordering::Release);
    }

    /// Number of sessions currently alive.
    pub fn active_clients(&self) -> usize {
        self.active_clients.load(Ordering::Acquire)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ask every session and the capture loop to finish.
    pub fn shutdown(&self) {
        debug!("Stream hub shutting down ({} clients)", self.active_clients());
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Register a new viewer.
    pub fn open_session(self: &Arc<Self>) -> StreamSession {
        let client_id = self.next_client_id.fetch_add(1, Ordering::AcqRel) + 1;
        self.active_clients.fetch_add(1, Ordering::AcqRel);
        StreamSession::new(Arc::clone(self), client_id)
    }

    pub(crate) fn release_client(&self) -> usize {
        self.active_clients.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Run a session on its own task and expose its output as a byte stream.
    ///
    /// Suitable as a streaming HTTP body. Dropping the stream disconnects the
    /// session. The channel holds a single unit so a slow consumer only
    /// delays its own session, which then skips ahead to the newest frame.
    pub fn spawn_stream(
        self: &Arc<Self>,
    ) -> (impl Stream<Item = Vec<u8>> + Send + 'static, tokio::task::JoinHandle<SessionReport>) {
        let (tx, rx) = mpsc::channel(1);
        let session = self.open_session();
        let task = tokio::spawn(async move {
            let mut sink = tx;
            session.run(&mut sink).await
        });
        (ReceiverStream::new(rx), task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_unique_and_counted() {
        let hub = Arc::new(StreamHub::new(Duration::from_millis(10)));

        let first = hub.open_session();
        let second = hub.open_session();

        assert_ne!(first.state().client_id, second.state().client_id);
        assert_eq!(hub.active_clients(), 2);

        drop(first);
        assert_eq!(hub.active_clients(), 1);
        drop(second);
        assert_eq!(hub.active_clients(), 0);
    }

    #[test]
    fn shutdown_is_observable() {
        let hub = StreamHub::new(Duration::from_millis(10));
        let token = hub.shutdown_token();

        assert!(!hub.is_shut_down());
        hub.shutdown();
        assert!(token.is_cancelled());
    }
}
