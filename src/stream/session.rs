//! Per-viewer stream session

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use super::hub::StreamHub;
use super::mjpeg;
use crate::PicarError;
use crate::camera::placeholder_jpeg;

/// Transport-side output for one viewer.
///
/// The session never sees the socket itself; it hands each multipart unit
/// to `emit`. Connection-closed error kinds (`BrokenPipe`,
/// `ConnectionReset`, `ConnectionAborted`, `NotConnected`, `UnexpectedEof`)
/// end the session normally; any other error is logged as a failure.
#[async_trait::async_trait]
pub trait FrameSink: Send {
    async fn emit(&mut self, chunk: &[u8]) -> io::Result<()>;
}

#[async_trait::async_trait]
impl FrameSink for mpsc::Sender<Vec<u8>> {
    async fn emit(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.send(chunk.to_vec()).await.map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

/// Bookkeeping owned by one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub client_id: u64,
    /// Version of the last frame emitted, `None` until the first emit
    pub last_seen_version: Option<u64>,
    pub connected_at: Instant,
}

/// Why a session finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// No camera: the placeholder frame was sent once
    Placeholder,
    /// The viewer went away
    Disconnected,
    /// Process shutdown was requested
    Shutdown,
    /// The sink failed with a non-disconnect error
    IoError(io::ErrorKind),
}

/// Summary returned when a session finishes.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub client_id: u64,
    pub frames_sent: u64,
    pub last_seen_version: Option<u64>,
    pub end: SessionEnd,
    pub duration: Duration,
}

/// One viewer's polling loop over the broadcast buffer.
///
/// Created through [`StreamHub::open_session`]; dropping it (or finishing
/// [`run`](StreamSession::run)) deregisters the viewer.
pub struct StreamSession {
    hub: Arc<StreamHub>,
    state: SessionState,
    frames_sent: u64,
}

impl StreamSession {
    pub(crate) fn new(hub: Arc<StreamHub>, client_id: u64) -> Self {
        info!("Client #{} connected (total clients: {})", client_id, hub.active_clients());
        let state =
            SessionState { client_id, last_seen_version: None, connected_at: Instant::now() };
        Self { hub, state, frames_sent: 0 }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Stream frames into `sink` until the viewer leaves or shutdown.
    ///
    /// Emits each frame whose version is newer than the last one sent; when
    /// nothing new is buffered it sleeps for the hub's poll interval. If no
    /// frame exists and no capture loop is running, the placeholder is sent
    /// once and the session ends.
    pub async fn run<S>(mut self, sink: &mut S) -> SessionReport
    where
        S: FrameSink + ?Sized,
    {
        let shutdown = self.hub.shutdown_token();
        let poll_interval = self.hub.poll_interval();
        let client_id = self.state.client_id;

        let end = loop {
            if shutdown.is_cancelled() {
                break SessionEnd::Shutdown;
            }

            match self.hub.buffer().read() {
                Some(frame) if self.is_unseen(frame.version) => {
                    let part = mjpeg::encode_part(&frame.bytes);
                    let result = tokio::select! {
                        _ = shutdown.cancelled() => break SessionEnd::Shutdown,
                        result = sink.emit(&part) => result,
                    };
                    if let Err(e) = result {
                        break self.classify(e);
                    }

                    trace!(
                        "Client #{} sent version {} ({:?} after publish)",
                        client_id,
                        frame.version,
                        frame.published_at.elapsed()
                    );
                    self.state.last_seen_version = Some(frame.version);
                    self.frames_sent += 1;
                    if self.frames_sent % 100 == 0 {
                        debug!("Client #{} streamed {} frames", client_id, self.frames_sent);
                    }
                }
                Some(_) => {}
                None if !self.hub.producer_online() => {
                    error!("Camera not initialized, sending placeholder to client #{}", client_id);
                    let part = mjpeg::encode_part(&placeholder_jpeg());
                    let result = tokio::select! {
                        _ = shutdown.cancelled() => break SessionEnd::Shutdown,
                        result = sink.emit(&part) => result,
                    };
                    break match result {
                        Ok(()) => SessionEnd::Placeholder,
                        Err(e) => self.classify(e),
                    };
                }
                None => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => break SessionEnd::Shutdown,
                _ = tokio::time::sleep(poll_interval) => {}
            }
        };

        SessionReport {
            client_id,
            frames_sent: self.frames_sent,
            last_seen_version: self.state.last_seen_version,
            end,
            duration: self.state.connected_at.elapsed(),
        }
    }

    fn is_unseen(&self, version: u64) -> bool {
        self.state.last_seen_version.is_none_or(|seen| version > seen)
    }

    fn classify(&self, err: io::Error) -> SessionEnd {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => {
                info!("Client #{} disconnected normally", self.state.client_id);
                SessionEnd::Disconnected
            }
            kind => {
                let err = PicarError::session_io(self.state.client_id, err);
                error!("{}: {}", err, kind);
                SessionEnd::IoError(kind)
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let remaining = self.hub.release_client();
        info!(
            "Client #{} stopped after {} frames (remaining clients: {})",
            self.state.client_id, self.frames_sent, remaining
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;

    fn hub() -> Arc<StreamHub> {
        Arc::new(StreamHub::new(Duration::from_millis(5)))
    }

    /// Viewer whose transport never accepts a write.
    struct StalledSink;

    #[async_trait::async_trait]
    impl FrameSink for StalledSink {
        async fn emit(&mut self, _chunk: &[u8]) -> io::Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn placeholder_once_without_camera() {
        let hub = hub();
        let mut sink = RecordingSink::new();

        let report = hub.open_session().run(&mut sink).await;

        assert_eq!(report.end, SessionEnd::Placeholder);
        assert_eq!(report.frames_sent, 0);
        assert_eq!(sink.parts().len(), 1);
        let payload = mjpeg::decode_part(&sink.parts()[0]).expect("multipart unit");
        assert_eq!(payload, placeholder_jpeg().as_ref());
        assert_eq!(hub.active_clients(), 0);
    }

    #[tokio::test]
    async fn serves_last_frame_once_after_producer_stops() {
        let hub = hub();
        hub.buffer().publish(vec![7; 4]);

        let task = {
            let session = hub.open_session();
            tokio::spawn(async move {
                let mut sink = RecordingSink::new();
                let report = session.run(&mut sink).await;
                (report, sink)
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        hub.shutdown();

        let (report, sink) = task.await.expect("session task");
        assert_eq!(report.end, SessionEnd::Shutdown);
        assert_eq!(report.last_seen_version, Some(1));
        assert_eq!(report.frames_sent, 1);
        assert_eq!(sink.payloads(), vec![vec![7; 4]]);
    }

    #[tokio::test]
    async fn disconnect_ends_only_that_session() {
        let hub = hub();
        hub.set_producer_online(true);
        hub.buffer().publish(vec![1]);

        let staying_session = hub.open_session();
        let mut leaving = RecordingSink::fail_with(io::ErrorKind::BrokenPipe);
        let report = hub.open_session().run(&mut leaving).await;
        assert_eq!(report.end, SessionEnd::Disconnected);
        assert_eq!(hub.active_clients(), 1);

        let staying_task = tokio::spawn(async move {
            let mut sink = RecordingSink::new();
            let report = staying_session.run(&mut sink).await;
            (report, sink)
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.buffer().publish(vec![2]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.shutdown();

        let (report, staying) = staying_task.await.expect("session task");
        assert_eq!(report.end, SessionEnd::Shutdown);
        assert_eq!(staying.payloads(), vec![vec![1], vec![2]]);
        assert_eq!(hub.active_clients(), 0);
    }

    #[tokio::test]
    async fn io_failure_is_reported() {
        let hub = hub();
        hub.buffer().publish(vec![1]);
        let mut sink = RecordingSink::fail_with(io::ErrorKind::PermissionDenied);

        let report = hub.open_session().run(&mut sink).await;

        assert_eq!(report.end, SessionEnd::IoError(io::ErrorKind::PermissionDenied));
        assert_eq!(report.frames_sent, 0);
    }

    #[tokio::test]
    async fn waits_for_first_frame_while_producer_online() {
        let hub = hub();
        hub.set_producer_online(true);

        let task = {
            let session = hub.open_session();
            tokio::spawn(async move {
                let mut sink = RecordingSink::disconnect_after(1);
                let report = session.run(&mut sink).await;
                (report, sink)
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.buffer().publish(vec![9]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.buffer().publish(vec![10]);

        let (report, sink) = task.await.expect("session task");
        assert_eq!(report.end, SessionEnd::Disconnected);
        assert_eq!(report.last_seen_version, Some(1));
        assert_eq!(sink.payloads(), vec![vec![9]]);
    }

    #[tokio::test]
    async fn shutdown_interrupts_stalled_placeholder_write() {
        let hub = hub();
        let task = {
            let session = hub.open_session();
            tokio::spawn(async move { session.run(&mut StalledSink).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.shutdown();

        let report = tokio::time::timeout(Duration::from_millis(300), task)
            .await
            .expect("session ends after shutdown")
            .expect("session task");
        assert_eq!(report.end, SessionEnd::Shutdown);
        assert_eq!(report.frames_sent, 0);
        assert_eq!(hub.active_clients(), 0);
    }

    #[tokio::test]
    async fn channel_sink_reports_dropped_receiver() {
        let (mut tx, rx) = mpsc::channel::<Vec<u8>>(1);
        drop(rx);
        let err = tx.emit(b"unit").await.expect_err("receiver dropped");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
