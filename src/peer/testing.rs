//! In-crate test doubles for the native connection seam

use crate::media::MediaTrack;
use crate::peer::{ConnectionFactory, NativeConnection, RemoteTrackSink};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Minimal description body accepted by the SDP parser
pub(crate) const SAMPLE_SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

pub(crate) struct StubConnection {
    attached: Mutex<Vec<String>>,
    local_commits: AtomicUsize,
    remote_commits: AtomicUsize,
    close_calls: AtomicUsize,
    pub(crate) terminal: AtomicBool,
    pub(crate) fail_offer: AtomicBool,
}

impl StubConnection {
    pub(crate) fn new() -> Self {
        Self {
            attached: Mutex::new(Vec::new()),
            local_commits: AtomicUsize::new(0),
            remote_commits: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            terminal: AtomicBool::new(false),
            fail_offer: AtomicBool::new(false),
        }
    }

    pub(crate) fn attached_track_ids(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    pub(crate) fn local_commits(&self) -> usize {
        self.local_commits.load(Ordering::SeqCst)
    }

    pub(crate) fn remote_commits(&self) -> usize {
        self.remote_commits.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NativeConnection for StubConnection {
    async fn create_offer(&self) -> Result<RTCSessionDescription> {
        if self.fail_offer.load(Ordering::SeqCst) {
            return Err(Error::Connection("offer creation failed".to_string()));
        }
        RTCSessionDescription::offer(SAMPLE_SDP.to_string())
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn set_local_description(&self, _desc: RTCSessionDescription) -> Result<()> {
        self.local_commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_remote_description(&self, _desc: RTCSessionDescription) -> Result<()> {
        self.remote_commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn attach_track(&self, track: &MediaTrack) -> Result<()> {
        self.attached.lock().unwrap().push(track.id().to_string());
        Ok(())
    }

    async fn detach_track(&self, track_id: &str) -> Result<()> {
        self.attached.lock().unwrap().retain(|id| id != track_id);
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.terminal.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct StubFactory {
    created: Mutex<Vec<Arc<StubConnection>>>,
}

impl StubFactory {
    pub(crate) fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub(crate) fn connection(&self, index: usize) -> Arc<StubConnection> {
        Arc::clone(&self.created.lock().unwrap()[index])
    }
}

#[async_trait]
impl ConnectionFactory for StubFactory {
    async fn create(
        &self,
        _peer_id: &str,
        _remote_sink: RemoteTrackSink,
    ) -> Result<Arc<dyn NativeConnection>> {
        let connection = Arc::new(StubConnection::new());
        self.created.lock().unwrap().push(Arc::clone(&connection));
        Ok(connection)
    }
}

pub(crate) fn noop_sink() -> RemoteTrackSink {
    Arc::new(|_, _| {})
}
