//! Shared doubles for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use meshcall::{
    ConnectionFactory, Error, MediaCapture, MediaSourceHandle, MediaTrack, NativeConnection,
    NegotiationRequest, NegotiationResponse, RemoteTrackSink, Result, SourceKind,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

pub const SAMPLE_SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

/// Install a subscriber so `RUST_LOG=debug cargo test` shows crate output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Capture double handing out synthetic sources
///
/// Screen acquisition can be gated to hold callers mid-acquire, and
/// `screen_acquires` counts how many callers got that far.
pub struct MockCapture {
    pub fail_camera: AtomicBool,
    pub fail_screen: AtomicBool,
    pub gate_screen: AtomicBool,
    pub screen_gate: Semaphore,
    pub screen_acquires: AtomicUsize,
    counter: AtomicUsize,
}

impl MockCapture {
    pub fn new() -> Self {
        Self {
            fail_camera: AtomicBool::new(false),
            fail_screen: AtomicBool::new(false),
            gate_screen: AtomicBool::new(false),
            screen_gate: Semaphore::new(0),
            screen_acquires: AtomicUsize::new(0),
            counter: AtomicUsize::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", prefix, n)
    }
}

#[async_trait]
impl MediaCapture for MockCapture {
    async fn acquire_camera_mic(&self) -> Result<MediaSourceHandle> {
        if self.fail_camera.load(Ordering::SeqCst) {
            return Err(Error::DeviceAcquisition("camera unavailable".to_string()));
        }
        let stream = self.next_id("cam");
        Ok(MediaSourceHandle::new(
            SourceKind::CameraMic,
            vec![
                MediaTrack::audio(&self.next_id("audio"), &stream),
                MediaTrack::video(&self.next_id("video"), &stream),
            ],
        ))
    }

    async fn acquire_screen(&self) -> Result<MediaSourceHandle> {
        self.screen_acquires.fetch_add(1, Ordering::SeqCst);
        if self.fail_screen.load(Ordering::SeqCst) {
            return Err(Error::DeviceAcquisition("screen capture declined".to_string()));
        }
        if self.gate_screen.load(Ordering::SeqCst) {
            let permit = self.screen_gate.acquire().await.unwrap();
            permit.forget();
        }
        let stream = self.next_id("scr");
        Ok(MediaSourceHandle::new(
            SourceKind::Screen,
            vec![MediaTrack::video(&self.next_id("screen"), &stream)],
        ))
    }
}

/// Native connection double recording every commit
pub struct MockConnection {
    pub attached: Mutex<Vec<String>>,
    pub local_commits: AtomicUsize,
    pub remote_commits: AtomicUsize,
    pub closed: AtomicBool,
}

impl MockConnection {
    fn new() -> Self {
        Self {
            attached: Mutex::new(Vec::new()),
            local_commits: AtomicUsize::new(0),
            remote_commits: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn attached_track_ids(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }
}

#[async_trait]
impl NativeConnection for MockConnection {
    async fn create_offer(&self) -> Result<RTCSessionDescription> {
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
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory double exposing every created connection and sink
pub struct MockFactory {
    pub connections: Mutex<HashMap<String, Arc<MockConnection>>>,
    pub sinks: Mutex<HashMap<String, RemoteTrackSink>>,
    pub created: AtomicUsize,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            sinks: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    pub fn connection(&self, peer_id: &str) -> Arc<MockConnection> {
        Arc::clone(&self.connections.lock().unwrap()[peer_id])
    }

    pub fn sink(&self, peer_id: &str) -> RemoteTrackSink {
        Arc::clone(&self.sinks.lock().unwrap()[peer_id])
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    async fn create(
        &self,
        peer_id: &str,
        remote_sink: RemoteTrackSink,
    ) -> Result<Arc<dyn NativeConnection>> {
        let connection = Arc::new(MockConnection::new());
        self.connections
            .lock()
            .unwrap()
            .insert(peer_id.to_string(), Arc::clone(&connection));
        self.sinks
            .lock()
            .unwrap()
            .insert(peer_id.to_string(), remote_sink);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(connection)
    }
}

/// What the signaling double should answer next
pub enum MockReply {
    Answer,
    WrongType,
    GarbageSdp,
    Fail(String),
}

/// Signaling double with an optional gate for in-flight control
///
/// `max_active` records the highest number of concurrent exchanges seen,
/// so tests can assert that commits on one connection never overlap.
pub struct MockSignaling {
    pub requests: Mutex<Vec<serde_json::Value>>,
    pub replies: Mutex<VecDeque<MockReply>>,
    pub gate: Semaphore,
    pub gated: AtomicBool,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl MockSignaling {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            gate: Semaphore::new(0),
            gated: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn queue_reply(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

struct ActiveGuard<'a>(&'a MockSignaling);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl meshcall::SignalingExchange for MockSignaling {
    async fn exchange(&self, request: &NegotiationRequest) -> Result<NegotiationResponse> {
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request).unwrap());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(self);

        if self.gated.load(Ordering::SeqCst) {
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockReply::Answer);
        match reply {
            MockReply::Answer => Ok(NegotiationResponse {
                sdp: SAMPLE_SDP.to_string(),
                kind: RTCSdpType::Answer,
            }),
            MockReply::WrongType => Ok(NegotiationResponse {
                sdp: SAMPLE_SDP.to_string(),
                kind: RTCSdpType::Offer,
            }),
            MockReply::GarbageSdp => Ok(NegotiationResponse {
                sdp: "garbage".to_string(),
                kind: RTCSdpType::Answer,
            }),
            MockReply::Fail(body) => Err(Error::Signaling(body)),
        }
    }
}

/// Poll `predicate` until it holds or a second elapses
pub async fn wait_until<F>(predicate: F)
where
    F: Fn() -> bool,
{
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}
