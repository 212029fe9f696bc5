//! Session controller: join/leave, screen share, push-driven renegotiation

use crate::config::SessionConfig;
use crate::media::{MediaCapture, MediaSourceHandle};
use crate::negotiation::NegotiationEngine;
use crate::peer::{
    ConnectionFactory, ConnectionRegistry, RemoteTrackSink, RtcConnectionFactory,
};
use crate::signaling::{
    HttpSignaling, NotificationStream, RequestMetadata, ServerEvent, SignalingExchange,
};
use crate::{RemoteTrack, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Well-known identifier of the media hub peer
pub const HUB_PEER_ID: &str = "server_peer";

/// High-level session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not joined
    Idle,
    /// Join in progress
    Connecting,
    /// Joined and negotiated with the hub
    Connected,
    /// Join failed; the message describes why
    Failed(String),
}

/// Events surfaced to the embedding application
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session status changed
    StatusChanged(SessionStatus),
    /// A remote track arrived on one of the peer connections
    RemoteTrack {
        /// Peer the track arrived from
        peer_id: String,
        /// Arrival metadata of the track
        track: RemoteTrack,
    },
}

struct ControllerInner {
    config: SessionConfig,
    capture: Arc<dyn MediaCapture>,
    registry: ConnectionRegistry,
    engine: NegotiationEngine,
    status: RwLock<SessionStatus>,
    room: RwLock<Option<String>>,
    camera: RwLock<Option<MediaSourceHandle>>,
    screen: RwLock<Option<MediaSourceHandle>>,
    screen_watcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Orchestrates one mesh session
///
/// Owns the local capture sources, the connection registry and the
/// negotiation engine. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    /// Create a controller with explicit collaborators
    ///
    /// Returns the controller together with the receiver for its
    /// [`SessionEvent`] stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) when
    /// the configuration does not validate.
    pub fn new(
        config: SessionConfig,
        capture: Arc<dyn MediaCapture>,
        signaling: Arc<dyn SignalingExchange>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sink_tx = events_tx.clone();
        let remote_sink: RemoteTrackSink = Arc::new(move |peer_id, track| {
            let _ = sink_tx.send(SessionEvent::RemoteTrack { peer_id, track });
        });

        let registry = ConnectionRegistry::new(factory, remote_sink);
        let engine = NegotiationEngine::new(
            signaling,
            Duration::from_secs(config.exchange_timeout_secs),
        );
        let room = config.room_id.clone();

        let controller = Self {
            inner: Arc::new(ControllerInner {
                config,
                capture,
                registry,
                engine,
                status: RwLock::new(SessionStatus::Idle),
                room: RwLock::new(room),
                camera: RwLock::new(None),
                screen: RwLock::new(None),
                screen_watcher: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
                events: events_tx,
            }),
        };
        Ok((controller, events_rx))
    }

    /// Create a controller wired to HTTP signaling and `webrtc`-rs connections
    pub fn with_http(
        config: SessionConfig,
        capture: Arc<dyn MediaCapture>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        let signaling = Arc::new(HttpSignaling::new(
            config.signaling_url.clone(),
            config.auth_token.clone(),
        )?);
        let factory = Arc::new(RtcConnectionFactory::new(config.clone()));
        Self::new(config, capture, signaling, factory)
    }

    /// Join the session: acquire camera + microphone and negotiate with the hub
    ///
    /// A `room_id` given here overrides the configured one for the rest of
    /// the session. Returns the camera source handle on success.
    ///
    /// # Errors
    ///
    /// Device acquisition and negotiation failures both land the session in
    /// `Failed`; a later `join` retries from scratch.
    pub async fn join(&self, room_id: Option<String>) -> Result<MediaSourceHandle> {
        if let Some(room) = room_id {
            *self.inner.room.write().await = Some(room);
        }
        let room = self.inner.room.read().await.clone();
        match &self.inner.config.user_id {
            Some(user) => info!("Joining session as {} (room: {:?})", user, room),
            None => info!("Joining session (room: {:?})", room),
        }

        self.set_status(SessionStatus::Connecting).await;

        let camera = match self.inner.capture.acquire_camera_mic().await {
            Ok(camera) => camera,
            Err(e) => {
                self.set_status(SessionStatus::Failed(e.to_string())).await;
                return Err(e);
            }
        };
        *self.inner.camera.write().await = Some(camera.clone());

        if let Err(e) = self.dial(HUB_PEER_ID).await {
            self.set_status(SessionStatus::Failed(e.to_string())).await;
            return Err(e);
        }

        self.set_status(SessionStatus::Connected).await;
        Ok(camera)
    }

    /// Open (or renegotiate) a direct connection to another peer
    ///
    /// The new connection carries every currently live local source.
    pub async fn connect_peer(&self, peer_id: &str) -> Result<()> {
        self.dial(peer_id).await
    }

    /// Toggle screen sharing
    ///
    /// Starting acquires a screen source, attaches it to every connection
    /// and renegotiates each; the handle is returned. Stopping detaches and
    /// renegotiates everywhere, then returns `None`. When the capture ends
    /// externally the stop path runs automatically.
    ///
    /// # Errors
    ///
    /// A per-connection failure does not stop the sweep over the remaining
    /// connections; the first error is returned once the sweep is done.
    pub async fn toggle_screen_share(&self) -> Result<Option<MediaSourceHandle>> {
        let acquired = {
            // The slot stays locked across acquisition so two concurrent
            // toggles cannot both acquire a screen source.
            let mut slot = self.inner.screen.write().await;
            match &*slot {
                Some(_) => None,
                None => {
                    let screen = self.inner.capture.acquire_screen().await?;
                    *slot = Some(screen.clone());
                    Some(screen)
                }
            }
        };

        let Some(screen) = acquired else {
            self.stop_screen_share().await?;
            return Ok(None);
        };

        info!("Screen share started ({})", screen.id());
        self.spawn_screen_watcher(&screen).await;

        let mut first_err = None;
        for entry in self.inner.registry.entries().await {
            let result = async {
                entry.attach_source(&screen).await?;
                self.inner.engine.negotiate(&entry, &self.metadata().await).await
            }
            .await;
            if let Err(e) = result {
                warn!("Screen share attach failed for peer {}: {}", entry.peer_id(), e);
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(Some(screen)),
        }
    }

    /// Stop screen sharing if it is active
    ///
    /// Detaches the screen source from every connection, renegotiates each,
    /// and stops the capture. A no-op when not sharing.
    pub async fn stop_screen_share(&self) -> Result<()> {
        let Some(screen) = self.inner.screen.write().await.take() else {
            return Ok(());
        };

        let mut first_err = None;
        for entry in self.inner.registry.entries().await {
            let result = async {
                entry.detach_source(screen.id()).await?;
                self.inner.engine.negotiate(&entry, &self.metadata().await).await
            }
            .await;
            if let Err(e) = result {
                warn!("Screen share detach failed for peer {}: {}", entry.peer_id(), e);
                first_err.get_or_insert(e);
            }
        }

        screen.stop();
        info!("Screen share stopped");

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Handle a server push that the remote side changed its media
    ///
    /// Renegotiates the hub connection; ignored when the session has no hub
    /// connection. A failure here never tears the session down.
    pub async fn on_remote_renegotiation_signal(&self) -> Result<()> {
        let Some(entry) = self.inner.registry.get(HUB_PEER_ID).await else {
            debug!("Renegotiation signal ignored: no hub connection");
            return Ok(());
        };
        self.inner.engine.negotiate(&entry, &self.metadata().await).await
    }

    /// Drive the session from a server notification stream
    ///
    /// Spawns a task consuming the stream until it ends; the task is torn
    /// down on [`leave`](Self::leave).
    pub async fn attach_notifications(&self, mut stream: NotificationStream) {
        let controller = self.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match event {
                    ServerEvent::RenegotiateNeeded => {
                        if let Err(e) = controller.on_remote_renegotiation_signal().await {
                            warn!("Push-triggered renegotiation failed: {}", e);
                        }
                    }
                    ServerEvent::Unknown => {}
                }
            }
            debug!("Notification stream ended");
        });
        let mut tasks = self.inner.tasks.lock().await;
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    /// Leave the session
    ///
    /// Closes every connection, stops local capture and returns to `Idle`.
    /// Idempotent.
    pub async fn leave(&self) {
        if let Some(watcher) = self.inner.screen_watcher.lock().await.take() {
            watcher.abort();
        }
        for task in self.inner.tasks.lock().await.drain(..) {
            task.abort();
        }

        self.inner.registry.close_all().await;

        if let Some(camera) = self.inner.camera.write().await.take() {
            camera.stop();
        }
        if let Some(screen) = self.inner.screen.write().await.take() {
            screen.stop();
        }

        self.set_status(SessionStatus::Idle).await;
        info!("Left session");
    }

    /// Get the current session status
    pub async fn status(&self) -> SessionStatus {
        self.inner.status.read().await.clone()
    }

    /// Whether a screen source is currently active
    pub async fn is_screen_sharing(&self) -> bool {
        self.inner.screen.read().await.is_some()
    }

    /// Access the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    async fn dial(&self, peer_id: &str) -> Result<()> {
        let sources = self.active_sources().await;
        let entry = self.inner.registry.get_or_create(peer_id, &sources).await?;
        self.inner.engine.negotiate(&entry, &self.metadata().await).await
    }

    async fn active_sources(&self) -> Vec<MediaSourceHandle> {
        let mut sources = Vec::new();
        if let Some(camera) = self.inner.camera.read().await.as_ref() {
            if camera.is_live() {
                sources.push(camera.clone());
            }
        }
        if let Some(screen) = self.inner.screen.read().await.as_ref() {
            if screen.is_live() {
                sources.push(screen.clone());
            }
        }
        sources
    }

    async fn metadata(&self) -> RequestMetadata {
        RequestMetadata::for_room(self.inner.room.read().await.clone())
    }

    async fn spawn_screen_watcher(&self, screen: &MediaSourceHandle) {
        let controller = self.clone();
        let screen = screen.clone();
        let task = tokio::spawn(async move {
            screen.ended().await;
            if let Err(e) = controller.stop_screen_share().await {
                warn!("Automatic screen share stop failed: {}", e);
            }
        });
        // One watcher at a time; the previous one has already finished with
        // its own (stopped) screen source.
        if let Some(previous) = self.inner.screen_watcher.lock().await.replace(task) {
            previous.abort();
        }
    }

    async fn set_status(&self, next: SessionStatus) {
        let mut status = self.inner.status.write().await;
        if *status != next {
            debug!("Session status: {:?} -> {:?}", *status, next);
            *status = next.clone();
            let _ = self.inner.events.send(SessionEvent::StatusChanged(next));
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("signaling_url", &self.inner.config.signaling_url)
            .finish()
    }
}
