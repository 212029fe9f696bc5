//! `webrtc`-rs backed native connection

use crate::config::SessionConfig;
use crate::media::{MediaTrack, RemoteTrack, TrackKind};
use crate::peer::{ConnectionFactory, NativeConnection, RemoteTrackSink};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

struct RtcConnection {
    peer_id: String,
    pc: Arc<RTCPeerConnection>,
    // Track id -> sender, so detach can call remove_track.
    senders: Mutex<HashMap<String, Arc<RTCRtpSender>>>,
}

#[async_trait]
impl NativeConnection for RtcConnection {
    async fn create_offer(&self) -> Result<RTCSessionDescription> {
        self.pc
            .create_offer(None)
            .await
            .map_err(|e| Error::Connection(format!("Failed to create offer: {}", e)))
    }

    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.pc
            .set_local_description(desc)
            .await
            .map_err(|e| Error::Connection(format!("Failed to set local description: {}", e)))
    }

    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| Error::Connection(format!("Failed to set remote description: {}", e)))
    }

    async fn attach_track(&self, track: &MediaTrack) -> Result<()> {
        let sender = self
            .pc
            .add_track(track.local())
            .await
            .map_err(|e| Error::Connection(format!("Failed to add track {}: {}", track.id(), e)))?;
        self.senders
            .lock()
            .await
            .insert(track.id().to_string(), sender);
        Ok(())
    }

    async fn detach_track(&self, track_id: &str) -> Result<()> {
        let Some(sender) = self.senders.lock().await.remove(track_id) else {
            return Ok(());
        };
        self.pc
            .remove_track(&sender)
            .await
            .map_err(|e| Error::Connection(format!("Failed to remove track {}: {}", track_id, e)))
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self.pc.connection_state(),
            RTCPeerConnectionState::Closed | RTCPeerConnectionState::Failed
        )
    }

    async fn close(&self) -> Result<()> {
        self.pc
            .close()
            .await
            .map_err(|e| Error::Connection(format!("Failed to close connection: {}", e)))
    }
}

/// Factory producing [`RTCPeerConnection`]-backed connections
///
/// Each connection is built with the default codecs and interceptors and
/// the ICE servers from the session configuration.
pub struct RtcConnectionFactory {
    config: SessionConfig,
}

impl RtcConnectionFactory {
    /// Create a factory from the session configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    fn ice_servers(&self) -> Vec<RTCIceServer> {
        let mut servers = vec![RTCIceServer {
            urls: self.config.stun_servers.clone(),
            ..Default::default()
        }];
        for turn in &self.config.turn_servers {
            servers.push(RTCIceServer {
                urls: vec![turn.url.clone()],
                username: turn.username.clone(),
                credential: turn.credential.clone(),
                ..Default::default()
            });
        }
        servers
    }
}

#[async_trait]
impl ConnectionFactory for RtcConnectionFactory {
    async fn create(
        &self,
        peer_id: &str,
        remote_sink: RemoteTrackSink,
    ) -> Result<Arc<dyn NativeConnection>> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::Connection(format!("Failed to register codecs: {}", e)))?;

        let registry = Registry::new();
        let registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| Error::Connection(format!("Failed to register interceptors: {}", e)))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: self.ice_servers(),
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| Error::Connection(format!("Failed to create peer connection: {}", e)))?,
        );

        let track_peer = peer_id.to_string();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    _ => TrackKind::Video,
                };
                remote_sink(
                    track_peer.clone(),
                    RemoteTrack {
                        id: track.id(),
                        stream_id: track.stream_id(),
                        kind,
                    },
                );
                Box::pin(async {})
            },
        ));

        let state_peer = peer_id.to_string();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            debug!("Peer {} connection state: {}", state_peer, state);
            Box::pin(async {})
        }));

        Ok(Arc::new(RtcConnection {
            peer_id: peer_id.to_string(),
            pc,
            senders: Mutex::new(HashMap::new()),
        }))
    }
}

impl std::fmt::Debug for RtcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtcConnection")
            .field("peer_id", &self.peer_id)
            .field("state", &self.pc.connection_state())
            .finish()
    }
}
