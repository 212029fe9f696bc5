//! Native peer connection seam
//!
//! The negotiation core only ever talks to a peer connection through these
//! traits, so the offer/answer state machine can be exercised against test
//! doubles while production code plugs in the `webrtc`-rs implementation
//! from [`crate::peer::rtc`].

use crate::media::{MediaTrack, RemoteTrack};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Sink receiving remote tracks as they arrive, keyed by peer identifier
pub type RemoteTrackSink = Arc<dyn Fn(String, RemoteTrack) + Send + Sync>;

/// One native peer connection
#[async_trait]
pub trait NativeConnection: Send + Sync {
    /// Produce a local offer reflecting the currently attached tracks
    async fn create_offer(&self) -> Result<RTCSessionDescription>;

    /// Commit a description as the connection's local description
    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()>;

    /// Commit a description as the connection's remote description
    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()>;

    /// Start sending a local track on this connection
    async fn attach_track(&self, track: &MediaTrack) -> Result<()>;

    /// Stop sending a previously attached track
    ///
    /// Detaching a track that was never attached is a no-op.
    async fn detach_track(&self, track_id: &str) -> Result<()>;

    /// Whether the connection reached a terminal state (closed or failed)
    fn is_terminal(&self) -> bool;

    /// Release native resources
    async fn close(&self) -> Result<()>;
}

/// Factory creating native connections for the registry
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Create a native connection for `peer_id`
    ///
    /// The implementation must route tracks received from the remote side
    /// into `remote_sink`.
    async fn create(
        &self,
        peer_id: &str,
        remote_sink: RemoteTrackSink,
    ) -> Result<Arc<dyn NativeConnection>>;
}
