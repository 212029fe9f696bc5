//! Mesh video session client
//!
//! This crate drives the client side of a hub-assisted WebRTC mesh call:
//! peer connection lifecycle, offer/answer negotiation over HTTP signaling,
//! server-push renegotiation and screen-share toggling.
//!
//! # Features
//!
//! - **Mesh of peer connections**: one reusable connection per remote peer
//! - **Coalesced renegotiation**: concurrent triggers collapse into at most
//!   one follow-up cycle per connection
//! - **HTTP signaling**: offer/answer POST exchange with bearer auth
//! - **Server push**: SSE notification stream driving renegotiation
//! - **Screen share**: toggle with automatic stop when capture ends
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  SessionController (join/leave, screen share)        │
//! │  ├─ MediaCapture (camera/screen collaborator)        │
//! │  ├─ ConnectionRegistry (one entry per peer)          │
//! │  │   └─ ConnectionEntry → NativeConnection (webrtc)  │
//! │  ├─ NegotiationEngine (offer → exchange → answer)    │
//! │  │   └─ SignalingExchange (HTTP POST)                │
//! │  └─ NotificationStream (SSE server push)             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use meshcall::{SessionConfig, SessionController};
//!
//! let config = SessionConfig {
//!     signaling_url: "https://host/api/v1/signaling".to_string(),
//!     notifications_url: "https://host/api/v1/notifications".to_string(),
//!     room_id: Some("standup".to_string()),
//!     ..Default::default()
//! };
//!
//! let (session, mut events) = SessionController::with_http(config, capture)?;
//! let camera = session.join(None).await?;
//!
//! // Toggle screen sharing on and later off again.
//! session.toggle_screen_share().await?;
//! session.toggle_screen_share().await?;
//!
//! session.leave().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod peer;
pub mod session;
pub mod signaling;

pub use config::{SessionConfig, TurnServerConfig};
pub use error::{Error, Result};
pub use media::{MediaCapture, MediaSourceHandle, MediaTrack, RemoteTrack, SourceKind, TrackKind};
pub use negotiation::NegotiationEngine;
pub use peer::{
    ConnectionEntry, ConnectionFactory, ConnectionRegistry, EntryState, NativeConnection,
    RemoteTrackSink, RtcConnectionFactory,
};
pub use session::{SessionController, SessionEvent, SessionStatus, HUB_PEER_ID};
pub use signaling::{
    HttpSignaling, NegotiationRequest, NegotiationResponse, NotificationStream, RequestMetadata,
    ServerEvent, SignalingExchange,
};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
