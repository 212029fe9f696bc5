//! Signaling transport: offer/answer exchange and server-push notifications

pub mod events;
pub mod http;
pub mod protocol;

pub use events::NotificationStream;
pub use http::{HttpSignaling, SignalingExchange};
pub use protocol::{NegotiationRequest, NegotiationResponse, RequestMetadata, ServerEvent};
