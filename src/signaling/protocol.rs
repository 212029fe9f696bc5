//! Wire types for the offer/answer exchange

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Session-scoped metadata carried with every exchange
///
/// Fields are explicitly enumerated; nothing free-form rides along with a
/// negotiation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Room / location identifier, omitted from the wire when absent
    pub room_id: Option<String>,
}

impl RequestMetadata {
    /// Metadata scoped to the given room
    pub fn for_room(room_id: Option<String>) -> Self {
        Self { room_id }
    }
}

/// Offer sent to the signaling endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationRequest {
    /// Offer description body
    pub sdp: String,
    /// Description type, `"offer"` on the wire
    #[serde(rename = "type")]
    pub kind: RTCSdpType,
    /// Room identifier, omitted when the session has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

impl NegotiationRequest {
    /// Build a request from a committed local description and session metadata
    pub fn new(description: &RTCSessionDescription, metadata: &RequestMetadata) -> Self {
        Self {
            sdp: description.sdp.clone(),
            kind: description.sdp_type,
            room_id: metadata.room_id.clone(),
        }
    }
}

/// Answer returned by the signaling endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationResponse {
    /// Answer description body
    pub sdp: String,
    /// Description type, expected to be `"answer"`
    #[serde(rename = "type")]
    pub kind: RTCSdpType,
}

impl NegotiationResponse {
    /// Convert the response into a remote description
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] when the type is not an answer or the
    /// description body does not parse.
    pub fn into_description(self) -> Result<RTCSessionDescription> {
        match self.kind {
            RTCSdpType::Answer => RTCSessionDescription::answer(self.sdp)
                .map_err(|e| Error::Protocol(format!("Invalid answer description: {}", e))),
            other => Err(Error::Protocol(format!(
                "Unexpected description type: {}",
                other
            ))),
        }
    }
}

/// Event pushed by the server over the notification stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The remote side changed its media; run a renegotiation cycle
    RenegotiateNeeded,
    /// Any event type this client does not understand
    #[serde(other)]
    Unknown,
}
