//! Error types for the mesh session client

use thiserror::Error;

/// Mesh session error types
#[derive(Debug, Error)]
pub enum Error {
    /// Camera, microphone, or screen capture unavailable
    #[error("Device acquisition failed: {0}")]
    DeviceAcquisition(String),

    /// Signaling endpoint returned a non-success response or the transport failed
    #[error("Signaling request failed: {0}")]
    Signaling(String),

    /// Signaling exchange did not complete within the configured bound
    #[error("Signaling exchange timed out: {0}")]
    Timeout(String),

    /// Remote session description was malformed
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid peer identifier or other caller mistake
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Native peer connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for mesh session operations
pub type Result<T> = std::result::Result<T, Error>;
