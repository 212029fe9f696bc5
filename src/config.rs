//! Configuration types for the mesh session client

use serde::{Deserialize, Serialize};

/// Main configuration for a mesh session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Signaling exchange endpoint (http:// or https://)
    pub signaling_url: String,

    /// Server-push notification endpoint (http:// or https://, SSE)
    pub notifications_url: String,

    /// Bearer credential sent with every signaling exchange (optional)
    pub auth_token: Option<String>,

    /// Target room / location identifier (optional)
    pub room_id: Option<String>,

    /// Local participant identifier (optional, logging only)
    pub user_id: Option<String>,

    /// STUN server URLs (at least one required)
    pub stun_servers: Vec<String>,

    /// TURN server configurations (optional)
    pub turn_servers: Vec<TurnServerConfig>,

    /// Bound on a single signaling exchange, in seconds
    pub exchange_timeout_secs: u64,
}

/// TURN server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnServerConfig {
    /// TURN server URL (turn:// or turns://)
    pub url: String,

    /// Username for TURN authentication
    pub username: String,

    /// Credential for TURN authentication
    pub credential: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: "http://localhost:8099/api/v1/signaling".to_string(),
            notifications_url: "http://localhost:8099/api/v1/notifications".to_string(),
            auth_token: None,
            room_id: None,
            user_id: None,
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: Vec::new(),
            exchange_timeout_secs: 30,
        }
    }
}

impl SessionConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `signaling_url` or `notifications_url` is not an HTTP(S) URL
    /// - `stun_servers` is empty
    /// - `exchange_timeout_secs` is not in range 1-300
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        for (name, url) in [
            ("signaling_url", &self.signaling_url),
            ("notifications_url", &self.notifications_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::InvalidConfig(format!(
                    "{} must start with http:// or https://, got {}",
                    name, url
                )));
            }
        }

        if self.stun_servers.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one STUN server is required".to_string(),
            ));
        }

        if self.exchange_timeout_secs == 0 || self.exchange_timeout_secs > 300 {
            return Err(Error::InvalidConfig(format!(
                "exchange_timeout_secs must be in range 1-300, got {}",
                self.exchange_timeout_secs
            )));
        }

        Ok(())
    }
}
