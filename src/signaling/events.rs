//! Server-push notification stream (SSE)

use crate::signaling::ServerEvent;
use crate::{Error, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Stream of server-push events for one session
///
/// Wraps a long-lived SSE response; dropping the stream tears the
/// underlying request down.
pub struct NotificationStream {
    events: mpsc::UnboundedReceiver<ServerEvent>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl NotificationStream {
    /// Connect to the notification endpoint
    ///
    /// # Arguments
    ///
    /// * `url` - Notification endpoint (e.g. `http://host:8099/api/v1/notifications`)
    /// * `room_id` - Optional room scope, percent-encoded into the query
    /// * `auth_token` - Optional bearer credential
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signaling`] when the endpoint is unreachable or
    /// rejects the subscription.
    pub async fn connect(
        url: &str,
        room_id: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<Self> {
        // No overall client timeout: the subscription is long-lived.
        let client = reqwest::Client::new();

        // Subscription auth rides in the query, not a header; values are
        // percent-encoded by the query serializer.
        let mut builder = client.get(url);
        if let Some(room) = room_id {
            builder = builder.query(&[("room_id", room)]);
        }
        if let Some(token) = auth_token {
            builder = builder.query(&[("token", token)]);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Signaling(format!("Notification subscription failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Signaling(format!(
                "Notification subscription failed with status {}: {}",
                status, body
            )));
        }

        debug!("Subscribed to notifications at {}", url);

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        if !drain_events(&mut buffer, &tx) {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Notification stream error: {}", e);
                        return;
                    }
                }
            }
            debug!("Notification stream closed by server");
        });

        Ok(Self {
            events: rx,
            task: Some(task),
        })
    }

    /// Build a stream from a plain channel, bypassing the network layer
    pub fn from_receiver(events: mpsc::UnboundedReceiver<ServerEvent>) -> Self {
        Self { events, task: None }
    }

    /// Wait for the next event; `None` when the stream has ended
    pub async fn next(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Parse complete SSE frames out of `buffer`, forwarding each event
///
/// Returns `false` once the receiver side is gone.
fn drain_events(buffer: &mut String, tx: &mpsc::UnboundedSender<ServerEvent>) -> bool {
    while let Some(end) = buffer.find("\n\n") {
        let frame = buffer[..end].to_string();
        buffer.drain(..end + 2);

        for line in frame.lines() {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            match serde_json::from_str::<ServerEvent>(data.trim()) {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        return false;
                    }
                }
                Err(e) => warn!("Ignoring malformed notification: {}", e),
            }
        }
    }
    true
}
