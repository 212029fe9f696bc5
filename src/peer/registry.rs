//! Registry of connection entries, keyed by peer identifier

use crate::media::MediaSourceHandle;
use crate::peer::{ConnectionEntry, ConnectionFactory, RemoteTrackSink};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// All live peer connections of one session
///
/// Holds at most one entry per peer. An entry whose native connection went
/// terminal is replaced on the next `get_or_create` for that peer.
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<String, Arc<ConnectionEntry>>>,
    factory: Arc<dyn ConnectionFactory>,
    remote_sink: RemoteTrackSink,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new(factory: Arc<dyn ConnectionFactory>, remote_sink: RemoteTrackSink) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            factory,
            remote_sink,
        }
    }

    /// Get the usable entry for `peer_id`, creating one if needed
    ///
    /// A fresh entry starts with every live source in `active_sources`
    /// already attached, so its first offer reflects current local media.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty or whitespace peer
    /// identifier, or a connection error from the factory.
    pub async fn get_or_create(
        &self,
        peer_id: &str,
        active_sources: &[MediaSourceHandle],
    ) -> Result<Arc<ConnectionEntry>> {
        Self::validate_peer_id(peer_id)?;

        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(peer_id) {
            if existing.is_usable().await {
                return Ok(Arc::clone(existing));
            }
            debug!("Replacing terminal connection for peer {}", peer_id);
            existing.close().await;
            entries.remove(peer_id);
        }

        let native = self
            .factory
            .create(peer_id, Arc::clone(&self.remote_sink))
            .await?;
        let entry = Arc::new(ConnectionEntry::new(peer_id, native));

        for source in active_sources {
            if source.is_live() {
                entry.attach_source(source).await?;
            }
        }

        entries.insert(peer_id.to_string(), Arc::clone(&entry));
        info!("Created connection entry for peer {}", peer_id);
        Ok(entry)
    }

    /// Look up the entry for `peer_id` without creating one
    pub async fn get(&self, peer_id: &str) -> Option<Arc<ConnectionEntry>> {
        self.entries.read().await.get(peer_id).cloned()
    }

    /// Close and remove the entry for `peer_id`
    ///
    /// Closing an absent or already closed peer is a no-op.
    pub async fn close(&self, peer_id: &str) {
        let removed = self.entries.write().await.remove(peer_id);
        match removed {
            Some(entry) => {
                entry.close().await;
                info!("Closed connection for peer {}", peer_id);
            }
            None => debug!("Close ignored for unknown peer {}", peer_id),
        }
    }

    /// Close and remove every entry
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.entries.write().await.drain().collect();
        for (peer_id, entry) in drained {
            entry.close().await;
            debug!("Closed connection for peer {}", peer_id);
        }
    }

    /// Snapshot of every current entry
    pub async fn entries(&self) -> Vec<Arc<ConnectionEntry>> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Number of current entries
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    fn validate_peer_id(peer_id: &str) -> Result<()> {
        if peer_id.is_empty() || peer_id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidArgument(format!(
                "Invalid peer identifier: {:?}",
                peer_id
            )));
        }
        Ok(())
    }
}
