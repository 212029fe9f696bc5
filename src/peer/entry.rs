//! Per-peer connection entry and its negotiation state machine

use crate::media::MediaSourceHandle;
use crate::peer::NativeConnection;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Lifecycle state of a connection entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Created, no negotiation cycle run yet
    New,
    /// A negotiation cycle is in flight
    Negotiating,
    /// At least one cycle completed; eligible for renegotiation
    Stable,
    /// Closed; must never negotiate again
    Closed,
}

/// Outcome of asking an entry to admit a negotiation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NegotiationAdmission {
    /// The caller owns the cycle and must finish it with
    /// `complete_negotiation` or `abort_negotiation`
    Admitted,
    /// A cycle is already in flight; the follow-up flag was set
    Deferred,
    /// The entry is closed; nothing to do
    Closed,
}

struct NegotiationFlags {
    state: EntryState,
    pending: bool,
}

/// One peer's connection, its negotiation flags, and its attached sources
///
/// The negotiation flags move only through [`begin_negotiation`],
/// [`complete_negotiation`], [`abort_negotiation`] and [`close`]; holding
/// the admission through a whole cycle is what serializes description
/// commits per peer.
///
/// [`begin_negotiation`]: ConnectionEntry::begin_negotiation
/// [`complete_negotiation`]: ConnectionEntry::complete_negotiation
/// [`abort_negotiation`]: ConnectionEntry::abort_negotiation
/// [`close`]: ConnectionEntry::close
pub struct ConnectionEntry {
    peer_id: String,
    native: Arc<dyn NativeConnection>,
    negotiation: Mutex<NegotiationFlags>,
    attached: Mutex<HashMap<String, MediaSourceHandle>>,
}

impl ConnectionEntry {
    pub(crate) fn new(peer_id: impl Into<String>, native: Arc<dyn NativeConnection>) -> Self {
        Self {
            peer_id: peer_id.into(),
            native,
            negotiation: Mutex::new(NegotiationFlags {
                state: EntryState::New,
                pending: false,
            }),
            attached: Mutex::new(HashMap::new()),
        }
    }

    /// Get the peer identifier this entry belongs to
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Get the current lifecycle state
    pub async fn state(&self) -> EntryState {
        self.negotiation.lock().await.state
    }

    /// Whether a follow-up negotiation cycle is queued behind the current one
    pub async fn pending_renegotiation(&self) -> bool {
        self.negotiation.lock().await.pending
    }

    /// Whether the entry has been closed
    pub async fn is_closed(&self) -> bool {
        self.state().await == EntryState::Closed
    }

    /// Identifiers of the sources currently attached to this connection
    pub async fn attached_sources(&self) -> Vec<String> {
        self.attached.lock().await.keys().cloned().collect()
    }

    /// Whether the given source is attached to this connection
    pub async fn has_source(&self, source_id: &str) -> bool {
        self.attached.lock().await.contains_key(source_id)
    }

    pub(crate) fn native(&self) -> &Arc<dyn NativeConnection> {
        &self.native
    }

    /// Whether the entry can still carry media
    pub(crate) async fn is_usable(&self) -> bool {
        !self.is_closed().await && !self.native.is_terminal()
    }

    /// Attach every track of `source` to the native connection
    ///
    /// Attaching a source that is already attached is a no-op; tracks must
    /// not be attached to the same connection twice.
    pub(crate) async fn attach_source(&self, source: &MediaSourceHandle) -> Result<()> {
        let mut attached = self.attached.lock().await;
        if attached.contains_key(source.id()) {
            debug!("Source {} already attached to peer {}", source.id(), self.peer_id);
            return Ok(());
        }

        for track in source.tracks() {
            self.native.attach_track(track).await?;
        }
        attached.insert(source.id().to_string(), source.clone());
        debug!(
            "Attached source {} ({} tracks) to peer {}",
            source.id(),
            source.tracks().len(),
            self.peer_id
        );
        Ok(())
    }

    /// Detach a previously attached source from the native connection
    ///
    /// Detaching a source that is not attached is a no-op.
    pub(crate) async fn detach_source(&self, source_id: &str) -> Result<()> {
        let mut attached = self.attached.lock().await;
        let Some(source) = attached.remove(source_id) else {
            debug!("Source {} not attached to peer {}", source_id, self.peer_id);
            return Ok(());
        };

        for track in source.tracks() {
            self.native.detach_track(track.id()).await?;
        }
        debug!("Detached source {} from peer {}", source_id, self.peer_id);
        Ok(())
    }

    /// Ask to start a negotiation cycle
    ///
    /// If a cycle is already in flight the follow-up flag is set instead
    /// and the caller must not run a cycle; exactly one follow-up runs no
    /// matter how many triggers arrived while busy.
    pub(crate) async fn begin_negotiation(&self) -> NegotiationAdmission {
        let mut flags = self.negotiation.lock().await;
        match flags.state {
            EntryState::Closed => NegotiationAdmission::Closed,
            EntryState::Negotiating => {
                if !flags.pending {
                    debug!("Negotiation busy for peer {}, queueing follow-up", self.peer_id);
                    flags.pending = true;
                }
                NegotiationAdmission::Deferred
            }
            EntryState::New | EntryState::Stable => {
                self.transition(&mut flags, EntryState::Negotiating);
                flags.pending = false;
                NegotiationAdmission::Admitted
            }
        }
    }

    /// Record a successfully applied negotiation cycle
    ///
    /// Returns `true` when a follow-up cycle was queued while this one was
    /// in flight and the caller should immediately run another. If the
    /// entry was closed mid-cycle the stale result is dropped silently.
    pub(crate) async fn complete_negotiation(&self) -> bool {
        let mut flags = self.negotiation.lock().await;
        if flags.state == EntryState::Closed {
            debug!("Dropping stale negotiation result for closed peer {}", self.peer_id);
            return false;
        }

        self.transition(&mut flags, EntryState::Stable);
        std::mem::take(&mut flags.pending)
    }

    /// Record a failed or aborted negotiation cycle
    ///
    /// The entry returns to `Stable` so later triggers can retry; any
    /// queued follow-up is cleared along with the failed cycle.
    pub(crate) async fn abort_negotiation(&self) {
        let mut flags = self.negotiation.lock().await;
        if flags.state == EntryState::Closed {
            return;
        }

        self.transition(&mut flags, EntryState::Stable);
        flags.pending = false;
    }

    /// Close the entry and release the native connection
    ///
    /// Idempotent; a closed entry never negotiates again.
    pub(crate) async fn close(&self) {
        {
            let mut flags = self.negotiation.lock().await;
            if flags.state == EntryState::Closed {
                return;
            }
            self.transition(&mut flags, EntryState::Closed);
            flags.pending = false;
        }

        self.attached.lock().await.clear();
        if let Err(e) = self.native.close().await {
            warn!("Error closing connection for peer {}: {}", self.peer_id, e);
        }
    }

    fn transition(&self, flags: &mut NegotiationFlags, next: EntryState) {
        if flags.state != next {
            debug!("Peer {} state transition: {:?} -> {:?}", self.peer_id, flags.state, next);
            flags.state = next;
        }
    }
}

impl std::fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("peer_id", &self.peer_id)
            .finish()
    }
}
