//! Offer/answer negotiation engine
//!
//! Runs full negotiation cycles against one connection entry: local offer,
//! signaling exchange, remote answer. Triggers that arrive while a cycle is
//! in flight coalesce into at most one follow-up cycle, so description
//! commits on any single connection never interleave.

use crate::peer::{ConnectionEntry, NegotiationAdmission};
use crate::signaling::{NegotiationRequest, RequestMetadata, SignalingExchange};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Drives negotiation cycles over a signaling exchange
pub struct NegotiationEngine {
    signaling: Arc<dyn SignalingExchange>,
    exchange_timeout: Duration,
}

impl NegotiationEngine {
    /// Create an engine bound to a signaling exchange
    pub fn new(signaling: Arc<dyn SignalingExchange>, exchange_timeout: Duration) -> Self {
        Self {
            signaling,
            exchange_timeout,
        }
    }

    /// Trigger negotiation for `entry`
    ///
    /// If a cycle is already in flight the trigger is absorbed into a
    /// single queued follow-up and this call returns immediately; the
    /// in-flight caller runs the follow-up after its own cycle lands.
    /// Triggers against a closed entry are ignored.
    ///
    /// # Errors
    ///
    /// Propagates the failure of the cycle this call ran itself. The entry
    /// is back at `Stable` afterwards, so any later trigger retries with a
    /// fresh cycle.
    pub async fn negotiate(&self, entry: &ConnectionEntry, metadata: &RequestMetadata) -> Result<()> {
        loop {
            match entry.begin_negotiation().await {
                NegotiationAdmission::Deferred => return Ok(()),
                NegotiationAdmission::Closed => {
                    debug!("Ignoring negotiation trigger for closed peer {}", entry.peer_id());
                    return Ok(());
                }
                NegotiationAdmission::Admitted => {}
            }

            match self.run_cycle(entry, metadata).await {
                Ok(()) => {
                    if entry.complete_negotiation().await {
                        debug!("Running queued follow-up cycle for peer {}", entry.peer_id());
                        continue;
                    }
                    return Ok(());
                }
                Err(e) => {
                    entry.abort_negotiation().await;
                    return Err(e);
                }
            }
        }
    }

    async fn run_cycle(&self, entry: &ConnectionEntry, metadata: &RequestMetadata) -> Result<()> {
        let native = entry.native();

        let offer = native.create_offer().await?;
        native.set_local_description(offer.clone()).await?;

        let request = NegotiationRequest::new(&offer, metadata);
        let response = tokio::time::timeout(self.exchange_timeout, self.signaling.exchange(&request))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "Signaling exchange for peer {} timed out after {}s",
                    entry.peer_id(),
                    self.exchange_timeout.as_secs()
                ))
            })??;

        let answer = response.into_description()?;

        // The entry may have been closed while the exchange was in flight;
        // the stale answer must not touch the native connection.
        if entry.is_closed().await {
            debug!("Discarding stale answer for closed peer {}", entry.peer_id());
            return Ok(());
        }

        native.set_remote_description(answer).await?;
        debug!("Negotiation cycle complete for peer {}", entry.peer_id());
        Ok(())
    }
}
