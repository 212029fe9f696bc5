//! Media source and track handles

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

/// Kind of a local capture source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Camera + microphone bundle
    CameraMic,
    /// Screen-share bundle
    Screen,
}

/// One local capture track, ready to be attached to a peer connection
#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    local: Arc<dyn TrackLocal + Send + Sync>,
}

impl MediaTrack {
    /// Wrap an existing local track
    pub fn new(kind: TrackKind, local: Arc<dyn TrackLocal + Send + Sync>) -> Self {
        Self {
            id: local.id().to_string(),
            kind,
            local,
        }
    }

    /// Create an Opus audio track
    ///
    /// # Arguments
    ///
    /// * `id` - Track identifier (unique within the session)
    /// * `stream_id` - Identifier of the source the track belongs to
    pub fn audio(id: &str, stream_id: &str) -> Self {
        let local = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            id.to_string(),
            stream_id.to_string(),
        ));
        Self::new(TrackKind::Audio, local)
    }

    /// Create a VP8 video track
    ///
    /// # Arguments
    ///
    /// * `id` - Track identifier (unique within the session)
    /// * `stream_id` - Identifier of the source the track belongs to
    pub fn video(id: &str, stream_id: &str) -> Self {
        let local = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            id.to_string(),
            stream_id.to_string(),
        ));
        Self::new(TrackKind::Video, local)
    }

    /// Get the track identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the track kind
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Get the underlying local track
    pub fn local(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        Arc::clone(&self.local)
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

struct SourceInner {
    id: String,
    kind: SourceKind,
    tracks: Vec<MediaTrack>,
    live: AtomicBool,
    ended: Notify,
}

/// Handle to one local capture source (camera bundle or screen bundle)
///
/// Cheap to clone; every clone refers to the same underlying source. The
/// handle is owned by the session controller and referenced by every
/// connection entry it has been attached to.
#[derive(Clone)]
pub struct MediaSourceHandle {
    inner: Arc<SourceInner>,
}

impl MediaSourceHandle {
    /// Create a new live source from its capture tracks
    pub fn new(kind: SourceKind, tracks: Vec<MediaTrack>) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                tracks,
                live: AtomicBool::new(true),
                ended: Notify::new(),
            }),
        }
    }

    /// Get the source identifier
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Get the source kind
    pub fn kind(&self) -> SourceKind {
        self.inner.kind
    }

    /// Get the source's tracks
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.inner.tracks
    }

    /// Whether the source is still capturing
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Stop the source
    ///
    /// Idempotent. Also used by capture collaborators to signal that the
    /// device ended externally (e.g. the user stopped sharing from the
    /// browser/OS chrome); `ended()` waiters are woken either way.
    pub fn stop(&self) {
        if self.inner.live.swap(false, Ordering::AcqRel) {
            debug!("Media source {} stopped", self.inner.id);
            self.inner.ended.notify_waiters();
        }
    }

    /// Wait until the source is no longer live
    pub async fn ended(&self) {
        loop {
            if !self.is_live() {
                return;
            }
            let notified = self.inner.ended.notified();
            // Re-check after registering to avoid missing a stop() that
            // raced with the check above.
            if !self.is_live() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for MediaSourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSourceHandle")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("tracks", &self.inner.tracks.len())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Metadata for a media track received from a remote peer
///
/// Rendering is out of scope; the session surfaces arrival metadata only.
#[derive(Debug, Clone)]
pub struct RemoteTrack {
    /// Track identifier assigned by the remote side
    pub id: String,
    /// Identifier of the remote stream the track belongs to
    pub stream_id: String,
    /// Track kind
    pub kind: TrackKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_source_starts_live() {
        let source = MediaSourceHandle::new(
            SourceKind::CameraMic,
            vec![MediaTrack::audio("a0", "cam"), MediaTrack::video("v0", "cam")],
        );

        assert!(source.is_live());
        assert_eq!(source.tracks().len(), 2);
        assert_eq!(source.tracks()[0].kind(), TrackKind::Audio);
        assert_eq!(source.tracks()[1].kind(), TrackKind::Video);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let source = MediaSourceHandle::new(SourceKind::Screen, vec![MediaTrack::video("v0", "scr")]);

        source.stop();
        source.stop();
        assert!(!source.is_live());
    }

    #[tokio::test]
    async fn test_ended_wakes_on_stop() {
        let source = MediaSourceHandle::new(SourceKind::Screen, vec![MediaTrack::video("v0", "scr")]);

        let waiter = source.clone();
        let handle = tokio::spawn(async move { waiter.ended().await });

        tokio::task::yield_now().await;
        source.stop();

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("ended() did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_ended_resolves_immediately_when_already_stopped() {
        let source = MediaSourceHandle::new(SourceKind::Screen, vec![]);
        source.stop();
        source.ended().await;
    }

    #[test]
    fn test_clones_share_identity() {
        let source = MediaSourceHandle::new(SourceKind::CameraMic, vec![]);
        let clone = source.clone();

        assert_eq!(source.id(), clone.id());
        clone.stop();
        assert!(!source.is_live());
    }
}
