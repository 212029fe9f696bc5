//! Capture device collaborator interface

use crate::media::MediaSourceHandle;
use crate::Result;
use async_trait::async_trait;

/// Local media capture collaborator
///
/// Device access lives outside this crate; implementations hand back
/// [`MediaSourceHandle`]s whose tracks are ready to attach to peer
/// connections. A capture implementation must call
/// [`MediaSourceHandle::stop`] on a handle whose underlying device ends
/// externally so the session can run its automatic stop path.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Acquire the camera + microphone bundle
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceAcquisition`](crate::Error::DeviceAcquisition)
    /// when no device is available or permission is denied.
    async fn acquire_camera_mic(&self) -> Result<MediaSourceHandle>;

    /// Acquire a screen-share bundle
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceAcquisition`](crate::Error::DeviceAcquisition)
    /// when capture is unavailable or the user declined.
    async fn acquire_screen(&self) -> Result<MediaSourceHandle>;
}
