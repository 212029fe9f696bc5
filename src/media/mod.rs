//! Local and remote media source handles
//!
//! Capture devices themselves are external collaborators; this module only
//! owns the handles they yield and the liveness signal that drives automatic
//! screen-share stop.

pub mod capture;
pub mod source;

pub use capture::MediaCapture;
pub use source::{MediaSourceHandle, MediaTrack, RemoteTrack, SourceKind, TrackKind};
