//! Peer connection lifecycle
//!
//! A session keeps at most one [`ConnectionEntry`] per remote peer in a
//! [`ConnectionRegistry`]. Entries wrap a [`NativeConnection`], which is
//! backed by `webrtc`-rs in production ([`RtcConnectionFactory`]) and by
//! doubles in tests.

pub mod entry;
pub mod native;
pub mod registry;
pub mod rtc;

#[cfg(test)]
pub(crate) mod testing;

pub use entry::{ConnectionEntry, EntryState};
pub use native::{ConnectionFactory, NativeConnection, RemoteTrackSink};
pub use registry::ConnectionRegistry;
pub use rtc::RtcConnectionFactory;

pub(crate) use entry::NegotiationAdmission;
