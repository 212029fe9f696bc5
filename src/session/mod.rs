//! Session orchestration

pub mod controller;

pub use controller::{SessionController, SessionEvent, SessionStatus, HUB_PEER_ID};
