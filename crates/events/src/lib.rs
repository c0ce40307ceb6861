//! Observer event stream for arena sessions
//!
//! This crate provides the wire format sent to observers and the
//! per-session broadcaster that replays history and fans out live events.

mod broadcaster;
mod types;

pub use broadcaster::{Broadcaster, ObserverId, Subscription, TranscriptSource};
pub use types::*;
