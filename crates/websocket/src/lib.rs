mod handler;
mod messages;

pub use handler::{observe, JOIN_NOTICE};
pub use messages::{encode, ClientMessage};
