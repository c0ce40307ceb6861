//! Domain types shared by the arena engine, its event stream and the HTTP surface.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::CoreError;
