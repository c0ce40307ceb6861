mod health;
mod sessions;
mod ws;

pub use health::*;
pub use sessions::*;
pub use ws::*;
