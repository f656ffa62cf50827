//! Headless replica participant for the arena.
//!
//! Joins an authority over UDP and mirrors its creep population without
//! ever deciding an outcome itself.

mod error;
mod network;
mod session;

pub use error::ClientError;
pub use network::{ConnectionState, NetworkClient};
pub use session::ClientSession;
