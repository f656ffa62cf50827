//! UDP transport for the authority.

mod server;

pub use server::Server;
