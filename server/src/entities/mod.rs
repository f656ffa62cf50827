//! Server-side entity definitions.

pub mod creep;
pub mod player;
