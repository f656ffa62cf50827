pub mod protocol;
pub mod entities;
pub mod authority;
pub mod presentation;
pub mod replica;

pub use protocol::*;
pub use entities::*;
pub use authority::*;
pub use presentation::*;
pub use replica::*;
