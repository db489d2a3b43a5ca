//! Request handlers.

pub mod health;
pub mod page;
pub mod session;
pub mod videos;

pub use health::*;
pub use page::*;
pub use session::*;
pub use videos::*;
