// Application layer - use cases shared by every client (CLI today).

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
