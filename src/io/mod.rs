mod compute;
mod export;
mod import;

pub use compute::*;
pub use export::*;
pub use import::*;
