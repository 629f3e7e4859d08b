mod error;
mod ledger;
mod movement;
mod product;
mod sales_file;
mod stock_movement;
mod transaction;

pub use error::*;
pub use ledger::*;
pub use movement::*;
pub use product::*;
pub use sales_file::*;
pub use stock_movement::*;
pub use transaction::*;
