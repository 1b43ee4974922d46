//! Domain data: stock records, carts, saved carts, orders and the catalog lookup tables.

mod cart;
mod catalog;
mod order;
mod saved_cart;
mod stock;

pub use cart::*;
pub use catalog::*;
pub use order::*;
pub use saved_cart::*;
pub use stock::*;
