pub mod order;
pub mod watchlist;

pub use order::*;
pub use watchlist::*;
