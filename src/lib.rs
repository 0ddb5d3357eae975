pub mod adapters;
pub mod app;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod logging;
pub mod notify;
pub mod session;
pub mod watchlist;

pub use error::{AutobuyError, Result};
