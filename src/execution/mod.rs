//! Order execution pipeline
//!
//! estimate margin -> guard -> place order, wrapped in a fixed-delay retry
//! loop and driven entry by entry by the batch runner.

mod batch;
mod margin;
mod retry;
mod submitter;

pub use batch::{BatchReport, BatchRunner, OUTCOME_TIME_FORMAT};
pub use margin::{MarginCheck, MarginEstimator, MarginGuard};
pub use retry::{RetryController, RetryPolicy};
pub use submitter::{OrderSubmitter, SubmitOrder};
