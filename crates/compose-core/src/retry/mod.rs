//! Retry execution engine with policy-based configuration
//!
//! Network stages of the self-update pipeline (release feed, asset metadata,
//! downloads) run through a [`RetryExecutor`] so that transient failures get a
//! bounded number of further attempts with backoff between them.
//!
//! # Example
//!
//! ```rust,no_run
//! use compose_core::retry::{RetryExecutor, TracingObserver};
//! use compose_core::types::RetryPolicy;
//!
//! async fn example() {
//!     let executor = RetryExecutor::new(RetryPolicy::default())
//!         .with_observer(TracingObserver::new("release-feed"));
//!
//!     let result = executor
//!         .execute(|| async { Ok::<_, std::io::Error>("releases") })
//!         .await;
//!     assert!(result.is_ok());
//! }
//! ```

mod error;
mod executor;
mod observer;
mod strategies;

pub use error::RetryError;
pub use executor::RetryExecutor;
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use strategies::{calculate_delay, AlwaysRetry, ClosurePredicate, NeverRetry, RetryPredicate};

#[cfg(test)]
mod tests;
