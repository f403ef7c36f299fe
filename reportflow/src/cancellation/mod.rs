//! Structured cancellation for pipeline runs.
//!
//! A single [`CancellationToken`] is threaded through every suspension point
//! of a run: each remote call, each backoff sleep, each task dispatch.

mod token;

pub use token::CancellationToken;
