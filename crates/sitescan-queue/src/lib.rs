//! In-process scan job queue with retry, backoff, and progress reporting.
//!
//! The queue is an explicitly constructed, injectable service: callers
//! build a [`JobQueue`], register a [`JobHandler`] via [`JobQueue::start`],
//! and drain it with [`JobQueue::shutdown`]. Job ids are the scan ids they
//! wrap, which gives at-most-one live job per scan id. Retries follow an
//! explicit [`RetryPolicy`] rather than any broker-specific mechanism, so
//! the same policy could host on an external message queue later.

pub mod job;
pub mod queue;


pub use job::{JobState, JobStatus, RetryPolicy};
pub use queue::{JobHandler, JobQueue, ProgressHandle};
