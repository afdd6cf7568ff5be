//! Scan orchestration.
//!
//! [`ScanPipeline`] drives one scan end to end: status transitions, the
//! concurrent audit fan-out with fixed degraded fallbacks, persistence of
//! metrics and issues, AI fix recommendations for entitled owners, and
//! alert evaluation. [`ScanJobHandler`] plugs the pipeline into the job
//! queue; [`StatusReconciler`] merges persisted scan status with live
//! queue state for polling clients.

pub mod handler;
pub mod pipeline;
pub mod priority;
pub mod status;

#[cfg(test)]
mod tests;

pub use handler::ScanJobHandler;
pub use pipeline::ScanPipeline;
pub use status::StatusReconciler;
