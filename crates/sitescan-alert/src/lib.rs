//! Alert evaluation for completed scans.
//!
//! After a scan finishes, the [`evaluator::AlertEvaluator`] compares the
//! scan's persisted metrics against the owner's active alert definitions,
//! records a trigger row per crossed threshold, and dispatches
//! notifications through the registered [`NotificationChannel`]
//! implementations. Evaluation failures never affect the scan's own
//! terminal status; that is the caller's contract.

pub mod evaluator;
pub mod notify;

#[cfg(test)]
mod tests;

pub use evaluator::AlertEvaluator;
pub use notify::{AlertNotification, NotificationChannel, WebhookChannel};
