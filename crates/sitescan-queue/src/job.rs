use serde::Serialize;
use std::time::Duration;

/// Queue-level job state, distinct from the persisted scan status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Snapshot of one job as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub state: JobState,
    /// Last reported progress, 0-100.
    pub progress: u8,
    pub error: Option<String>,
}

impl JobStatus {
    /// Status reported for unknown job ids.
    pub fn not_found() -> Self {
        Self {
            state: JobState::Failed,
            progress: 0,
            error: Some("Job not found".to_string()),
        }
    }
}

/// Explicit retry policy: total attempt budget plus an exponential
/// backoff schedule (delay, 2*delay, 4*delay, ...).
///
/// # Examples
///
/// ```
/// use sitescan_queue::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.backoff_after(1), Duration::from_secs(5));
/// assert_eq!(policy.backoff_after(2), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
        }
    }

    /// Delay before the attempt following `completed_attempts` failures.
    pub fn backoff_after(&self, completed_attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(completed_attempts.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}
