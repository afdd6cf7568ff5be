use crate::job::{JobState, JobStatus, RetryPolicy};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Work callback invoked once per delivery attempt.
///
/// Returning an error hands control back to the queue's retry schedule;
/// the handler itself must not retry and must tolerate being re-invoked
/// from scratch for the same scan id.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, scan_id: &str, progress: ProgressHandle) -> Result<()>;
}

#[derive(Debug)]
struct JobEntry {
    state: JobState,
    progress: u8,
    attempts: u32,
    error: Option<String>,
}

type JobTable = Arc<Mutex<HashMap<String, JobEntry>>>;

/// Handle a job handler uses to report 0-100 progress for its own job.
#[derive(Clone)]
pub struct ProgressHandle {
    job_id: String,
    jobs: JobTable,
}

impl ProgressHandle {
    pub fn report(&self, percent: u8) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(entry) = jobs.get_mut(&self.job_id) {
            entry.progress = percent.min(100);
        }
    }
}

/// In-process job queue with a worker pool and dedup by job id.
pub struct JobQueue {
    jobs: JobTable,
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    policy: RetryPolicy,
}

impl JobQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            workers: Mutex::new(Vec::new()),
            policy,
        }
    }

    /// Spawns `worker_count` workers feeding jobs to `handler`.
    ///
    /// Must be called exactly once before the first [`enqueue`](Self::enqueue).
    pub fn start(&self, handler: Arc<dyn JobHandler>, worker_count: usize) {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .expect("JobQueue::start called twice");
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut workers = self.workers.lock().unwrap();
        for worker_id in 0..worker_count.max(1) {
            let rx = rx.clone();
            let jobs = self.jobs.clone();
            let handler = handler.clone();
            let policy = self.policy.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let job_id = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(job_id) = job_id else {
                        tracing::debug!(worker_id, "Queue channel closed, worker exiting");
                        break;
                    };
                    run_job(&job_id, &jobs, handler.as_ref(), &policy).await;
                }
            }));
        }
        tracing::info!(
            workers = worker_count.max(1),
            max_attempts = self.policy.max_attempts,
            "Job queue started"
        );
    }

    /// Enqueues a scan for processing. The job id is the scan id, so a
    /// second enqueue while a job for the same scan is waiting or active
    /// returns the existing id without queuing a duplicate. Once the
    /// previous job has reached a terminal state the id may be enqueued
    /// again.
    pub fn enqueue(&self, scan_id: &str) -> Result<String> {
        // Checked before inserting the entry so a rejected enqueue leaves
        // no phantom waiting job behind
        let tx = self.tx.lock().unwrap();
        let Some(tx) = tx.as_ref() else {
            anyhow::bail!("queue is shut down");
        };

        {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get(scan_id) {
                Some(entry) if !entry.state.is_terminal() => {
                    tracing::debug!(job_id = %scan_id, "Duplicate enqueue ignored");
                    return Ok(scan_id.to_string());
                }
                _ => {
                    jobs.insert(
                        scan_id.to_string(),
                        JobEntry {
                            state: JobState::Waiting,
                            progress: 0,
                            attempts: 0,
                            error: None,
                        },
                    );
                }
            }
        }

        if tx.send(scan_id.to_string()).is_err() {
            self.jobs.lock().unwrap().remove(scan_id);
            anyhow::bail!("queue workers are gone");
        }
        Ok(scan_id.to_string())
    }

    /// Last known status of a job. Unknown ids report `failed` with a
    /// "Job not found" error.
    pub fn status(&self, job_id: &str) -> JobStatus {
        let jobs = self.jobs.lock().unwrap();
        match jobs.get(job_id) {
            Some(entry) => JobStatus {
                state: entry.state,
                progress: entry.progress,
                error: entry.error.clone(),
            },
            None => JobStatus::not_found(),
        }
    }

    /// Closes the queue and waits for in-flight jobs to finish.
    pub async fn shutdown(&self) {
        self.tx.lock().unwrap().take();
        let workers = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Queue worker did not shut down cleanly");
            }
        }
        tracing::info!("Job queue stopped");
    }
}

async fn run_job(job_id: &str, jobs: &JobTable, handler: &dyn JobHandler, policy: &RetryPolicy) {
    set_state(jobs, job_id, JobState::Active, None);

    let progress = ProgressHandle {
        job_id: job_id.to_string(),
        jobs: jobs.clone(),
    };

    for attempt in 1..=policy.max_attempts {
        {
            let mut table = jobs.lock().unwrap();
            if let Some(entry) = table.get_mut(job_id) {
                entry.attempts = attempt;
            }
        }

        match handler.handle(job_id, progress.clone()).await {
            Ok(()) => {
                let mut table = jobs.lock().unwrap();
                if let Some(entry) = table.get_mut(job_id) {
                    entry.state = JobState::Completed;
                    entry.progress = 100;
                    entry.error = None;
                }
                tracing::info!(job_id, attempt, "Job completed");
                return;
            }
            Err(e) => {
                let message = e.to_string();
                {
                    let mut table = jobs.lock().unwrap();
                    if let Some(entry) = table.get_mut(job_id) {
                        entry.error = Some(message.clone());
                    }
                }
                if attempt < policy.max_attempts {
                    let delay = policy.backoff_after(attempt);
                    tracing::warn!(
                        job_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Job attempt failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    tracing::error!(
                        job_id,
                        attempts = attempt,
                        error = %message,
                        "Job failed after exhausting retries"
                    );
                }
            }
        }
    }

    set_state(jobs, job_id, JobState::Failed, None);
}

fn set_state(jobs: &JobTable, job_id: &str, state: JobState, error: Option<String>) {
    let mut table = jobs.lock().unwrap();
    if let Some(entry) = table.get_mut(job_id) {
        entry.state = state;
        if let Some(error) = error {
            entry.error = Some(error);
        }
    }
}
