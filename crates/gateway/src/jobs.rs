//! In-memory job queue — the lifecycle of asynchronous turns.
//!
//! Jobs never leave the serving process and are lost on restart; the
//! durable record of a turn lives in the run directory. Terminal states
//! are final: once a job is `done`, `error`, or `canceled`, updates are
//! ignored and a later cancel returns the state unchanged.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use mc_domain::{now_rfc3339, Error, Result};
use mc_store::layout::random_hex8;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Job state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Canceled)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub percent: u8,
    pub message: String,
    pub run_name: String,
    pub turn: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; `None` fields are left unchanged. An absent status
/// can never move a job back to `queued`.
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub percent: Option<i64>,
    pub message: Option<String>,
    pub error: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Job queue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<HashMap<String, Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new job in `queued` at percent 0.
    pub fn create(&self, run_name: &str, turn: u64, message: Option<String>) -> Job {
        let mut jobs = self.jobs.lock();
        let job_id = loop {
            let candidate = format!(
                "job-{}Z-{}",
                Utc::now().format("%Y%m%d_%H%M%S"),
                random_hex8()
            );
            if !jobs.contains_key(&candidate) {
                break candidate;
            }
        };

        let now = now_rfc3339();
        let job = Job {
            job_id: job_id.clone(),
            status: JobStatus::Queued,
            percent: 0,
            message: message.unwrap_or_default(),
            run_name: run_name.to_string(),
            turn,
            error: None,
            created_at: now.clone(),
            updated_at: now,
        };
        jobs.insert(job_id, job.clone());
        tracing::debug!(job_id = %job.job_id, run_name, turn, "job created");
        job
    }

    pub fn get(&self, job_id: &str) -> Result<Job> {
        self.jobs
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))
    }

    /// Atomic partial update. No-op when the job is already terminal:
    /// the current state is returned unchanged.
    pub fn update(&self, job_id: &str, update: JobUpdate) -> Result<Job> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;

        if job.status.is_terminal() {
            return Ok(job.clone());
        }

        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(percent) = update.percent {
            job.percent = percent.clamp(0, 100) as u8;
        }
        if let Some(message) = update.message {
            job.message = message;
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        job.updated_at = now_rfc3339();
        Ok(job.clone())
    }

    /// Move a non-terminal job to `canceled`. A terminal job is
    /// returned unchanged — cancel never undoes completion.
    pub fn cancel(&self, job_id: &str) -> Result<Job> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;

        if job.status.is_terminal() {
            return Ok(job.clone());
        }

        job.status = JobStatus::Canceled;
        job.percent = 100;
        job.message = "canceled".into();
        job.updated_at = now_rfc3339();
        tracing::info!(job_id, "job canceled");
        Ok(job.clone())
    }

    /// The worker's cooperative-cancellation probe.
    pub fn is_canceled(&self, job_id: &str) -> bool {
        self.jobs
            .lock()
            .get(job_id)
            .map(|j| j.status == JobStatus::Canceled)
            .unwrap_or(false)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with_job() -> (JobQueue, String) {
        let queue = JobQueue::new();
        let job = queue.create("20250601_120000Z_chat-deadbeef", 1, None);
        (queue, job.job_id)
    }

    #[test]
    fn create_shape() {
        let (queue, job_id) = queue_with_job();
        let job = queue.get(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.percent, 0);
        assert_eq!(job.turn, 1);
        assert!(job.job_id.starts_with("job-"));
        // job-YYYYMMDD_HHMMSSZ-xxxxxxxx
        let suffix = job.job_id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn unknown_job_is_not_found() {
        let queue = JobQueue::new();
        assert!(queue.get("job-nope").is_err());
        assert!(queue.cancel("job-nope").is_err());
    }

    #[test]
    fn percent_is_clamped() {
        let (queue, job_id) = queue_with_job();
        let job = queue
            .update(&job_id, JobUpdate { percent: Some(250), ..Default::default() })
            .unwrap();
        assert_eq!(job.percent, 100);
        let job = queue
            .update(&job_id, JobUpdate { percent: Some(-5), ..Default::default() })
            .unwrap();
        assert_eq!(job.percent, 0);
    }

    #[test]
    fn updates_after_terminal_are_ignored() {
        let (queue, job_id) = queue_with_job();
        queue
            .update(&job_id, JobUpdate { status: Some(JobStatus::Done), percent: Some(100), ..Default::default() })
            .unwrap();

        let job = queue
            .update(&job_id, JobUpdate { status: Some(JobStatus::Running), percent: Some(10), message: Some("late".into()), ..Default::default() })
            .unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.percent, 100);
        assert_ne!(job.message, "late");
    }

    #[test]
    fn cancel_moves_non_terminal_to_canceled() {
        let (queue, job_id) = queue_with_job();
        let job = queue.cancel(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Canceled);
        assert_eq!(job.percent, 100);
        assert_eq!(job.message, "canceled");
        assert!(queue.is_canceled(&job_id));
    }

    #[test]
    fn cancel_after_terminal_returns_state_unchanged() {
        let (queue, job_id) = queue_with_job();
        queue
            .update(&job_id, JobUpdate { status: Some(JobStatus::Done), message: Some("done".into()), ..Default::default() })
            .unwrap();

        let job = queue.cancel(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.message, "done");
        assert!(!queue.is_canceled(&job_id));
    }

    #[test]
    fn empty_update_only_touches_timestamp() {
        let (queue, job_id) = queue_with_job();
        let before = queue.get(&job_id).unwrap();
        let after = queue.update(&job_id, JobUpdate::default()).unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.percent, before.percent);
    }
}
