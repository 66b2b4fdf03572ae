use super::model::{ComicJob, ComicStatus};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Job {0} not found")]
    NotFound(Uuid),
    #[error("Job {id} cannot move from {from} to {to}")]
    Rejected { id: Uuid, from: ComicStatus, to: ComicStatus },
}

/// In-memory job map shared between handlers and pipeline tasks.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, ComicJob>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: ComicJob) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn get(&self, id: Uuid) -> Option<ComicJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<ComicJob> {
        let mut jobs: Vec<ComicJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Moves a job to `status` and records the step and message.
    pub async fn transition(
        &self,
        id: Uuid,
        status: ComicStatus,
        step: u32,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.update(id, status, |job| {
            job.current_step = step;
            job.message = message.into();
        })
        .await
    }

    /// Applies `f` under the write lock once the transition to `status` is accepted.
    pub async fn update<F>(&self, id: Uuid, status: ComicStatus, f: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&mut ComicJob),
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(TransitionError::NotFound(id))?;

        if !job.status.can_transition_to(status) {
            return Err(TransitionError::Rejected { id, from: job.status, to: status });
        }

        job.status = status;
        f(job);
        job.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    pub async fn fail(&self, id: Uuid, reason: impl Into<String>) -> Result<(), TransitionError> {
        let reason = reason.into();
        self.update(id, ComicStatus::Failed, |job| {
            job.message = format!("Failed to generate comic: {}", reason);
            job.error = Some(reason);
        })
        .await
    }
}
