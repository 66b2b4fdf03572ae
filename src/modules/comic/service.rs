use super::dto::{ComicProgress, StoryPrompt};
use super::model::ComicJob;
use super::pipeline;
use crate::state::AppState;
use anyhow::{anyhow, Result};
use tracing::info;
use uuid::Uuid;

pub struct ComicService;

impl ComicService {
    /// Registers the job and hands it to a background pipeline task.
    pub async fn start(state: AppState, prompt: StoryPrompt) -> Result<ComicProgress> {
        let job = ComicJob::new(prompt);
        let id = job.id;

        state.storage.create_project_dirs(id).await?;

        let progress = ComicProgress::from(&job);
        state.jobs.insert(job).await;

        info!("📥 Queued comic {}", id);
        tokio::spawn(pipeline::run(state.clone(), id));

        Ok(progress)
    }

    pub async fn status(state: AppState, id: Uuid) -> Result<ComicProgress> {
        let job = state
            .jobs
            .get(id)
            .await
            .ok_or_else(|| anyhow!("Job {} not found", id))?;

        Ok(ComicProgress::from(&job))
    }

    pub async fn list(state: AppState) -> Vec<ComicProgress> {
        state
            .jobs
            .list()
            .await
            .iter()
            .map(ComicProgress::from)
            .collect()
    }
}
