use super::dto::StoryPrompt;
use crate::infrastructure::storage::local::StoredArtifact;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

pub const TOTAL_STEPS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComicStatus {
    Pending,
    GeneratingStory,
    BreakingStory,
    GeneratingImages,
    CreatingComic,
    GeneratingAudio,
    Finalizing,
    Completed,
    Failed,
}

impl ComicStatus {
    fn rank(&self) -> u8 {
        match self {
            ComicStatus::Pending => 0,
            ComicStatus::GeneratingStory => 1,
            ComicStatus::BreakingStory => 2,
            ComicStatus::GeneratingImages => 3,
            ComicStatus::CreatingComic => 4,
            ComicStatus::GeneratingAudio => 5,
            ComicStatus::Finalizing => 6,
            ComicStatus::Completed => 7,
            ComicStatus::Failed => 8,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ComicStatus::Completed | ComicStatus::Failed)
    }

    /// Forward moves only; staying in place is allowed so a running step can
    /// refresh its message. Nothing leaves a terminal status.
    pub fn can_transition_to(&self, next: ComicStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == ComicStatus::Failed || next.rank() >= self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComicStatus::Pending => "pending",
            ComicStatus::GeneratingStory => "generating_story",
            ComicStatus::BreakingStory => "breaking_story",
            ComicStatus::GeneratingImages => "generating_images",
            ComicStatus::CreatingComic => "creating_comic",
            ComicStatus::GeneratingAudio => "generating_audio",
            ComicStatus::Finalizing => "finalizing",
            ComicStatus::Completed => "completed",
            ComicStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ComicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Panel {
    pub panel_number: u32,
    pub image_description: String,
    pub panel_text: String,
    pub image_url: Option<String>,
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ComicJob {
    pub id: Uuid,
    pub prompt: StoryPrompt,
    pub status: ComicStatus,
    pub current_step: u32,
    pub total_steps: u32,
    pub message: String,
    pub story: Option<String>,
    pub panels: Vec<Panel>,
    pub comic: Option<StoredArtifact>,
    pub audio: Option<StoredArtifact>,
    pub manifest: Option<StoredArtifact>,
    pub error: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ComicJob {
    pub fn new(prompt: StoryPrompt) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            prompt,
            status: ComicStatus::Pending,
            current_step: 0,
            total_steps: TOTAL_STEPS,
            message: "Starting comic generation...".to_string(),
            story: None,
            panels: Vec::new(),
            comic: None,
            audio: None,
            manifest: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
