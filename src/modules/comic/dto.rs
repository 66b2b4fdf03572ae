use super::model::{ComicJob, ComicStatus, Panel};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn default_style() -> String {
    "child-friendly fantasy".to_string()
}

fn default_num_panels() -> u32 {
    10
}

const PROMPT_MAX_CHARS: usize = 2000;

fn prompt_length(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::new("blank").with_message("Prompt must not be blank".into()));
    }
    if len > PROMPT_MAX_CHARS {
        return Err(ValidationError::new("length")
            .with_message("Prompt must be between 1 and 2000 characters".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StoryPrompt {
    #[validate(custom(function = "prompt_length"))]
    pub prompt: String,
    #[serde(default = "default_style")]
    #[validate(length(min = 1, max = 100, message = "Style must be between 1 and 100 characters"))]
    pub style: String,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 character names"))]
    pub character_names: Option<Vec<String>>,
    #[serde(default = "default_num_panels")]
    #[validate(range(min = 1, max = 20, message = "Number of panels must be between 1 and 20"))]
    pub num_panels: u32,
}

impl StoryPrompt {
    pub fn character_names(&self) -> &[String] {
        self.character_names.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComicProgress {
    pub id: Uuid,
    pub status: ComicStatus,
    pub current_step: u32,
    pub total_steps: u32,
    pub message: String,
    pub story: Option<String>,
    pub panels: Vec<Panel>,
    pub comic_url: Option<String>,
    pub audio_url: Option<String>,
    pub final_url: Option<String>,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<&ComicJob> for ComicProgress {
    fn from(job: &ComicJob) -> Self {
        Self {
            id: job.id,
            status: job.status,
            current_step: job.current_step,
            total_steps: job.total_steps,
            message: job.message.clone(),
            story: job.story.clone(),
            panels: job.panels.clone(),
            comic_url: job.comic.as_ref().map(|a| a.url.clone()),
            audio_url: job.audio.as_ref().map(|a| a.url.clone()),
            final_url: job.manifest.as_ref().map(|a| a.url.clone()),
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_defaults() {
        let prompt: StoryPrompt = serde_json::from_str(r#"{"prompt":"a dragon who bakes"}"#).unwrap();
        assert_eq!(prompt.style, "child-friendly fantasy");
        assert_eq!(prompt.num_panels, 10);
        assert!(prompt.character_names().is_empty());
        assert!(prompt.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_requests() {
        let blank: StoryPrompt = serde_json::from_str(r#"{"prompt":"   "}"#).unwrap();
        assert!(blank.validate().is_err());

        let too_many: StoryPrompt = serde_json::from_str(r#"{"prompt":"x","num_panels":21}"#).unwrap();
        assert!(too_many.validate().is_err());

        let none: StoryPrompt = serde_json::from_str(r#"{"prompt":"x","num_panels":0}"#).unwrap();
        assert!(none.validate().is_err());
    }

    #[test]
    fn prompt_length_is_measured_after_trimming() {
        let padded = StoryPrompt {
            prompt: format!("  {}\n", "é".repeat(2000)),
            ..serde_json::from_str::<StoryPrompt>(r#"{"prompt":"x"}"#).unwrap()
        };
        assert!(padded.validate().is_ok());

        let long = StoryPrompt {
            prompt: "a".repeat(2001),
            ..padded.clone()
        };
        assert!(long.validate().is_err());
    }
}
