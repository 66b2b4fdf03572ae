use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use crate::config::env::{self, EnvKey};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub app_name: String,
    pub storage_dir: PathBuf,
    /// TrueType font for page text; system fonts are tried when unset.
    pub font_path: Option<PathBuf>,
    pub openai: OpenAiConfig,
    pub mirror: Option<MirrorConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub story_model: String,
    pub image_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// S3-compatible bucket that receives a copy of every artifact.
#[derive(Clone, Debug, Deserialize)]
pub struct MirrorConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            app_name: env::get_or(EnvKey::AppName, "AI Comic Creator"),
            storage_dir: PathBuf::from(env::get_or(EnvKey::StorageDir, "./storage")),
            font_path: env::get_opt(EnvKey::ComicFontPath).map(PathBuf::from),
            openai: OpenAiConfig {
                api_key: env::get(EnvKey::OpenAiApiKey)?,
                base_url: env::get_or(EnvKey::OpenAiBaseUrl, "https://api.openai.com/v1")
                    .trim_end_matches('/')
                    .to_string(),
                story_model: env::get_or(EnvKey::StoryModel, "gpt-4o"),
                image_model: env::get_or(EnvKey::ImageModel, "gpt-image-1"),
                tts_model: env::get_or(EnvKey::TtsModel, "tts-1"),
                tts_voice: env::get_or(EnvKey::TtsVoice, "alloy"),
                timeout_secs: env::get_parsed(EnvKey::HttpTimeoutSecs, 120),
            },
            mirror: Self::mirror_from_env(),
        })
    }

    // The mirror is enabled only when all four variables are present.
    fn mirror_from_env() -> Option<MirrorConfig> {
        Some(MirrorConfig {
            endpoint: env::get_opt(EnvKey::MinioUrl)?,
            bucket: env::get_opt(EnvKey::MinioBucket)?,
            access_key: env::get_opt(EnvKey::MinioAccessKey)?,
            secret_key: env::get_opt(EnvKey::MinioSecretKey)?,
        })
    }
}

#[cfg(test)]
impl AppConfig {
    /// Config pointing the model API at `base_url` and storage at `storage_dir`.
    pub fn for_tests(base_url: &str, storage_dir: PathBuf) -> Self {
        Self {
            server_port: 0,
            app_name: "comic-backend-test".to_string(),
            storage_dir,
            font_path: None,
            openai: OpenAiConfig {
                api_key: "test-key".to_string(),
                base_url: base_url.trim_end_matches('/').to_string(),
                story_model: "gpt-4o".to_string(),
                image_model: "gpt-image-1".to_string(),
                tts_model: "tts-1".to_string(),
                tts_voice: "alloy".to_string(),
                timeout_secs: 5,
            },
            mirror: None,
        }
    }
}
