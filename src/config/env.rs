use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    AppName,
    OpenAiApiKey,
    OpenAiBaseUrl,
    StoryModel,
    ImageModel,
    TtsModel,
    TtsVoice,
    HttpTimeoutSecs,
    StorageDir,
    ComicFontPath,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::AppName => "APP_NAME",
            EnvKey::OpenAiApiKey => "OPENAI_API_KEY",
            EnvKey::OpenAiBaseUrl => "OPENAI_BASE_URL",
            EnvKey::StoryModel => "OPENAI_STORY_MODEL",
            EnvKey::ImageModel => "OPENAI_IMAGE_MODEL",
            EnvKey::TtsModel => "OPENAI_TTS_MODEL",
            EnvKey::TtsVoice => "OPENAI_TTS_VOICE",
            EnvKey::HttpTimeoutSecs => "HTTP_TIMEOUT_SECS",
            EnvKey::StorageDir => "STORAGE_DIR",
            EnvKey::ComicFontPath => "COMIC_FONT_PATH",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

/// Unset and empty variables both read as `None`.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
