use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failures talking to the hosted model API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Rejected by content policy: {0}")]
    ContentPolicy(String),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Maps a non-2xx response body onto the matching variant.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::Authentication(body),
            429 => ProviderError::RateLimited(body),
            400 if error_code(&body).is_some_and(|c| CONTENT_POLICY_CODES.contains(&c.as_str())) => {
                ProviderError::ContentPolicy(body)
            }
            code => ProviderError::Upstream { status: code, body },
        }
    }
}

const CONTENT_POLICY_CODES: &[&str] = &["content_policy_violation", "moderation_blocked"];

/// `error.code` from an API error body, if it is JSON.
fn error_code(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.get("code")?.as_str().map(str::to_owned)
}
