use super::error::{ProviderError, Result};
use super::prompts;
use crate::config::settings::OpenAiConfig;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const STORY_MAX_TOKENS: u32 = 1000;
const IMAGE_SIZE: &str = "1024x1024";
// Upper bound the speech endpoint accepts for `input`.
const TTS_MAX_CHARS: usize = 4096;

/// One panel as scripted by the model, before any art exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelScript {
    pub image_description: String,
    #[serde(default)]
    pub panel_text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'static str,
    n: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'static str>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PanelBreakdown {
    Wrapped { panels: Vec<PanelScript> },
    Bare(Vec<PanelScript>),
}

#[derive(Clone)]
pub struct OpenAiService {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiService {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        info!("✅ OpenAI client ready ({})", config.base_url);
        Ok(Self { client, config })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.config.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAI {} returned {}", path, status);
            return Err(ProviderError::from_status(status, body));
        }

        Ok(response)
    }

    async fn chat(&self, request: ChatRequest<'_>) -> Result<String> {
        let response: ChatResponse = self
            .post("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("chat completion had no content".into()))
    }

    pub async fn generate_story(
        &self,
        prompt: &str,
        style: &str,
        character_names: &[String],
        num_panels: u32,
    ) -> Result<String> {
        let system = prompts::story_system_prompt(style, character_names, num_panels);

        self.chat(ChatRequest {
            model: &self.config.story_model,
            messages: vec![
                ChatMessage { role: "system", content: &system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: Some(STORY_MAX_TOKENS),
            response_format: None,
        })
        .await
    }

    pub async fn break_story_into_panels(&self, story: &str, num_panels: u32) -> Result<Vec<PanelScript>> {
        let system = prompts::panel_breakdown_prompt(num_panels);

        let content = self
            .chat(ChatRequest {
                model: &self.config.story_model,
                messages: vec![
                    ChatMessage { role: "system", content: &system },
                    ChatMessage { role: "user", content: story },
                ],
                max_tokens: None,
                response_format: Some(ResponseFormat { kind: "json_object" }),
            })
            .await?;

        parse_panels(&content, num_panels as usize)
    }

    pub async fn generate_panel_image(&self, description: &str) -> Result<Bytes> {
        let prompt = prompts::panel_image_prompt(description);
        let model = self.config.image_model.as_str();

        let request = ImageRequest {
            model,
            prompt: &prompt,
            size: IMAGE_SIZE,
            n: 1,
            // gpt-image models always answer with base64 and reject the field.
            response_format: model.starts_with("dall-e").then_some("b64_json"),
        };

        let response: ImageResponse = self
            .post("images/generations", &request)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let datum = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("image response had no data".into()))?;

        match (datum.b64_json, datum.url) {
            (Some(b64), _) => STANDARD
                .decode(b64.as_bytes())
                .map(Bytes::from)
                .map_err(|e| ProviderError::InvalidResponse(format!("bad base64 image: {}", e))),
            (None, Some(url)) => self.download(&url).await,
            (None, None) => Err(ProviderError::InvalidResponse(
                "image response carried neither b64_json nor url".into(),
            )),
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }
        Ok(response.bytes().await?)
    }

    pub async fn generate_voiceover(&self, text: &str) -> Result<Bytes> {
        let input = truncate_chars(text, TTS_MAX_CHARS);

        let request = SpeechRequest {
            model: &self.config.tts_model,
            voice: &self.config.tts_voice,
            input,
            response_format: "mp3",
        };

        let audio = self.post("audio/speech", &request).await?.bytes().await?;
        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse("speech response was empty".into()));
        }
        Ok(audio)
    }
}

/// Parses the breakdown reply, tolerating a markdown code fence around the JSON.
pub fn parse_panels(content: &str, num_panels: usize) -> Result<Vec<PanelScript>> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let breakdown: PanelBreakdown = serde_json::from_str(json)
        .map_err(|e| ProviderError::InvalidResponse(format!("panel breakdown is not valid JSON: {}", e)))?;

    let mut panels = match breakdown {
        PanelBreakdown::Wrapped { panels } => panels,
        PanelBreakdown::Bare(panels) => panels,
    };

    if panels.is_empty() {
        return Err(ProviderError::InvalidResponse("story breakdown returned no panels".into()));
    }

    panels.truncate(num_panels);
    Ok(panels)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
