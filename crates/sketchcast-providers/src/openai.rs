//! OpenAI client: script generation (chat completions) and illustrations (images).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::traits::{IllustrationRequest, Illustrator, ScriptWriter};

const PROVIDER: &str = "openai";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SCRIPT_MODEL: &str = "gpt-4o";
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";

/// Configuration for the OpenAI client.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub script_model: String,
    pub image_model: String,
    /// Request timeout; image generation routinely takes a minute
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            script_model: DEFAULT_SCRIPT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout: Duration::from_secs(180),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::config("OPENAI_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("OPENAI_SCRIPT_MODEL") {
            config.script_model = model;
        }
        if let Ok(model) = std::env::var("OPENAI_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(secs) = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

/// Chat completions request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Images request.
#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: String,
    quality: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

fn script_system_prompt(style: &str) -> String {
    format!(
        "You are an expert educator who writes narration for whiteboard explainer videos \
         in a {} style. Do not write an introduction or a conclusion. Write one \
         self-contained sentence per idea, and make every sentence something that can be \
         drawn. Use simple language and never say \"in this video\". When explaining a \
         process, give the steps in order and number them. Return only the script text.",
        style
    )
}

/// OpenAI API client.
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn download(&self, url: &str) -> ProviderResult<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ScriptWriter for OpenAiClient {
    async fn generate_script(&self, topic: &str, style: &str) -> ProviderResult<String> {
        info!(model = %self.config.script_model, "Generating script for topic: {}", topic);

        let request = ChatRequest {
            model: &self.config.script_model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: script_system_prompt(style),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Create a detailed, step-by-step script about: {}", topic),
                },
            ],
            max_tokens: 1000,
            temperature: 0.7,
        };

        let response = self
            .http
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }

        let chat: ChatResponse = response.json().await?;
        let script = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        if script.is_empty() {
            return Err(ProviderError::invalid_response(PROVIDER, "empty script"));
        }

        debug!("Generated script of {} chars", script.len());
        Ok(script)
    }
}

#[async_trait]
impl Illustrator for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn illustrate(&self, request: &IllustrationRequest) -> ProviderResult<Vec<u8>> {
        let body = ImageRequest {
            model: &self.config.image_model,
            prompt: &request.prompt,
            size: request.size.to_dimension_string(),
            quality: request.quality.as_str(),
            n: 1,
        };

        debug!(size = %body.size, quality = body.quality, "Requesting illustration");

        let response = self
            .http
            .post(self.url("images/generations"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }

        let images: ImageResponse = response.json().await?;
        let image = images
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no image data returned"))?;

        match (image.b64_json, image.url) {
            (Some(b64), _) => Ok(base64::engine::general_purpose::STANDARD.decode(b64)?),
            (None, Some(url)) => self.download(&url).await,
            (None, None) => Err(ProviderError::invalid_response(
                PROVIDER,
                "image has neither b64_json nor url",
            )),
        }
    }
}
