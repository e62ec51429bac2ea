//! Ideogram client for illustrations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sketchcast_models::FrameSize;

use crate::error::{ProviderError, ProviderResult};
use crate::traits::{IllustrationRequest, Illustrator};

const PROVIDER: &str = "ideogram";

pub const DEFAULT_BASE_URL: &str = "https://api.ideogram.ai";

/// Configuration for the Ideogram client.
#[derive(Debug, Clone)]
pub struct IdeogramConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl IdeogramConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "V_2".to_string(),
            timeout: Duration::from_secs(180),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("IDEOGRAM_API_KEY")
            .map_err(|_| ProviderError::config("IDEOGRAM_API_KEY not set"))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("IDEOGRAM_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    image_request: ImageRequest<'a>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    aspect_ratio: &'static str,
    magic_prompt_option: &'static str,
    style_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// Ideogram aspect ratio for an image size.
pub fn aspect_ratio(size: FrameSize) -> &'static str {
    match (size.width, size.height) {
        (w, h) if w * 2 == h * 3 => "ASPECT_3_2",
        (w, h) if w * 3 == h * 2 => "ASPECT_2_3",
        (w, h) if w * 9 == h * 16 => "ASPECT_16_9",
        _ => "ASPECT_1_1",
    }
}

/// Ideogram API client.
pub struct IdeogramClient {
    http: Client,
    config: IdeogramConfig,
}

impl IdeogramClient {
    pub fn new(config: IdeogramConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(IdeogramConfig::from_env()?)
    }
}

#[async_trait]
impl Illustrator for IdeogramClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn illustrate(&self, request: &IllustrationRequest) -> ProviderResult<Vec<u8>> {
        let body = GenerateRequest {
            image_request: ImageRequest {
                prompt: &request.prompt,
                model: &self.config.model,
                aspect_ratio: aspect_ratio(request.size),
                magic_prompt_option: "AUTO",
                style_type: "AUTO",
            },
        };

        debug!(aspect_ratio = body.image_request.aspect_ratio, "Requesting illustration");

        let response = self
            .http
            .post(format!("{}/generate", self.config.base_url.trim_end_matches('/')))
            .header("Api-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }

        let generated: GenerateResponse = response.json().await?;
        let url = generated
            .data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no image URL in response"))?;

        let image = self.http.get(&url).send().await?;
        if !image.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, image).await);
        }
        Ok(image.bytes().await?.to_vec())
    }
}
