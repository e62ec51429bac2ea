//! ElevenLabs client: speech synthesis and voice listing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sketchcast_models::VoiceConfig;

use crate::error::{ProviderError, ProviderResult};
use crate::traits::{default_voices, Narrator, Voice};

const PROVIDER: &str = "elevenlabs";

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Configuration for the ElevenLabs client.
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .map_err(|_| ProviderError::config("ELEVENLABS_API_KEY not set"))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("ELEVENLABS_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
    category: Option<String>,
}

/// ElevenLabs API client.
pub struct ElevenLabsClient {
    http: Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ElevenLabsConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_voices(&self) -> ProviderResult<Vec<Voice>> {
        let response = self
            .http
            .get(self.url("v1/voices"))
            .header("xi-api-key", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }

        let listing: VoicesResponse = response.json().await?;
        Ok(listing
            .voices
            .into_iter()
            .map(|v| Voice {
                id: v.voice_id,
                name: v.name,
                category: v.category.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }
}

#[async_trait]
impl Narrator for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<Vec<u8>> {
        debug!(voice_id = %voice.voice_id, "Synthesizing {} chars", text.len());

        let response = self
            .http
            .post(self.url(&format!("v1/text-to-speech/{}", voice.voice_id)))
            .header("xi-api-key", &self.config.api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &voice.model_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }

        let audio = response.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err(ProviderError::invalid_response(PROVIDER, "empty audio body"));
        }
        Ok(audio)
    }

    /// Falls back to the default voice set when the listing call fails.
    async fn list_voices(&self) -> ProviderResult<Vec<Voice>> {
        match self.fetch_voices().await {
            Ok(voices) => Ok(voices),
            Err(e) => {
                warn!("Voice listing failed, using default voices: {}", e);
                Ok(default_voices())
            }
        }
    }
}
