//! Capability traits consumed by the pipeline.
//!
//! Each external collaborator sits behind one of these so the pipeline can be
//! driven by deterministic fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sketchcast_models::{FrameSize, ImageQuality, VoiceConfig};

use crate::error::ProviderResult;

/// Text generation: `(topic, style) -> script`.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn generate_script(&self, topic: &str, style: &str) -> ProviderResult<String>;
}

/// A narration voice offered by the speech provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub category: String,
}

impl Voice {
    fn new(id: &str, name: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
        }
    }
}

/// Voices offered when the provider's listing is unavailable.
pub fn default_voices() -> Vec<Voice> {
    vec![
        Voice::new("pNInz6obpgDQGcFmaJgB", "Adam", "Default"),
        Voice::new("21m00Tcm4TlvDq8ikWAM", "Rachel", "Default"),
        Voice::new("AZnzlk1XvdvUeBnXmlld", "Domi", "Default"),
        Voice::new("EXAVITQu4vr4xnSDxMaL", "Bella", "Default"),
    ]
}

/// Speech synthesis.
///
/// `synthesize` returns encoded audio bytes (MP3). Durations are measured by
/// the caller from the written file, never estimated from the text.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<Vec<u8>>;

    async fn list_voices(&self) -> ProviderResult<Vec<Voice>>;
}

/// One illustration to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct IllustrationRequest {
    pub prompt: String,
    pub size: FrameSize,
    pub quality: ImageQuality,
}

/// Text-to-image: `(prompt, size) -> image bytes`.
#[async_trait]
pub trait Illustrator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn illustrate(&self, request: &IllustrationRequest) -> ProviderResult<Vec<u8>>;
}
