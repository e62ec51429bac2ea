//! Explicit provider selection.

use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::elevenlabs::ElevenLabsClient;
use crate::error::{ProviderError, ProviderResult};
use crate::ideogram::IdeogramClient;
use crate::openai::OpenAiClient;
use crate::traits::{Illustrator, Narrator, ScriptWriter};

/// Which service draws the illustrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IllustrationProvider {
    #[default]
    OpenAi,
    Ideogram,
}

impl FromStr for IllustrationProvider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ideogram" => Ok(Self::Ideogram),
            other => Err(ProviderError::config(format!(
                "unknown ILLUSTRATION_PROVIDER '{}', expected openai or ideogram",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvidersConfig {
    pub illustration: IllustrationProvider,
}

impl ProvidersConfig {
    pub fn from_env() -> ProviderResult<Self> {
        let illustration = match std::env::var("ILLUSTRATION_PROVIDER") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => IllustrationProvider::default(),
        };
        Ok(Self { illustration })
    }

    pub fn script_writer(&self) -> ProviderResult<Arc<dyn ScriptWriter>> {
        Ok(Arc::new(OpenAiClient::from_env()?))
    }

    pub fn narrator(&self) -> ProviderResult<Arc<dyn Narrator>> {
        Ok(Arc::new(ElevenLabsClient::from_env()?))
    }

    pub fn illustrator(&self) -> ProviderResult<Arc<dyn Illustrator>> {
        let illustrator: Arc<dyn Illustrator> = match self.illustration {
            IllustrationProvider::OpenAi => Arc::new(OpenAiClient::from_env()?),
            IllustrationProvider::Ideogram => Arc::new(IdeogramClient::from_env()?),
        };
        info!(provider = illustrator.name(), "Illustration provider configured");
        Ok(illustrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!(
            "OpenAI".parse::<IllustrationProvider>().unwrap(),
            IllustrationProvider::OpenAi
        );
        assert_eq!(
            " ideogram ".parse::<IllustrationProvider>().unwrap(),
            IllustrationProvider::Ideogram
        );
        assert!(matches!(
            "dalle".parse::<IllustrationProvider>(),
            Err(ProviderError::Config(_))
        ));
    }
}
