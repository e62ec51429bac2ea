//! External capability clients for the Sketchcast pipeline.
//!
//! This crate provides:
//! - Capability traits: `ScriptWriter`, `Narrator`, `Illustrator`
//! - OpenAI (script text, images), ElevenLabs (speech, voices) and Ideogram (images) clients
//! - Whiteboard illustration prompts and the per-job label plan

pub mod config;
pub mod elevenlabs;
pub mod error;
pub mod ideogram;
pub mod openai;
pub mod prompts;
pub mod traits;

pub use config::{IllustrationProvider, ProvidersConfig};
pub use elevenlabs::{ElevenLabsClient, ElevenLabsConfig};
pub use error::{ProviderError, ProviderResult};
pub use ideogram::{IdeogramClient, IdeogramConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use prompts::{involves_people, sketch_prompt, LabelPlan};
pub use traits::{default_voices, IllustrationRequest, Illustrator, Narrator, ScriptWriter, Voice};
