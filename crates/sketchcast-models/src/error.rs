//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Invalid frame size {width}x{height}: {reason}")]
    InvalidFrameSize {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("Invalid render settings: {0}")]
    InvalidRenderSettings(String),

    #[error("Unknown value '{value}' for {field}")]
    UnknownVariant { field: &'static str, value: String },
}

impl ModelError {
    pub fn invalid_render_settings(msg: impl Into<String>) -> Self {
        Self::InvalidRenderSettings(msg.into())
    }

    pub fn unknown_variant(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            field,
            value: value.into(),
        }
    }
}
