#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Voice-report classification with an LLM provider abstraction.
//!
//! A spoken report arrives as a raw transcript; [`classify::classify_transcript`]
//! asks the configured model for a title, description, incident type and
//! priority, then validates the answer. Supports `OpenAI` (and any
//! `OpenAI`-compatible server via `AI_BASE_URL`) and Anthropic Claude.

pub mod classify;
pub mod providers;

use thiserror::Error;

pub use classify::{VoiceReport, classify_transcript};
pub use providers::{LlmProvider, create_provider_from_env};

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },

    /// The transcript or the model's answer was unusable.
    #[error("{message}")]
    Classification {
        /// Description shown to the reporter.
        message: String,
    },
}
