//! Normalization: raw transcript → cleaned prose or LaTeX source.
//!
//! The prompt is assembled by [`crate::prompts::build_normalize_prompt`], sent
//! as a single user message, and the reply goes through
//! [`crate::pipeline::postprocess::clean_reply`].
//!
//! A missing credential surfaces as
//! [`SnapTexError::ProviderNotConfigured`]; any other failure is wrapped as
//! [`SnapTexError::NormalizationFailed`]. The orchestrator decides whether to
//! degrade, this module never falls back to returning its input.

use crate::config::{OutputStyle, ServiceConfig};
use crate::error::SnapTexError;
use crate::pipeline::llm::{build_options, complete, ProviderSource};
use crate::pipeline::postprocess::clean_reply;
use crate::prompts::{build_normalize_prompt, EXAMPLE_LATEX_TEMPLATE, LATEX_INSTRUCTION, PROSE_INSTRUCTION};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, LLMProvider};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns a transcript into its cleaned form.
#[async_trait]
pub trait TextNormalizer: Send + Sync {
    async fn normalize(&self, transcript: &str) -> Result<String, SnapTexError>;
}

/// Normalization through a hosted text-generation model.
#[derive(Debug, Clone)]
pub struct LlmNormalizer {
    source: ProviderSource,
    style: OutputStyle,
    temperature: f32,
    max_tokens: usize,
}

impl LlmNormalizer {
    pub fn new(source: ProviderSource, style: OutputStyle, temperature: f32, max_tokens: usize) -> Self {
        Self {
            source,
            style,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            ProviderSource::FromEnv(config.llm.clone()),
            config.output_style,
            config.temperature,
            config.max_tokens,
        )
    }

    /// Use an already-built provider instead of resolving one per call.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &ServiceConfig) -> Self {
        Self::new(
            ProviderSource::Fixed(provider),
            config.output_style,
            config.temperature,
            config.max_tokens,
        )
    }

    pub fn style(&self) -> OutputStyle {
        self.style
    }

    /// The exact prompt this normalizer sends for `transcript`.
    pub fn prompt_for(&self, transcript: &str) -> String {
        match self.style {
            OutputStyle::Latex => build_normalize_prompt(LATEX_INSTRUCTION, Some(EXAMPLE_LATEX_TEMPLATE), transcript),
            OutputStyle::Prose => build_normalize_prompt(PROSE_INSTRUCTION, None, transcript),
        }
    }
}

#[async_trait]
impl TextNormalizer for LlmNormalizer {
    async fn normalize(&self, transcript: &str) -> Result<String, SnapTexError> {
        let provider = self.source.resolve()?;

        let prompt = self.prompt_for(transcript);
        debug!("Normalization prompt: {} chars ({:?})", prompt.len(), self.style);

        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(self.temperature, self.max_tokens);

        let reply = complete(&provider, self.source.label(), &messages, &options)
            .await
            .map_err(|e| SnapTexError::NormalizationFailed { detail: e.to_string() })?;

        let cleaned = clean_reply(&reply);
        if cleaned.is_empty() {
            return Err(SnapTexError::NormalizationFailed {
                detail: format!("reply from '{}' was empty after cleanup", self.source.label()),
            });
        }
        info!("Normalized {} → {} chars", transcript.len(), cleaned.len());
        Ok(cleaned)
    }
}
