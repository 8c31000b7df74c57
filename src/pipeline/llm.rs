//! Hosted-model plumbing shared by remote extraction and normalization.
//!
//! Two concerns live here: finding a provider, and making exactly one chat
//! call to it. There is no retry loop: a failed call is
//! reported to the caller, which decides whether the request degrades or
//! fails.
//!
//! ## Credential policy
//!
//! When the provider is resolved from settings, its credential variable is
//! read from the process environment on *every* call. A missing or empty
//! key is a [`SnapTexError::ProviderNotConfigured`], never a silent
//! fallback to the unprocessed input.

use crate::config::LlmSettings;
use crate::error::SnapTexError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Where a stage gets its provider from.
#[derive(Clone)]
pub enum ProviderSource {
    /// Pre-constructed provider, used as-is. Useful in tests or when the
    /// caller wraps the provider in its own middleware.
    Fixed(Arc<dyn LLMProvider>),
    /// Built per call from settings and the environment.
    FromEnv(LlmSettings),
}

impl fmt::Debug for ProviderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSource::Fixed(_) => f.write_str("Fixed(<dyn LLMProvider>)"),
            ProviderSource::FromEnv(s) => f.debug_tuple("FromEnv").field(s).finish(),
        }
    }
}

impl ProviderSource {
    /// Provider name for log lines and error messages.
    pub fn label(&self) -> &str {
        match self {
            ProviderSource::Fixed(_) => "custom",
            ProviderSource::FromEnv(s) => &s.provider,
        }
    }

    /// Produce a ready provider, checking the credential first.
    pub fn resolve(&self) -> Result<Arc<dyn LLMProvider>, SnapTexError> {
        match self {
            ProviderSource::Fixed(provider) => Ok(Arc::clone(provider)),
            ProviderSource::FromEnv(settings) => {
                check_credential(settings)?;
                ProviderFactory::create_llm_provider(&settings.provider, &settings.model).map_err(
                    |e| SnapTexError::ProviderNotConfigured {
                        provider: settings.provider.clone(),
                        hint: format!("{e}"),
                    },
                )
            }
        }
    }
}

/// Fail fast when the provider's key variable is unset or blank.
pub fn check_credential(settings: &LlmSettings) -> Result<(), SnapTexError> {
    let Some(var) = settings.credential_var() else {
        return Ok(());
    };
    match std::env::var(&var) {
        Ok(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(SnapTexError::ProviderNotConfigured {
            provider: settings.provider.clone(),
            hint: format!("{var} environment variable not set"),
        }),
    }
}

/// Sampling options shared by both model calls.
pub fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Send one chat request and return the reply text.
///
/// An empty reply is reported as [`SnapTexError::NoTextContent`] rather than
/// passed on as an empty success.
pub async fn complete(
    provider: &Arc<dyn LLMProvider>,
    label: &str,
    messages: &[ChatMessage],
    options: &CompletionOptions,
) -> Result<String, SnapTexError> {
    let start = Instant::now();
    match provider.chat(messages, Some(options)).await {
        Ok(response) => {
            debug!(
                "{}: {} input tokens, {} output tokens, {:?}",
                label,
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );
            if response.content.trim().is_empty() {
                return Err(SnapTexError::NoTextContent {
                    provider: label.to_string(),
                });
            }
            Ok(response.content)
        }
        Err(e) => {
            warn!("{}: call failed after {:?}: {}", label, start.elapsed(), e);
            Err(SnapTexError::LlmApiError {
                message: e.to_string(),
            })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn settings(var: &str) -> LlmSettings {
        LlmSettings {
            provider: "openai".into(),
            model: "gpt-4.1-nano".into(),
            api_key_var: Some(var.into()),
        }
    }

    #[test]
    fn build_options_passes_values() {
        let opts = build_options(0.1, 4096);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn missing_credential_is_config_error() {
        let err = check_credential(&settings("SNAPTEX_TEST_NEVER_SET_KEY")).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("SNAPTEX_TEST_NEVER_SET_KEY"));
    }

    #[test]
    fn resolve_fails_fast_without_credential() {
        let source = ProviderSource::FromEnv(settings("SNAPTEX_TEST_NEVER_SET_KEY_2"));
        assert_eq!(source.label(), "openai");
        let err = source.resolve().err().expect("must fail without a key");
        assert!(matches!(err, SnapTexError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn keyless_provider_skips_credential_check() {
        let s = LlmSettings {
            provider: "ollama".into(),
            model: "llava".into(),
            api_key_var: None,
        };
        assert!(check_credential(&s).is_ok());
    }

    #[tokio::test]
    async fn fixed_source_is_used_as_is() {
        let scripted = testing::ScriptedProvider::replying("hello");
        let source = ProviderSource::Fixed(scripted.clone());
        assert_eq!(source.label(), "custom");

        let provider = source.resolve().unwrap();
        let reply = complete(&provider, "custom", &[ChatMessage::user("hi")], &build_options(0.1, 16))
            .await
            .unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(scripted.calls().len(), 1);
    }

    #[tokio::test]
    async fn blank_reply_is_no_text_content() {
        let provider: Arc<dyn LLMProvider> = testing::ScriptedProvider::replying("  \n ");
        let err = complete(&provider, "custom", &[ChatMessage::user("hi")], &build_options(0.1, 16))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapTexError::NoTextContent { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn provider_error_becomes_api_error() {
        let provider: Arc<dyn LLMProvider> = testing::ScriptedProvider::failing("rate limited");
        let err = complete(&provider, "custom", &[ChatMessage::user("hi")], &build_options(0.1, 16))
            .await
            .unwrap_err();
        match err {
            SnapTexError::LlmApiError { message } => assert!(message.contains("rate limited"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
