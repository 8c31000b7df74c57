//! Configuration types for the snaptex service.
//!
//! Every knob lives in [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. The binary fills the builder from CLI flags and
//! environment variables; library users and tests set only what they need and
//! rely on the defaults for the rest.

use crate::error::SnapTexError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Origins of the browser front-ends allowed to call the API by default.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

/// Configuration for the snaptex service.
///
/// # Example
/// ```rust
/// use snaptex::{ExtractorKind, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .port(8080)
///     .extractor(ExtractorKind::Remote)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 8080);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Interface the HTTP server binds to. Default: `0.0.0.0`.
    pub host: String,

    /// HTTP listen port. Default: 8000.
    pub port: u16,

    /// Which extraction strategy handles `/convert-image`. Default: local tesseract.
    pub extractor: ExtractorKind,

    /// What the normalization stage asks the model for. Default: LaTeX.
    pub output_style: OutputStyle,

    /// Hosted model used for normalization (and for remote OCR unless
    /// `ocr_model` overrides the model name).
    pub llm: LlmSettings,

    /// Model used by the remote extraction strategy. If None, uses `llm.model`.
    pub ocr_model: Option<String>,

    /// Sampling temperature for both model calls. Default: 0.1.
    ///
    /// Transcription and clean-up should be faithful, not creative.
    pub temperature: f32,

    /// Maximum tokens a model reply may contain. Default: 4096.
    pub max_tokens: usize,

    /// Path or name of the tesseract binary. Default: `tesseract`.
    pub tesseract_path: PathBuf,

    /// Tesseract language pack(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub tesseract_lang: String,

    /// LaTeX compiler invocation.
    pub compiler: CompilerSettings,

    /// Upper bound on a single upload in bytes. Default: 10 MiB.
    pub max_upload_bytes: usize,

    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            extractor: ExtractorKind::default(),
            output_style: OutputStyle::default(),
            llm: LlmSettings::default(),
            ocr_model: None,
            temperature: 0.1,
            max_tokens: 4096,
            tesseract_path: PathBuf::from("tesseract"),
            tesseract_lang: "eng".to_string(),
            compiler: CompilerSettings::default(),
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the remote extraction model.
    pub fn ocr_llm(&self) -> LlmSettings {
        let mut settings = self.llm.clone();
        if let Some(ref model) = self.ocr_model {
            settings.model = model.clone();
        }
        settings
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn extractor(mut self, kind: ExtractorKind) -> Self {
        self.config.extractor = kind;
        self
    }

    pub fn output_style(mut self, style: OutputStyle) -> Self {
        self.config.output_style = style;
        self
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.config.llm.provider = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = model.into();
        self
    }

    /// Read the provider credential from this variable instead of the
    /// provider's conventional one.
    pub fn api_key_var(mut self, var: impl Into<String>) -> Self {
        self.config.llm.api_key_var = Some(var.into());
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn tesseract_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_lang = lang.into();
        self
    }

    pub fn compiler_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.compiler.program = program.into();
        self
    }

    /// Arguments passed to the compiler ahead of the standard flags.
    pub fn compiler_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.compiler.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compiler.probe_timeout_secs = secs;
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compiler.compile_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.cors_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, SnapTexError> {
        let c = &self.config;
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(SnapTexError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.max_tokens == 0 {
            return Err(SnapTexError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(SnapTexError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.compiler.probe_timeout_secs == 0 || c.compiler.compile_timeout_secs == 0 {
            return Err(SnapTexError::InvalidConfig(
                "Compiler timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.compiler.program.as_os_str().is_empty() || c.tesseract_path.as_os_str().is_empty() {
            return Err(SnapTexError::InvalidConfig(
                "Compiler and tesseract paths must not be empty".into(),
            ));
        }
        if c.llm.provider.trim().is_empty() || c.llm.model.trim().is_empty() {
            return Err(SnapTexError::InvalidConfig(
                "LLM provider and model must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Nested settings ──────────────────────────────────────────────────────

/// Hosted model selection plus the environment variable holding its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider name understood by `edgequake_llm::ProviderFactory`.
    pub provider: String,
    /// Model identifier, e.g. `gpt-4.1-nano`.
    pub model: String,
    /// Overrides the provider's conventional credential variable.
    pub api_key_var: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4.1-nano".to_string(),
            api_key_var: None,
        }
    }
}

impl LlmSettings {
    /// Environment variable that must hold the credential, or `None` for
    /// local providers that need no key.
    pub fn credential_var(&self) -> Option<String> {
        if let Some(ref var) = self.api_key_var {
            return Some(var.clone());
        }
        let var = match self.provider.to_ascii_lowercase().as_str() {
            "ollama" | "lmstudio" | "lm-studio" => return None,
            "openai" => "OPENAI_API_KEY",
            "anthropic" => "ANTHROPIC_API_KEY",
            "gemini" | "google" => "GEMINI_API_KEY",
            "mistral" => "MISTRAL_API_KEY",
            "openrouter" => "OPENROUTER_API_KEY",
            "xai" => "XAI_API_KEY",
            other => return Some(format!("{}_API_KEY", other.to_ascii_uppercase())),
        };
        Some(var.to_string())
    }
}

/// How the external LaTeX compiler is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Path or name of the compiler binary. Default: `pdflatex` on `PATH`.
    pub program: PathBuf,
    /// Extra arguments placed before the standard flags (e.g. `-shell-escape`).
    pub extra_args: Vec<String>,
    /// Timeout for the `--version` availability probe. Default: 10.
    pub probe_timeout_secs: u64,
    /// Timeout for a full compile. Default: 120.
    pub compile_timeout_secs: u64,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdflatex"),
            extra_args: Vec::new(),
            probe_timeout_secs: 10,
            compile_timeout_secs: 120,
        }
    }
}

impl CompilerSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which extraction strategy turns image bytes into a transcript.
///
/// Only one is active per process. The local engine needs no network and no
/// credential; the remote one reads handwriting and math far better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Decode locally and run the tesseract binary. (default)
    #[default]
    Local,
    /// Send the image to a hosted multimodal model.
    Remote,
}

/// What the normalization stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Complete LaTeX source, ready for `/compile-latex`. (default)
    #[default]
    Latex,
    /// Lightly cleaned prose.
    Prose,
}
