//! Error types for the snaptex library.
//!
//! A single enum, [`SnapTexError`], covers every stage of the pipeline. The
//! variants are grouped by the stage that raises them so the HTTP layer can
//! map each group onto a status class:
//!
//! * **Ingress**: the upload itself is wrong (client error, 400).
//! * **Extraction**: the image could not be read or recognised (500, fatal
//!   for the request since there is nothing to return).
//! * **Provider / config**: the hosted model is unreachable or not set up.
//! * **Normalization**: recoverable, the orchestrator keeps the transcript
//!   and reports the error string alongside it.
//! * **Rendering**: always fatal; compiler output is embedded verbatim.
//!
//! Every variant that wraps an external call carries the underlying tool or
//! provider message so nothing is swallowed into an empty success.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the snaptex library.
#[derive(Debug, Error)]
pub enum SnapTexError {
    // ── Ingress errors ────────────────────────────────────────────────────
    /// Declared media type does not start with `image/`.
    #[error("Provided file is not an image.")]
    NotAnImage { content_type: Option<String> },

    /// The multipart body carried no field with the expected name.
    #[error("No '{field}' field found in the upload")]
    MissingUpload { field: String },

    /// The upload stream broke or exceeded the body limit while reading.
    #[error("Failed to read upload: {0}")]
    UploadRead(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Bytes could not be decoded as any supported image format.
    #[error("Failed to load image: {0}")]
    ImageDecode(String),

    /// The recognition engine (local binary or hosted model) failed.
    #[error("{engine} OCR failed: {detail}")]
    RecognitionFailed { engine: String, detail: String },

    /// The hosted model answered but the reply carried no text block.
    #[error("Provider '{provider}' returned no text content")]
    NoTextContent { provider: String },

    // ── Provider / config errors ──────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error for the single attempt we make.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Normalization errors ──────────────────────────────────────────────
    /// The clean-up call failed; `detail` embeds the provider error.
    #[error("normalization failed: {detail}")]
    NormalizationFailed { detail: String },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The compiler binary is missing or does not answer the probe.
    #[error(
        "LaTeX compiler '{program}' is not available: {detail}\n\
Install a LaTeX distribution (TeX Live, MiKTeX, MacTeX) or set SNAPTEX_PDFLATEX."
    )]
    CompilerUnavailable { program: String, detail: String },

    /// The compiler exited with a non-zero status.
    #[error("LaTeX compilation failed (exit status {}):\n{stdout}\n{stderr}", format_status(.status))]
    CompilationFailed {
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The compiler did not finish within the configured timeout.
    #[error("LaTeX compilation timed out after {secs}s")]
    CompilationTimedOut { secs: u64 },

    /// The compiler reported success but wrote no PDF.
    #[error("LaTeX compiler exited successfully but produced no PDF at '{}'", .path.display())]
    MissingArtifact { path: PathBuf },

    // ── User store errors ─────────────────────────────────────────────────
    /// Registration with an email that is already taken.
    #[error("User with this email already exists")]
    UserExists { email: String },

    /// Unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, malformed or unknown bearer token.
    #[error("Not authenticated")]
    Unauthorized,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Scratch-file or subprocess I/O failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SnapTexError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SnapTexError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors that point at deployment configuration rather than
    /// at the request or at a transient provider failure.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SnapTexError::ProviderNotConfigured { .. }
                | SnapTexError::InvalidConfig(_)
                | SnapTexError::CompilerUnavailable { .. }
        )
    }

    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SnapTexError::NotAnImage { .. }
                | SnapTexError::MissingUpload { .. }
                | SnapTexError::UploadRead(_)
                | SnapTexError::UserExists { .. }
        )
    }
}

fn format_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "killed by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_an_image_display() {
        let e = SnapTexError::NotAnImage {
            content_type: Some("text/plain".into()),
        };
        assert_eq!(e.to_string(), "Provided file is not an image.");
        assert!(e.is_client_error());
    }

    #[test]
    fn normalization_failed_display() {
        let e = SnapTexError::NormalizationFailed {
            detail: "HTTP 503".into(),
        };
        assert_eq!(e.to_string(), "normalization failed: HTTP 503");
    }

    #[test]
    fn compilation_failed_embeds_compiler_output() {
        let e = SnapTexError::CompilationFailed {
            status: Some(1),
            stdout: "! Undefined control sequence.".into(),
            stderr: "fatal".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("exit status 1"), "got: {msg}");
        assert!(msg.contains("! Undefined control sequence."));
        assert!(msg.contains("fatal"));
    }

    #[test]
    fn compilation_failed_without_exit_code() {
        let e = SnapTexError::CompilationFailed {
            status: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(e.to_string().contains("killed by signal"));
    }

    #[test]
    fn missing_artifact_is_distinct_from_failure() {
        let e = SnapTexError::MissingArtifact {
            path: PathBuf::from("/tmp/x/document.pdf"),
        };
        assert!(e.to_string().contains("exited successfully"));
        assert!(e.to_string().contains("document.pdf"));
    }

    #[test]
    fn config_classification() {
        let e = SnapTexError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "Set OPENAI_API_KEY".into(),
        };
        assert!(e.is_config_error());
        assert!(!e.is_client_error());
        assert!(!SnapTexError::InvalidCredentials.is_config_error());
    }
}
