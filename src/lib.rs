//! # snaptex
//!
//! Turn a photo of handwritten or printed notes into cleaned-up text or a
//! LaTeX document, and compile LaTeX into a PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image upload
//!  │
//!  ├─ 1. Ingress    reject anything whose media type is not image/*
//!  ├─ 2. Extract    tesseract subprocess, or a hosted vision model
//!  ├─ 3. Normalize  hosted text model → prose or LaTeX source
//!  ├─ 4. Clean      strip code fences, unescape literal \n
//!  └─ 5. Render     (separate request) pdflatex in a scratch directory
//! ```
//!
//! Extraction failures are fatal. A normalization failure still returns the
//! transcript, with `beautified_text` empty and `error` set.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snaptex::{Pipeline, ServiceConfig};
//! use snaptex::pipeline::ingress::ImagePayload;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Normalization reads OPENAI_API_KEY (or the configured provider's key).
//!     let config = ServiceConfig::default();
//!     let pipeline = Pipeline::from_config(&config);
//!
//!     let bytes = std::fs::read("notes.png")?;
//!     let output = pipeline.convert_image(&ImagePayload::new(bytes, "image/png")?).await?;
//!     println!("{}", output.beautified_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `snaptex` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod users;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{router, serve, AppState};
pub use config::{CompilerSettings, ExtractorKind, LlmSettings, OutputStyle, ServiceConfig, ServiceConfigBuilder};
pub use convert::Pipeline;
pub use error::SnapTexError;
pub use output::{ConversionOutput, ConversionStats, LatexStatus};
pub use users::{InMemoryUserStore, UserStore};
