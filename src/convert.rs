//! Request orchestration: extraction → normalization, and rendering.
//!
//! [`Pipeline`] owns one implementation of each stage behind its trait, so
//! the HTTP layer and tests can swap in fakes. Stages run strictly in
//! sequence and each external call is attempted once.
//!
//! ## Failure policy
//!
//! | Stage fails | Result |
//! |-------------|--------|
//! | extraction | `Err`, nothing to return |
//! | normalization | `Ok` with the transcript, empty `beautified_text` and `error` set |
//! | probe / compile | `Err` with the compiler's own output embedded |

use crate::config::{ExtractorKind, ServiceConfig};
use crate::error::SnapTexError;
use crate::output::{ConversionOutput, ConversionStats, LatexStatus};
use crate::pipeline::extract::{TesseractExtractor, TextExtractor, VisionExtractor};
use crate::pipeline::ingress::ImagePayload;
use crate::pipeline::normalize::{LlmNormalizer, TextNormalizer};
use crate::pipeline::render::{LatexCompiler, PdfLatex};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Message returned when OCR ran but found nothing to clean up.
pub const NO_TEXT_MESSAGE: &str = "No text was recognised in the image";

/// The three stages, wired together.
#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    normalizer: Arc<dyn TextNormalizer>,
    compiler: Arc<dyn LatexCompiler>,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        normalizer: Arc<dyn TextNormalizer>,
        compiler: Arc<dyn LatexCompiler>,
    ) -> Self {
        Self {
            extractor,
            normalizer,
            compiler,
        }
    }

    /// Build the production stages described by `config`.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let extractor: Arc<dyn TextExtractor> = match config.extractor {
            ExtractorKind::Local => Arc::new(TesseractExtractor::from_config(config)),
            ExtractorKind::Remote => Arc::new(VisionExtractor::from_settings(config.ocr_llm(), config)),
        };
        Self::new(
            extractor,
            Arc::new(LlmNormalizer::from_config(config)),
            Arc::new(PdfLatex::new(&config.compiler)),
        )
    }

    /// Run OCR on `image`, then clean the transcript up.
    ///
    /// # Errors
    /// Only extraction failures are returned as `Err`. Normalization failures
    /// (including a missing credential) come back inside the output.
    pub async fn convert_image(&self, image: &ImagePayload) -> Result<ConversionOutput, SnapTexError> {
        let start = Instant::now();
        let raw_text = self.extractor.extract(image).await?;
        let extraction_ms = start.elapsed().as_millis() as u64;
        info!(
            "{} extracted {} chars in {}ms",
            self.extractor.name(),
            raw_text.len(),
            extraction_ms
        );

        if raw_text.is_empty() {
            warn!("Extraction produced no text; skipping normalization");
            return Ok(ConversionOutput {
                raw_text,
                beautified_text: String::new(),
                error: Some(NO_TEXT_MESSAGE.to_string()),
                stats: ConversionStats {
                    extraction_ms,
                    normalization_ms: 0,
                },
            });
        }

        let start = Instant::now();
        let normalized = self.normalizer.normalize(&raw_text).await;
        let normalization_ms = start.elapsed().as_millis() as u64;
        let stats = ConversionStats {
            extraction_ms,
            normalization_ms,
        };

        Ok(match normalized {
            Ok(beautified_text) => ConversionOutput {
                raw_text,
                beautified_text,
                error: None,
                stats,
            },
            Err(e) => {
                if e.is_config_error() {
                    warn!("Normalization is not configured: {}", e);
                } else {
                    warn!("Normalization failed, returning raw transcript: {}", e);
                }
                ConversionOutput {
                    raw_text,
                    beautified_text: String::new(),
                    error: Some(e.to_string()),
                    stats,
                }
            }
        })
    }

    /// Probe the compiler, then compile `source` into PDF bytes.
    pub async fn compile_latex(&self, source: &str) -> Result<Vec<u8>, SnapTexError> {
        if !self.compiler.probe().await {
            return Err(SnapTexError::CompilerUnavailable {
                program: self.compiler.program(),
                detail: "availability probe failed".to_string(),
            });
        }
        self.compiler.compile(source).await
    }

    /// Current compiler availability.
    pub async fn latex_status(&self) -> LatexStatus {
        let installed = self.compiler.probe().await;
        LatexStatus::from_probe(installed, &self.compiler.program())
    }
}
