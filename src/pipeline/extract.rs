//! Extraction: image bytes → plain-text transcript.
//!
//! Two interchangeable strategies implement [`TextExtractor`]:
//!
//! * [`TesseractExtractor`] decodes the upload with the `image` crate, writes
//!   a normalised PNG into a scratch directory and runs the `tesseract` CLI
//!   on it. No network, no credential.
//! * [`VisionExtractor`] sends the image to a hosted multimodal model with a
//!   fixed transcription instruction.
//!
//! Both return the transcript trimmed of surrounding whitespace and surface
//! every failure immediately; nothing is retried.

use crate::config::{LlmSettings, ServiceConfig};
use crate::error::SnapTexError;
use crate::pipeline::encode::{encode_image, encode_png};
use crate::pipeline::ingress::ImagePayload;
use crate::pipeline::llm::{build_options, complete, ProviderSource};
use crate::prompts::OCR_INSTRUCTION;
use async_trait::async_trait;
use bytes::Bytes;
use edgequake_llm::{ChatMessage, LLMProvider};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Converts an uploaded image into a transcript.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Recognise the text in `image`, returning it trimmed.
    async fn extract(&self, image: &ImagePayload) -> Result<String, SnapTexError>;

    /// Short engine name for logs, e.g. `tesseract`.
    fn name(&self) -> &str;
}

// ── Local strategy ───────────────────────────────────────────────────────────

/// Local OCR through the tesseract binary.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    program: PathBuf,
    lang: String,
}

impl TesseractExtractor {
    pub fn new(program: impl Into<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            lang: lang.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.tesseract_path.clone(), config.tesseract_lang.clone())
    }

    fn failure(&self, detail: impl Into<String>) -> SnapTexError {
        SnapTexError::RecognitionFailed {
            engine: "Tesseract".to_string(),
            detail: detail.into(),
        }
    }
}

/// Decode arbitrary image bytes and re-encode them as PNG.
///
/// Runs on the blocking pool: decoding a phone photo is CPU-bound.
async fn normalise_to_png(bytes: Bytes) -> Result<Vec<u8>, SnapTexError> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&bytes)
            .map_err(|e| SnapTexError::ImageDecode(e.to_string()))?;
        debug!("Decoded image → {}x{} px", img.width(), img.height());
        encode_png(&img).map_err(|e| SnapTexError::ImageDecode(e.to_string()))
    })
    .await
    .map_err(|e| SnapTexError::Internal(format!("Decode task panicked: {}", e)))?
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract(&self, image: &ImagePayload) -> Result<String, SnapTexError> {
        let png = normalise_to_png(image.to_bytes()).await?;

        let scratch = TempDir::new().map_err(|e| SnapTexError::io("Failed to create scratch directory", e))?;
        let input = scratch.path().join("upload.png");
        tokio::fs::write(&input, &png)
            .await
            .map_err(|e| SnapTexError::io("Failed to write scratch image", e))?;

        let output = Command::new(&self.program)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.failure(format!(
                        "'{}' not found. Install tesseract-ocr or set SNAPTEX_TESSERACT.",
                        self.program.display()
                    ))
                } else {
                    self.failure(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(self.failure(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Tesseract recognised {} chars", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

// ── Remote strategy ──────────────────────────────────────────────────────────

/// Remote OCR through a hosted vision model.
#[derive(Debug, Clone)]
pub struct VisionExtractor {
    source: ProviderSource,
    temperature: f32,
    max_tokens: usize,
}

impl VisionExtractor {
    pub fn new(source: ProviderSource, temperature: f32, max_tokens: usize) -> Self {
        Self {
            source,
            temperature,
            max_tokens,
        }
    }

    pub fn from_settings(settings: LlmSettings, config: &ServiceConfig) -> Self {
        Self::new(
            ProviderSource::FromEnv(settings),
            config.temperature,
            config.max_tokens,
        )
    }

    /// Use an already-built provider instead of resolving one per call.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &ServiceConfig) -> Self {
        Self::new(
            ProviderSource::Fixed(provider),
            config.temperature,
            config.max_tokens,
        )
    }
}

#[async_trait]
impl TextExtractor for VisionExtractor {
    async fn extract(&self, image: &ImagePayload) -> Result<String, SnapTexError> {
        let provider = self.source.resolve()?;
        let image_data = encode_image(image.bytes(), image.media_type())?;

        let messages = vec![ChatMessage::user_with_images(OCR_INSTRUCTION, vec![image_data])];
        let options = build_options(self.temperature, self.max_tokens);

        let text = complete(&provider, self.source.label(), &messages, &options)
            .await
            .map_err(|e| match e {
                SnapTexError::LlmApiError { message } => SnapTexError::RecognitionFailed {
                    engine: format!("Vision ({})", self.source.label()),
                    detail: message,
                },
                other => other,
            })?;

        let text = text.trim().to_string();
        info!("Vision model recognised {} chars", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::testing::ScriptedProvider;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png_payload() -> ImagePayload {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])));
        ImagePayload::new(encode_png(&img).unwrap(), "image/png").unwrap()
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_before_running_tesseract() {
        let extractor = TesseractExtractor::new("snaptex-no-such-tesseract", "eng");
        let payload = ImagePayload::new(b"definitely not pixels".to_vec(), "image/png").unwrap();
        let err = extractor.extract(&payload).await.unwrap_err();
        assert!(matches!(err, SnapTexError::ImageDecode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_tesseract_binary_is_reported() {
        let extractor = TesseractExtractor::new("snaptex-no-such-tesseract", "eng");
        let err = extractor.extract(&png_payload()).await.unwrap_err();
        match err {
            SnapTexError::RecognitionFailed { engine, detail } => {
                assert_eq!(engine, "Tesseract");
                assert!(detail.contains("not found"), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn vision_without_credential_is_config_error() {
        let settings = LlmSettings {
            provider: "openai".into(),
            model: "gpt-4.1-nano".into(),
            api_key_var: Some("SNAPTEX_TEST_NEVER_SET_OCR_KEY".into()),
        };
        let extractor = VisionExtractor::from_settings(settings, &ServiceConfig::default());
        let err = extractor.extract(&png_payload()).await.unwrap_err();
        assert!(err.is_config_error(), "got {err:?}");
    }

    #[tokio::test]
    async fn vision_sends_one_image_and_trims_the_transcript() {
        let provider = ScriptedProvider::replying("  \n  x^2 + y^2 = r^2 \n");
        let extractor = VisionExtractor::with_provider(provider.clone(), &ServiceConfig::default());

        let text = extractor.extract(&png_payload()).await.unwrap();
        assert_eq!(text, "x^2 + y^2 = r^2");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 1);
        assert!(calls[0][0].is_user);
        assert_eq!(calls[0][0].images, 1);
        assert_eq!(calls[0][0].content, OCR_INSTRUCTION);
    }

    #[tokio::test]
    async fn vision_blank_reply_is_no_text_content() {
        let provider = ScriptedProvider::replying(" \n\t ");
        let extractor = VisionExtractor::with_provider(provider, &ServiceConfig::default());
        let err = extractor.extract(&png_payload()).await.unwrap_err();
        assert!(matches!(err, SnapTexError::NoTextContent { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn vision_provider_error_is_recognition_failure() {
        let provider = ScriptedProvider::failing("invalid image");
        let extractor = VisionExtractor::with_provider(provider, &ServiceConfig::default());
        match extractor.extract(&png_payload()).await.unwrap_err() {
            SnapTexError::RecognitionFailed { engine, detail } => {
                assert!(engine.starts_with("Vision"), "{engine}");
                assert!(detail.contains("invalid image"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
