//! Pipeline stages for image-to-LaTeX conversion.
//!
//! Each submodule implements one step. The three stages with external
//! dependencies sit behind traits so they can be swapped or faked.
//!
//! ## Data Flow
//!
//! ```text
//! ingress ──▶ extract ──▶ normalize ──▶ postprocess        render
//! (image/*)   (OCR)       (LLM)         (cleanup)          (pdflatex)
//! ```
//!
//! 1. [`ingress`]: media-type check and the owned upload payload
//! 2. [`extract`]: [`extract::TextExtractor`] over tesseract or a vision model;
//!    [`encode`] prepares images for the latter
//! 3. [`normalize`]: [`normalize::TextNormalizer`] over [`llm`]
//! 4. [`postprocess`]: deterministic cleanup of the model reply
//! 5. [`render`]: [`render::LatexCompiler`], independent of steps 1-4

pub mod encode;
pub mod extract;
pub mod ingress;
pub mod llm;
pub mod normalize;
pub mod postprocess;
pub mod render;
