//! Result types returned by the pipeline and serialised by the HTTP layer.

use serde::{Deserialize, Serialize};

/// Outcome of `/convert-image`.
///
/// `error` is set when extraction succeeded but normalization did not; the
/// transcript is still returned and `beautified_text` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub raw_text: String,
    pub beautified_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// True when both stages succeeded.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-request timings, logged but not sent to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub extraction_ms: u64,
    pub normalization_ms: u64,
}

/// Body of `GET /latex-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatexStatus {
    pub latex_installed: bool,
    pub message: String,
}

impl LatexStatus {
    pub fn from_probe(installed: bool, program: &str) -> Self {
        let message = if installed {
            format!("LaTeX ({program}) is installed and ready")
        } else {
            format!(
                "LaTeX ({program}) is not installed. Please install a LaTeX distribution \
                 (TeX Live, MiKTeX or MacTeX)"
            )
        };
        Self {
            latex_installed: installed,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_error_field() {
        let out = ConversionOutput {
            raw_text: "a".into(),
            beautified_text: "b".into(),
            error: None,
            stats: ConversionStats::default(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json, serde_json::json!({"raw_text": "a", "beautified_text": "b"}));
        assert!(out.is_complete());
    }

    #[test]
    fn partial_result_carries_error() {
        let out = ConversionOutput {
            raw_text: "a".into(),
            beautified_text: String::new(),
            error: Some("normalization failed: boom".into()),
            stats: ConversionStats::default(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["beautified_text"], "");
        assert_eq!(json["error"], "normalization failed: boom");
    }

    #[test]
    fn latex_status_messages() {
        assert!(LatexStatus::from_probe(true, "pdflatex").message.contains("ready"));
        let down = LatexStatus::from_probe(false, "pdflatex");
        assert!(!down.latex_installed);
        assert!(down.message.contains("not installed"));
    }
}
