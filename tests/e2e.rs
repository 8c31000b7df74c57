//! End-to-end tests against real tools and a real socket.
//!
//! Tests that need tesseract, pdflatex or a live provider are gated behind
//! the `E2E_ENABLED` environment variable and skip when the tool is absent.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! A full OCR + normalization pass also needs a photo of some text:
//!   E2E_ENABLED=1 SNAPTEX_E2E_IMAGE=notes.jpg OPENAI_API_KEY=... cargo test --test e2e

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use snaptex::convert::NO_TEXT_MESSAGE;
use snaptex::pipeline::extract::{TesseractExtractor, TextExtractor};
use snaptex::pipeline::ingress::ImagePayload;
use snaptex::pipeline::render::{LatexCompiler, PdfLatex};
use snaptex::{router, AppState, CompilerSettings, Pipeline, ServiceConfig};
use std::io::Cursor;
use std::process::Command;
use tokio::net::TcpListener;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn tool_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Skip this test unless E2E_ENABLED is set and `tool` runs.
macro_rules! e2e_skip_unless_tool {
    ($tool:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if !tool_available($tool) {
            println!("SKIP: {} not installed", $tool);
            return;
        }
    }};
}

fn blank_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 80, Rgb([255, 255, 255])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

const MINIMAL_DOCUMENT: &str = r"\documentclass{article}
\begin{document}
Hello, $E = mc^2$.
\end{document}
";

async fn spawn_server(config: ServiceConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::from_config(&config), &config);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Rendering ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_compile_minimal_document() {
    e2e_skip_unless_tool!("pdflatex");

    let compiler = PdfLatex::new(&CompilerSettings::default());
    assert!(compiler.probe().await);

    let pdf = compiler.compile(MINIMAL_DOCUMENT).await.expect("compile failed");
    assert!(pdf.starts_with(b"%PDF"), "output is not a PDF");
    println!("compiled {} bytes", pdf.len());
}

#[tokio::test]
async fn test_compile_broken_document_reports_log() {
    e2e_skip_unless_tool!("pdflatex");

    let compiler = PdfLatex::new(&CompilerSettings::default());
    let err = compiler
        .compile("\\documentclass{article}\\begin{document}\\notacommand\\end{document}")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Undefined control sequence"), "{err}");
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tesseract_blank_image_yields_no_text() {
    e2e_skip_unless_tool!("tesseract");

    let config = ServiceConfig::default();
    let extractor = TesseractExtractor::from_config(&config);
    let text = extractor
        .extract(&ImagePayload::new(blank_png(), "image/png").unwrap())
        .await
        .expect("tesseract failed");
    assert!(text.is_empty(), "unexpected text: {text:?}");

    // The pipeline reports it without calling the model.
    let out = Pipeline::from_config(&config)
        .convert_image(&ImagePayload::new(blank_png(), "image/png").unwrap())
        .await
        .unwrap();
    assert_eq!(out.error.as_deref(), Some(NO_TEXT_MESSAGE));
}

#[tokio::test]
async fn test_full_conversion_of_sample_image() {
    e2e_skip_unless_tool!("tesseract");
    let Ok(path) = std::env::var("SNAPTEX_E2E_IMAGE") else {
        println!("SKIP: set SNAPTEX_E2E_IMAGE to a photo of some text");
        return;
    };

    let media_type = ImageFormat::from_path(&path).unwrap().to_mime_type();
    let bytes = std::fs::read(&path).unwrap();
    let out = Pipeline::from_config(&ServiceConfig::default())
        .convert_image(&ImagePayload::new(bytes, media_type).unwrap())
        .await
        .expect("extraction failed");

    println!("raw:\n{}\n\nbeautified:\n{}", out.raw_text, out.beautified_text);
    assert!(!out.raw_text.is_empty());
    if std::env::var("OPENAI_API_KEY").is_ok() {
        assert!(out.is_complete(), "normalization failed: {:?}", out.error);
        assert!(!out.beautified_text.starts_with("```"));
    }
}

// ── Served over TCP ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_rejects_non_image_over_http() {
    let base = spawn_server(ServiceConfig::default()).await;
    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let part = reqwest::multipart::Part::bytes(b"%PDF-1.4".to_vec())
        .file_name("notes.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    let response = client
        .post(format!("{base}/convert-image"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Provided file is not an image.");
}

#[tokio::test]
async fn test_server_latex_status_with_missing_compiler() {
    let config = ServiceConfig::builder()
        .compiler_program("snaptex-no-such-pdflatex")
        .build()
        .unwrap();
    let base = spawn_server(config).await;

    let status: serde_json::Value = reqwest::get(format!("{base}/latex-status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["latex_installed"], false);

    let response = reqwest::Client::new()
        .post(format!("{base}/compile-latex"))
        .json(&serde_json::json!({"latex_content": MINIMAL_DOCUMENT}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
}
