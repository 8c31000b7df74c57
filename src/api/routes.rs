use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::{auth, handlers, state::AppState};
use crate::config::ServiceConfig;
use crate::error::SnapTexError;

/// Create the router with every route and layer.
pub fn router(state: AppState, config: &ServiceConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/convert-image", post(handlers::convert_image))
        .route("/compile-latex", post(handlers::compile_latex))
        .route("/latex-status", get(handlers::latex_status))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

/// Bind `config.bind_addr()` and serve until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> Result<(), SnapTexError> {
    let state = AppState::from_config(&config);
    let app = router(state, &config);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SnapTexError::io(format!("Failed to bind {addr}"), e))?;
    info!("snaptex listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SnapTexError::io("Server error", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Pipeline;
    use crate::pipeline::encode::encode_png;
    use crate::pipeline::extract::VisionExtractor;
    use crate::pipeline::llm::testing::ScriptedProvider;
    use crate::pipeline::normalize::LlmNormalizer;
    use crate::pipeline::render::PdfLatex;
    use crate::users::InMemoryUserStore;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use image::{DynamicImage, Rgb, RgbImage};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = ServiceConfig::default();
        let state = AppState::new(Pipeline::from_config(&config), Arc::new(InMemoryUserStore::new()));
        router(state, &config)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_allows_dev_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/convert-image")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn invalid_origins_are_skipped() {
        // Must not panic on a header value with a newline.
        let _ = cors_layer(&["http://ok.test".into(), "bad\norigin".into()]);
    }

    /// Remote extraction and normalization both backed by scripted providers.
    fn vision_app(ocr: Arc<ScriptedProvider>, llm: Arc<ScriptedProvider>) -> Router {
        let config = ServiceConfig::default();
        let pipeline = Pipeline::new(
            Arc::new(VisionExtractor::with_provider(ocr, &config)),
            Arc::new(LlmNormalizer::with_provider(llm, &config)),
            Arc::new(PdfLatex::new(&config.compiler)),
        );
        router(AppState::new(pipeline, Arc::new(InMemoryUserStore::new())), &config)
    }

    fn png_upload() -> Request<Body> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])));
        let png = encode_png(&img).unwrap();
        let mut body = b"--b\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
            Content-Type: image/png\r\n\r\n"
            .to_vec();
        body.extend_from_slice(&png);
        body.extend_from_slice(b"\r\n--b--\r\n");
        Request::builder()
            .method(Method::POST)
            .uri("/convert-image")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=b")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn remote_extraction_and_normalization_end_to_end() {
        let app = vision_app(
            ScriptedProvider::replying("  E = mc^2 \n"),
            ScriptedProvider::replying("```latex\n$E = mc^2$\\n\n```"),
        );
        let response = app.oneshot(png_upload()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["raw_text"], "E = mc^2");
        assert_eq!(body["beautified_text"], "$E = mc^2$");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn remote_extraction_failure_is_500_ocr_failed() {
        let llm = ScriptedProvider::replying("unused");
        let app = vision_app(ScriptedProvider::failing("model overloaded"), llm.clone());
        let response = app.oneshot(png_upload()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("OCR failed: "), "{detail}");
        assert!(detail.contains("model overloaded"), "{detail}");
        assert!(llm.calls().is_empty(), "normalization must not run");
    }

    #[tokio::test]
    async fn fence_only_normalization_reply_degrades_with_error() {
        let app = vision_app(ScriptedProvider::replying("x"), ScriptedProvider::replying("```\n```"));
        let response = app.oneshot(png_upload()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["raw_text"], "x");
        assert_eq!(body["beautified_text"], "");
        assert!(body["error"].as_str().unwrap().starts_with("normalization failed: "));
    }

    #[tokio::test]
    async fn malformed_json_body_renders_detail() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/compile-latex")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn missing_json_field_renders_detail() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email": "a@b.c"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("password"), "{detail}");
    }

    #[tokio::test]
    async fn missing_content_type_renders_detail() {
        for uri in ["/compile-latex", "/convert-image"] {
            let response = app()
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri(uri)
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert!(response.status().is_client_error(), "{uri}");
            assert!(json_body(response).await["detail"].is_string(), "{uri}");
        }
    }
}
