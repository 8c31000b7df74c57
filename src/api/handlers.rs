use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{
    error::{ApiError, ApiJson},
    state::AppState,
};
use crate::error::SnapTexError;
use crate::output::{ConversionOutput, LatexStatus};
use crate::pipeline::ingress::{validate_media_type, ImagePayload};

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

/// `Content-Disposition` of compiled PDFs.
pub const PDF_DISPOSITION: &str = "attachment; filename=document.pdf";

/// Body of `POST /compile-latex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileRequest {
    pub latex_content: String,
}

/// Health check handler
pub async fn get_health() -> impl IntoResponse {
    #[derive(Serialize)]
    struct Health {
        status: &'static str,
        version: &'static str,
    }

    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OCR an uploaded image and clean the transcript up.
///
/// The media type of the `file` field is checked before its body is read.
/// A normalization failure still answers 200 with the transcript.
#[instrument(skip_all)]
pub async fn convert_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionOutput>, ApiError> {
    let mut multipart = multipart?;
    let payload = read_image_field(&mut multipart).await?;
    info!("Converting {} upload ({} bytes)", payload.media_type(), payload.len());

    let output = state
        .pipeline
        .convert_image(&payload)
        .await
        .map_err(ApiError::ocr_failed)?;

    info!(
        extraction_ms = output.stats.extraction_ms,
        normalization_ms = output.stats.normalization_ms,
        complete = output.is_complete(),
        "Conversion finished"
    );
    Ok(Json(output))
}

/// Find the upload field, validate its media type, then read it.
async fn read_image_field(multipart: &mut Multipart) -> Result<ImagePayload, SnapTexError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SnapTexError::UploadRead(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let media_type = match validate_media_type(field.content_type()) {
            Ok(mt) => mt.to_string(),
            Err(e) => {
                warn!("Rejected upload with content type {:?}", field.content_type());
                return Err(e);
            }
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| SnapTexError::UploadRead(e.to_string()))?;
        return ImagePayload::new(bytes, &media_type);
    }

    Err(SnapTexError::MissingUpload {
        field: UPLOAD_FIELD.to_string(),
    })
}

/// Compile LaTeX source to a PDF attachment.
#[instrument(skip_all)]
pub async fn compile_latex(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CompileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Compiling {} bytes of LaTeX", request.latex_content.len());
    let pdf = state.pipeline.compile_latex(&request.latex_content).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, PDF_DISPOSITION),
        ],
        pdf,
    ))
}

/// Report whether the LaTeX compiler can be run.
pub async fn latex_status(State(state): State<AppState>) -> Json<LatexStatus> {
    Json(state.pipeline.latex_status().await)
}
