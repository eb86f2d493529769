use crate::AppState;
use crate::api::error::{AppError, ErrorBody};
use crate::models::{SwapJob, SwapOptions, SwapSettings};
use crate::services::staging::StagedFiles;
use crate::utils::codec::image_to_data_url;
use crate::utils::validation::is_image_file;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

const MISSING_FIELDS: &str = "Missing required fields: source_face and target_image";

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SwapRequest {
    /// Base64 image holding the face to transplant (data-URL header allowed)
    pub source_face: Option<String>,
    /// Base64 image whose faces get replaced (data-URL header allowed)
    pub target_image: Option<String>,
    #[validate(nested)]
    pub options: Option<SwapOptions>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SwapResponse {
    pub success: bool,
    /// Result as a `data:<mime>;base64,` URL
    pub result_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faces_detected: Option<usize>,
}

#[utoipa::path(
    post,
    path = "/swap-face",
    request_body = SwapRequest,
    responses(
        (status = 200, description = "Face swapped", body = SwapResponse),
        (status = 400, description = "Bad input or no face found", body = ErrorBody),
        (status = 413, description = "Request body too large", body = ErrorBody),
        (status = 500, description = "FaceFusion failed", body = ErrorBody),
        (status = 504, description = "FaceFusion timed out", body = ErrorBody)
    ),
    tag = "swap"
)]
pub async fn swap_face(
    State(state): State<AppState>,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> Result<Json<SwapResponse>, AppError> {
    let Json(req) = payload.map_err(|e| match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(e.body_text()),
        // No JSON content type: treat like an empty body
        StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::BadRequest(MISSING_FIELDS.to_string()),
        _ => AppError::BadRequest(format!("Invalid request body: {}", e.body_text())),
    })?;

    let (Some(source_face), Some(target_image)) =
        (req.source_face.as_deref(), req.target_image.as_deref())
    else {
        return Err(AppError::BadRequest(MISSING_FIELDS.to_string()));
    };

    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let settings = SwapSettings::resolve(&state.config, req.options.as_ref());
    if !state.config.is_allowed_model(&settings.face_swapper_model) {
        return Err(AppError::BadRequest(format!(
            "Unsupported face_swapper_model '{}'",
            settings.face_swapper_model
        )));
    }

    let mut staged = state.scratch.session();
    let result = stage_and_swap(&state, &mut staged, source_face, target_image, settings).await;
    staged.cleanup().await;

    result.map(Json)
}

async fn stage_and_swap(
    state: &AppState,
    staged: &mut StagedFiles,
    source_face: &str,
    target_image: &str,
    settings: SwapSettings,
) -> Result<SwapResponse, AppError> {
    let source = staged
        .stage(source_face)
        .await
        .ok_or_else(|| AppError::BadRequest("Invalid source face image data".to_string()))?;
    let target = staged
        .stage(target_image)
        .await
        .ok_or_else(|| AppError::BadRequest("Invalid target image data".to_string()))?;

    if !is_image_file(&source).await || !is_image_file(&target).await {
        return Err(AppError::BadRequest(
            "Uploaded files are not valid images".to_string(),
        ));
    }

    let job = SwapJob {
        source,
        target,
        output: staged.reserve(),
        settings,
    };

    tracing::info!(
        "🎭 Swapping with {} backend (model {})",
        state.swapper.name(),
        job.settings.face_swapper_model
    );
    let output = state.swapper.swap(&job).await?;

    let result_image = image_to_data_url(&job.output)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read result image: {}", e)))?;

    Ok(SwapResponse {
        success: true,
        result_image,
        faces_detected: output.faces_detected,
    })
}
