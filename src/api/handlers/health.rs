use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Version reported by `/health`. Part of the API contract, independent of
/// the crate version.
pub const API_VERSION: &str = "1.0.0";

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: API_VERSION.to_string(),
    })
}
