//! Handlers for the file dialog and path validation endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::picker::{PickError, PickMode};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PickResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<String, PickError>> for PickResponse {
    fn from(result: Result<String, PickError>) -> Self {
        match result {
            Ok(path) => Self {
                success: true,
                path: Some(path),
                error: None,
            },
            Err(e) => Self {
                success: false,
                path: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidatePathRequest {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidatePathResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/browse -- choose a wordlist file.
pub async fn browse_open(State(state): State<AppState>) -> Json<PickResponse> {
    Json(state.picker.pick(PickMode::Open).await.into())
}

/// POST /api/browse_save -- choose an output file.
pub async fn browse_save(State(state): State<AppState>) -> Json<PickResponse> {
    Json(state.picker.pick(PickMode::Save).await.into())
}

/// POST /api/validate
///
/// A missing or empty path is valid (the field is optional); otherwise the
/// path must name an existing regular file.
pub async fn validate_path(
    payload: Result<Json<ValidatePathRequest>, JsonRejection>,
) -> AppResult<Json<ValidatePathResponse>> {
    let Json(req) = payload.map_err(|r| AppError::BadRequest(r.body_text()))?;

    let path = req.path.as_deref().map(str::trim).unwrap_or_default();
    if path.is_empty() {
        return Ok(Json(ValidatePathResponse {
            valid: true,
            error: None,
        }));
    }

    let is_file = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);

    Ok(Json(ValidatePathResponse {
        valid: is_file,
        error: (!is_file).then(|| "File not found".to_string()),
    }))
}
