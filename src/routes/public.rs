use crate::{dto::attendance_dto::SignSheetRequest, error::Result, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

/// Resolve a sheet by a live signature link. Lets a remote attendee see what
/// they are about to sign without an interactive session.
pub async fn get_sheet_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse> {
    let sheet = state
        .attendance_service
        .get_sheet_by_live_token(&token, Utc::now())
        .await?;
    Ok(Json(json!({ "sheet": sheet })))
}

#[axum::debug_handler]
pub async fn sign_sheet(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<SignSheetRequest>,
) -> Result<impl IntoResponse> {
    let signature = state
        .attendance_service
        .sign_by_token(&token, payload.user_id, payload.present, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Émargement enregistré",
            "signature": signature,
        })),
    ))
}
