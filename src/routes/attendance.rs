use crate::{
    dto::attendance_dto::{
        CreateSignatureLinkRequest, SignatureLinkResponse, ValidateSheetRequest,
    },
    error::Result,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

#[axum::debug_handler]
pub async fn create_signature_link(
    State(state): State<AppState>,
    Json(payload): Json<CreateSignatureLinkRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let link = state
        .attendance_service
        .create_signature_link(
            payload.attendance_sheet_id,
            &payload.student_ids,
            &state.notification_service,
        )
        .await?;

    Ok(Json(SignatureLinkResponse {
        success: true,
        message: format!(
            "Lien de signature généré pour {} participant(s)",
            payload.student_ids.len()
        ),
        link: link.link,
    }))
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(default)]
pub struct ListSheetsQuery {
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list_sheets(
    State(state): State<AppState>,
    Query(query): Query<ListSheetsQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let (sheets, total) = state
        .attendance_service
        .list_sheets(query.status, query.from, query.to, page, per_page)
        .await?;

    Ok(Json(json!({
        "sheets": sheets,
        "total": total,
        "page": page,
        "perPage": per_page,
    })))
}

pub async fn get_sheet(
    State(state): State<AppState>,
    Path(sheet_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let sheet = state.attendance_service.get_sheet(sheet_id).await?;
    let signatures = state
        .attendance_service
        .get_sheet_signatures(sheet_id)
        .await?;
    Ok(Json(json!({
        "sheet": sheet,
        "signatures": signatures,
    })))
}

#[axum::debug_handler]
pub async fn validate_sheet(
    State(state): State<AppState>,
    Path(sheet_id): Path<Uuid>,
    Json(payload): Json<ValidateSheetRequest>,
) -> Result<impl IntoResponse> {
    let sheet = state
        .attendance_service
        .validate_sheet(sheet_id, payload.validated_by, Utc::now())
        .await?;
    Ok(Json(json!({
        "message": "Feuille d'émargement validée",
        "sheet": sheet,
    })))
}
