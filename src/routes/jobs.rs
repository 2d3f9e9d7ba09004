use crate::{error::Result, AppState};
use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

/// Point-in-time generation: sheets for sessions starting ten minutes from
/// now. Triggered by the external scheduler (any verb).
pub async fn generate_attendance_sheets(
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let created = state.sheet_generator.run_point_lookup(Utc::now()).await?;
    Ok(Json(json!({
        "message": format!("{} feuille(s) d'émargement créée(s)", created),
        "count": created,
    })))
}

pub async fn attendance_window(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let outcome = state.window_manager.run(Utc::now()).await?;
    Ok(Json(json!({
        "message": format!(
            "{} ouverte(s), {} clôturée(s), {} créée(s) en rattrapage",
            outcome.opened, outcome.closed, outcome.backfilled
        ),
        "opened": outcome.opened,
        "closed": outcome.closed,
        "backfilled": outcome.backfilled,
        "errors": outcome.errors,
    })))
}

pub async fn expire_signature_links(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let outcome = state
        .expiry_reaper
        .run(Utc::now(), &state.notification_service, &state.email_service)
        .await?;
    Ok(Json(json!({
        "message": format!("{} lien(s) de signature expiré(s)", outcome.expired),
        "count": outcome.expired,
        "notified": outcome.notified,
        "errors": outcome.errors,
    })))
}
