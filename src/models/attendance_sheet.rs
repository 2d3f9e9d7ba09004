use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One attendance sheet ("feuille d'émargement") per scheduled session.
///
/// Scheduling fields are copied from the schedule slot at creation time and
/// never re-synced. Status moves `pending` → `in_progress` →
/// `pending_validation` → `validated`; the first two transitions are driven
/// by the background jobs, the last one by a collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceSheet {
    pub id: Uuid,
    pub schedule_slot_id: Uuid,
    pub establishment_id: Uuid,
    pub formation_id: Uuid,
    pub instructor_id: Option<Uuid>,
    pub title: String,
    pub date: NaiveDate,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub room: Option<String>,
    pub status: String,
    pub is_open_for_signing: bool,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub signature_link_token: Option<String>,
    pub signature_link_expires_at: Option<DateTime<Utc>>,
    pub validated_by: Option<Uuid>,
    pub validated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
