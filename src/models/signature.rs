use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per attendee who signed a sheet. The (sheet, user) pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceSignature {
    pub id: Uuid,
    pub attendance_sheet_id: Uuid,
    pub user_id: Uuid,
    pub is_present: bool,
    pub signed_at: DateTime<Utc>,
}
