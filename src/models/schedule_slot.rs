use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Slot joined with its published schedule and formation, as selected by the
/// sheet generator.
#[derive(Debug, Clone, FromRow)]
pub struct PlannedSlot {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub formation_id: Uuid,
    pub formation_title: String,
    pub instructor_id: Option<Uuid>,
    pub room: Option<String>,
    pub date: NaiveDate,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}
