use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}
