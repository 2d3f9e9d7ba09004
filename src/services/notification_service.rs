use crate::error::Result;
use crate::models::notification::Notification;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Notification sink: one row per recipient in the `notifications` table.
/// Delivery to the user's device is the platform's concern, not ours.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        user_id: Uuid,
        notification_type: &str,
        title: &str,
        message: &str,
        metadata: Option<JsonValue>,
    ) -> Result<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .bind(title)
        .bind(message)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
