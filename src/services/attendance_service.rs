use crate::error::{Error, Result};
use crate::models::attendance_sheet::AttendanceSheet;
use crate::models::signature::AttendanceSignature;
use crate::services::notification_service::NotificationService;
use crate::utils::token::generate_signature_token;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SignatureLink {
    pub sheet_id: Uuid,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AttendanceService {
    pool: PgPool,
}

impl AttendanceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_sheet(&self, sheet_id: Uuid) -> Result<AttendanceSheet> {
        let sheet = sqlx::query_as::<_, AttendanceSheet>(
            r#"SELECT * FROM attendance_sheets WHERE id = $1"#,
        )
        .bind(sheet_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sheet)
    }

    pub async fn get_sheet_signatures(&self, sheet_id: Uuid) -> Result<Vec<AttendanceSignature>> {
        let rows = sqlx::query_as::<_, AttendanceSignature>(
            r#"SELECT * FROM attendance_signatures
               WHERE attendance_sheet_id = $1
               ORDER BY signed_at ASC"#,
        )
        .bind(sheet_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_sheets(
        &self,
        status: Option<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<AttendanceSheet>, i64)> {
        let offset = (page - 1) * limit;
        let rows = sqlx::query_as::<_, AttendanceSheet>(
            r#"
            SELECT * FROM attendance_sheets
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY start_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(status.clone())
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM attendance_sheets
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::date IS NULL OR date >= $2)
                 AND ($3::date IS NULL OR date <= $3)"#,
        )
        .bind(status)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Issues a time-limited signing link for a sheet and notifies the
    /// targeted students. Student notification is best effort; the link is
    /// returned even if some notification inserts fail.
    pub async fn create_signature_link(
        &self,
        sheet_id: Uuid,
        student_ids: &[Uuid],
        notifier: &NotificationService,
    ) -> Result<SignatureLink> {
        let config = crate::config::get_config();
        let sheet = self.get_sheet(sheet_id).await?;

        if sheet.status != "pending" && sheet.status != "in_progress" {
            return Err(Error::BadRequest(format!(
                "Cannot issue a signature link for a sheet with status '{}'.",
                sheet.status
            )));
        }

        let token = generate_signature_token(32);
        let now = Utc::now();
        let expires_at = now + Duration::minutes(config.signature_link_ttl_minutes);

        sqlx::query(
            r#"UPDATE attendance_sheets
               SET signature_link_token = $2, signature_link_expires_at = $3, updated_at = $4
               WHERE id = $1"#,
        )
        .bind(sheet_id)
        .bind(&token)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let link = format!(
            "{}/emargement/{}",
            config.app_base_url.trim_end_matches('/'),
            token
        );

        let title = "Feuille d'émargement à signer";
        let message = format!("Une signature est demandée pour « {} ».", sheet.title);
        let metadata = json!({
            "attendance_sheet_id": sheet.id,
            "link": link,
            "expires_at": expires_at,
        });
        for student_id in student_ids {
            if let Err(e) = notifier
                .insert(
                    *student_id,
                    "signature_requested",
                    title,
                    &message,
                    Some(metadata.clone()),
                )
                .await
            {
                tracing::warn!(user_id = %student_id, error = ?e, "Failed to notify student of signature link");
            }
        }

        Ok(SignatureLink {
            sheet_id,
            token,
            link,
            expires_at,
        })
    }

    pub async fn get_sheet_by_live_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSheet> {
        let sheet = sqlx::query_as::<_, AttendanceSheet>(
            r#"SELECT * FROM attendance_sheets WHERE signature_link_token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown signature link".to_string()))?;

        match sheet.signature_link_expires_at {
            Some(expiry) if expiry > now => Ok(sheet),
            _ => Err(Error::BadRequest(
                "This signature link has expired.".to_string(),
            )),
        }
    }

    pub async fn sign_by_token(
        &self,
        token: &str,
        user_id: Uuid,
        present: bool,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSignature> {
        let sheet = self.get_sheet_by_live_token(token, now).await?;

        if sheet.status == "pending_validation" || sheet.status == "validated" {
            return Err(Error::BadRequest(
                "This attendance sheet is closed.".to_string(),
            ));
        }

        let existing = sqlx::query_as::<_, (Uuid,)>(
            r#"SELECT id FROM attendance_signatures
               WHERE attendance_sheet_id = $1 AND user_id = $2"#,
        )
        .bind(sheet.id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        if existing.is_some() {
            return Err(Error::BadRequest(
                "Attendance already signed for this session.".to_string(),
            ));
        }

        let signature = sqlx::query_as::<_, AttendanceSignature>(
            r#"INSERT INTO attendance_signatures (attendance_sheet_id, user_id, is_present, signed_at)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(sheet.id)
        .bind(user_id)
        .bind(present)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(signature)
    }

    /// The terminal human transition: `pending_validation` → `validated`.
    pub async fn validate_sheet(
        &self,
        sheet_id: Uuid,
        validated_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSheet> {
        let updated = sqlx::query_as::<_, AttendanceSheet>(
            r#"UPDATE attendance_sheets
               SET status = 'validated', validated_by = $2, validated_at = $3, updated_at = $3
               WHERE id = $1 AND status = 'pending_validation'
               RETURNING *"#,
        )
        .bind(sheet_id)
        .bind(validated_by)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(sheet) => Ok(sheet),
            None => {
                let sheet = self.get_sheet(sheet_id).await?;
                Err(Error::BadRequest(format!(
                    "Cannot validate a sheet with status '{}'. Only sheets awaiting validation can be validated.",
                    sheet.status
                )))
            }
        }
    }
}
