use crate::error::Result;
use crate::models::attendance_sheet::AttendanceSheet;
use crate::models::user::User;
use crate::services::email_service::EmailService;
use crate::services::notification_service::NotificationService;
use crate::services::BatchPolicy;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReaperOutcome {
    pub expired: u64,
    pub notified: u64,
    pub errors: u64,
}

/// Sweeps sheets whose signature link has expired and forces them into
/// `pending_validation`, independently of the window manager's own timing.
///
/// Per-record best effort: one sheet's failure is tallied and the sweep
/// moves on. Notification and email fan-out to the establishment's admins
/// happens only after the status transition landed, and an email failure
/// never rolls it back.
#[derive(Clone)]
pub struct ExpiryReaper {
    pool: PgPool,
    policy: BatchPolicy,
}

impl ExpiryReaper {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            policy: BatchPolicy::BestEffort,
        }
    }

    pub async fn run(
        &self,
        now: DateTime<Utc>,
        notifier: &NotificationService,
        mailer: &EmailService,
    ) -> Result<ReaperOutcome> {
        let sheets = sqlx::query_as::<_, AttendanceSheet>(
            r#"SELECT * FROM attendance_sheets
               WHERE signature_link_token IS NOT NULL
                 AND signature_link_expires_at IS NOT NULL
                 AND signature_link_expires_at < $1
                 AND status IN ('pending', 'in_progress')"#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut outcome = ReaperOutcome::default();
        for sheet in sheets {
            match self.force_close(&sheet, now).await {
                Ok(true) => {
                    outcome.expired += 1;
                    outcome.notified += self.notify_admins(&sheet, now, notifier, mailer).await;
                }
                Ok(false) => {} // another job already moved it on
                Err(e) => {
                    outcome.errors += 1;
                    tracing::error!(sheet_id = %sheet.id, error = ?e, "Failed to expire signature link");
                    if self.policy == BatchPolicy::AllOrNothing {
                        return Err(e);
                    }
                }
            }
        }

        tracing::info!(
            expired = outcome.expired,
            notified = outcome.notified,
            errors = outcome.errors,
            "Signature link sweep finished"
        );
        Ok(outcome)
    }

    async fn force_close(&self, sheet: &AttendanceSheet, now: DateTime<Utc>) -> Result<bool> {
        let done = sqlx::query(
            r#"UPDATE attendance_sheets
               SET status = 'pending_validation', is_open_for_signing = FALSE,
                   closed_at = $2, updated_at = $2
               WHERE id = $1 AND status IN ('pending', 'in_progress')"#,
        )
        .bind(sheet.id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Returns how many notification rows were inserted.
    async fn notify_admins(
        &self,
        sheet: &AttendanceSheet,
        now: DateTime<Utc>,
        notifier: &NotificationService,
        mailer: &EmailService,
    ) -> u64 {
        let admins = match sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE establishment_id = $1 AND role = 'admin'"#,
        )
        .bind(sheet.establishment_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(sheet_id = %sheet.id, error = ?e, "Failed to resolve establishment admins");
                return 0;
            }
        };
        if admins.is_empty() {
            return 0;
        }

        let title = "Lien de signature expiré";
        let message = format!(
            "Le lien de signature de « {} » a expiré. La feuille est en attente de validation.",
            sheet.title
        );
        let metadata = json!({
            "attendance_sheet_id": sheet.id,
            "schedule_slot_id": sheet.schedule_slot_id,
            "expired_at": now,
        });

        let mut notified = 0u64;
        for admin in &admins {
            match notifier
                .insert(
                    admin.id,
                    "signature_link_expired",
                    title,
                    &message,
                    Some(metadata.clone()),
                )
                .await
            {
                Ok(_) => notified += 1,
                Err(e) => {
                    tracing::error!(user_id = %admin.id, error = ?e, "Failed to insert admin notification")
                }
            }
        }

        let recipients: Vec<String> = admins.into_iter().map(|admin| admin.email).collect();
        mailer
            .send_best_effort(&recipients, title, &message, "signature_link_expired")
            .await;

        notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_defaults_to_zero() {
        let outcome = ReaperOutcome::default();
        assert_eq!(outcome.expired, 0);
        assert_eq!(outcome.notified, 0);
        assert_eq!(outcome.errors, 0);
    }

    #[tokio::test]
    async fn reaper_runs_best_effort() {
        // Partial success is the designed behavior for this sweep.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/unused")
            .expect("lazy pool");
        let reaper = ExpiryReaper::new(pool);
        assert_eq!(reaper.policy, BatchPolicy::BestEffort);
    }
}
