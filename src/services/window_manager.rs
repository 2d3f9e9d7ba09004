use crate::error::Result;
use crate::services::sheet_generator::SheetGenerator;
use crate::services::BatchPolicy;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Minutes before session start at which signing opens.
pub const OPENING_LEAD_MINUTES: i64 = 10;
/// Minutes after session start at which signing closes.
pub const CLOSING_GRACE_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WindowSweepOutcome {
    pub opened: u64,
    pub closed: u64,
    pub backfilled: u64,
    pub errors: u64,
}

/// Walks every sheet through its signing window against the wall clock.
///
/// Each sweep runs three steps: open sheets whose session starts within
/// `OPENING_LEAD_MINUTES`, close sheets whose session started more than
/// `CLOSING_GRACE_MINUTES` ago, then backfill sheets the point-in-time
/// generator missed over the next 24 hours. Updates carry an expected-status
/// guard so a concurrent writer on the same sheet loses cleanly instead of
/// double-applying a transition.
#[derive(Clone)]
pub struct WindowManager {
    pool: PgPool,
    generator: SheetGenerator,
    policy: BatchPolicy,
}

impl WindowManager {
    pub fn new(pool: PgPool) -> Self {
        let generator = SheetGenerator::new(pool.clone());
        Self {
            pool,
            generator,
            policy: BatchPolicy::BestEffort,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<WindowSweepOutcome> {
        let mut outcome = WindowSweepOutcome::default();

        self.open_due_sheets(now, &mut outcome).await?;
        self.close_elapsed_sheets(now, &mut outcome).await?;

        match self.generator.run_look_ahead(now).await {
            Ok(created) => outcome.backfilled = created,
            Err(e) => {
                outcome.errors += 1;
                tracing::error!(error = ?e, "Look-ahead backfill failed during window sweep");
            }
        }

        tracing::info!(
            opened = outcome.opened,
            closed = outcome.closed,
            backfilled = outcome.backfilled,
            errors = outcome.errors,
            "Attendance window sweep finished"
        );
        Ok(outcome)
    }

    async fn open_due_sheets(
        &self,
        now: DateTime<Utc>,
        outcome: &mut WindowSweepOutcome,
    ) -> Result<()> {
        let candidates = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"SELECT id, start_at FROM attendance_sheets
               WHERE status = 'pending' AND is_open_for_signing = FALSE"#,
        )
        .fetch_all(&self.pool)
        .await?;

        for (id, start_at) in candidates {
            if !is_within_opening_window(now, start_at) {
                continue;
            }
            let res = sqlx::query(
                r#"UPDATE attendance_sheets
                   SET status = 'in_progress', is_open_for_signing = TRUE,
                       opened_at = $2, updated_at = $2
                   WHERE id = $1 AND status = 'pending' AND is_open_for_signing = FALSE"#,
            )
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await;
            match res {
                Ok(done) if done.rows_affected() > 0 => outcome.opened += 1,
                Ok(_) => {} // another writer got there first
                Err(e) => {
                    outcome.errors += 1;
                    tracing::error!(sheet_id = %id, error = ?e, "Failed to open signing window");
                    if self.policy == BatchPolicy::AllOrNothing {
                        return Err(e.into());
                    }
                }
            }
        }
        Ok(())
    }

    async fn close_elapsed_sheets(
        &self,
        now: DateTime<Utc>,
        outcome: &mut WindowSweepOutcome,
    ) -> Result<()> {
        let candidates = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"SELECT id, start_at FROM attendance_sheets
               WHERE status = 'in_progress' AND is_open_for_signing = TRUE"#,
        )
        .fetch_all(&self.pool)
        .await?;

        for (id, start_at) in candidates {
            if !is_past_closing_time(now, start_at) {
                continue;
            }
            let res = sqlx::query(
                r#"UPDATE attendance_sheets
                   SET status = 'pending_validation', is_open_for_signing = FALSE,
                       closed_at = $2, updated_at = $2
                   WHERE id = $1 AND status = 'in_progress' AND is_open_for_signing = TRUE"#,
            )
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await;
            match res {
                Ok(done) if done.rows_affected() > 0 => outcome.closed += 1,
                Ok(_) => {}
                Err(e) => {
                    outcome.errors += 1;
                    tracing::error!(sheet_id = %id, error = ?e, "Failed to close signing window");
                    if self.policy == BatchPolicy::AllOrNothing {
                        return Err(e.into());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Half-open window: `start - OPENING_LEAD_MINUTES <= now < start`. A sheet
/// whose whole window falls between two sweeps stays pending; the assumed
/// trigger cadence is much shorter than the window.
pub fn is_within_opening_window(now: DateTime<Utc>, start_at: DateTime<Utc>) -> bool {
    let opening_time = start_at - Duration::minutes(OPENING_LEAD_MINUTES);
    now >= opening_time && now < start_at
}

pub fn is_past_closing_time(now: DateTime<Utc>, start_at: DateTime<Utc>) -> bool {
    now >= start_at + Duration::minutes(CLOSING_GRACE_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_start() -> DateTime<Utc> {
        // Session runs 2025-09-22 08:00-12:00.
        Utc.with_ymd_and_hms(2025, 9, 22, 8, 0, 0).unwrap()
    }

    #[test]
    fn opens_from_ten_minutes_before_start() {
        let start = session_start();
        let lower = Utc.with_ymd_and_hms(2025, 9, 22, 7, 50, 0).unwrap();
        assert!(is_within_opening_window(lower, start));
        assert!(is_within_opening_window(
            Utc.with_ymd_and_hms(2025, 9, 22, 7, 51, 0).unwrap(),
            start
        ));
    }

    #[test]
    fn does_not_open_before_the_window() {
        let start = session_start();
        let too_early = Utc.with_ymd_and_hms(2025, 9, 22, 7, 49, 59).unwrap();
        assert!(!is_within_opening_window(too_early, start));
    }

    #[test]
    fn upper_bound_is_exclusive_at_session_start() {
        let start = session_start();
        assert!(!is_within_opening_window(start, start));
        assert!(!is_within_opening_window(
            Utc.with_ymd_and_hms(2025, 9, 22, 8, 10, 0).unwrap(),
            start
        ));
    }

    #[test]
    fn closes_thirty_minutes_after_start() {
        let start = session_start();
        assert!(is_past_closing_time(
            Utc.with_ymd_and_hms(2025, 9, 22, 8, 30, 0).unwrap(),
            start
        ));
        assert!(is_past_closing_time(
            Utc.with_ymd_and_hms(2025, 9, 22, 8, 31, 0).unwrap(),
            start
        ));
    }

    #[test]
    fn does_not_close_during_the_grace_period() {
        let start = session_start();
        assert!(!is_past_closing_time(
            Utc.with_ymd_and_hms(2025, 9, 22, 8, 29, 59).unwrap(),
            start
        ));
        assert!(!is_past_closing_time(start, start));
    }

    #[test]
    fn open_and_close_windows_never_overlap() {
        let start = session_start();
        let mut t = start - Duration::minutes(15);
        while t < start + Duration::minutes(45) {
            assert!(!(is_within_opening_window(t, start) && is_past_closing_time(t, start)));
            t += Duration::seconds(30);
        }
    }

    #[test]
    fn sweep_outcome_defaults_to_zero() {
        let outcome = WindowSweepOutcome::default();
        assert_eq!(outcome.opened, 0);
        assert_eq!(outcome.closed, 0);
        assert_eq!(outcome.backfilled, 0);
        assert_eq!(outcome.errors, 0);
    }
}
