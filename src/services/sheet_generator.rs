use crate::error::Result;
use crate::models::schedule_slot::PlannedSlot;
use crate::services::BatchPolicy;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Minutes before a session's start at which its sheet is materialized.
pub const GENERATION_LEAD_MINUTES: i64 = 10;
/// Span of the look-ahead scan used for backfill.
pub const LOOK_AHEAD_HOURS: i64 = 24;

const INSERT_SHEET: &str = r#"
INSERT INTO attendance_sheets (
    schedule_slot_id, establishment_id, formation_id, instructor_id,
    title, date, start_at, end_at, room, status, is_open_for_signing
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', FALSE)
"#;

/// Materializes one attendance sheet per upcoming published session.
///
/// Idempotent: a batched existence check on `schedule_slot_id` filters out
/// sessions that already have a sheet, so repeated runs over the same slots
/// create nothing new.
#[derive(Clone)]
pub struct SheetGenerator {
    pool: PgPool,
    policy: BatchPolicy,
}

impl SheetGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            policy: BatchPolicy::AllOrNothing,
        }
    }

    pub fn with_policy(pool: PgPool, policy: BatchPolicy) -> Self {
        Self { pool, policy }
    }

    /// Sessions starting exactly `GENERATION_LEAD_MINUTES` from now, matched
    /// on a one-minute bucket so trigger jitter cannot miss a slot.
    pub async fn run_point_lookup(&self, now: DateTime<Utc>) -> Result<u64> {
        let (from, to) = point_lookup_bucket(now);
        self.generate_for_window(from, to).await
    }

    /// All sessions in the next `LOOK_AHEAD_HOURS`, used as a backfill net
    /// behind the point lookup.
    pub async fn run_look_ahead(&self, now: DateTime<Utc>) -> Result<u64> {
        self.generate_for_window(now, now + Duration::hours(LOOK_AHEAD_HOURS))
            .await
    }

    async fn generate_for_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let slots = sqlx::query_as::<_, PlannedSlot>(
            r#"
            SELECT ss.id, s.establishment_id, ss.formation_id, f.title AS formation_title,
                   ss.instructor_id, ss.room, ss.date, ss.start_at, ss.end_at
            FROM schedule_slots ss
            JOIN schedules s ON s.id = ss.schedule_id
            JOIN formations f ON f.id = ss.formation_id
            WHERE s.status = 'published'
              AND ss.start_at >= $1
              AND ss.start_at < $2
            ORDER BY ss.start_at ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        if slots.is_empty() {
            return Ok(0);
        }

        // One existence query for the whole candidate set, never one per slot.
        let slot_ids: Vec<Uuid> = slots.iter().map(|s| s.id).collect();
        let existing: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT schedule_slot_id FROM attendance_sheets WHERE schedule_slot_id = ANY($1)"#,
        )
        .bind(&slot_ids)
        .fetch_all(&self.pool)
        .await?;

        let missing = missing_slots(&slots, &existing);
        if missing.is_empty() {
            return Ok(0);
        }

        let created = match self.policy {
            BatchPolicy::AllOrNothing => self.insert_batch(&missing).await?,
            BatchPolicy::BestEffort => self.insert_each(&missing).await,
        };

        if created > 0 {
            tracing::info!(created = created, "Attendance sheets materialized");
        }
        Ok(created)
    }

    /// Transactional batch: a failure on any row rolls back the whole run.
    async fn insert_batch(&self, slots: &[&PlannedSlot]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        for slot in slots {
            sqlx::query(INSERT_SHEET)
                .bind(slot.id)
                .bind(slot.establishment_id)
                .bind(slot.formation_id)
                .bind(slot.instructor_id)
                .bind(sheet_title(&slot.formation_title))
                .bind(slot.date)
                .bind(slot.start_at)
                .bind(slot.end_at)
                .bind(slot.room.as_deref())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(slots.len() as u64)
    }

    async fn insert_each(&self, slots: &[&PlannedSlot]) -> u64 {
        let mut created = 0u64;
        for slot in slots {
            let res = sqlx::query(INSERT_SHEET)
                .bind(slot.id)
                .bind(slot.establishment_id)
                .bind(slot.formation_id)
                .bind(slot.instructor_id)
                .bind(sheet_title(&slot.formation_title))
                .bind(slot.date)
                .bind(slot.start_at)
                .bind(slot.end_at)
                .bind(slot.room.as_deref())
                .execute(&self.pool)
                .await;
            match res {
                Ok(_) => created += 1,
                Err(e) => {
                    tracing::error!(slot_id = %slot.id, error = ?e, "Failed to create attendance sheet")
                }
            }
        }
        created
    }
}

pub fn sheet_title(formation_title: &str) -> String {
    format!("{} - Feuille d'émargement", formation_title)
}

/// One-minute half-open bucket starting `GENERATION_LEAD_MINUTES` from now,
/// floored to the minute.
pub fn point_lookup_bucket(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let target = now + Duration::minutes(GENERATION_LEAD_MINUTES);
    let secs = target.timestamp();
    let floored = DateTime::<Utc>::from_timestamp(secs - secs.rem_euclid(60), 0).unwrap_or(target);
    (floored, floored + Duration::minutes(1))
}

fn missing_slots<'a>(slots: &'a [PlannedSlot], existing: &[Uuid]) -> Vec<&'a PlannedSlot> {
    slots
        .iter()
        .filter(|slot| !existing.contains(&slot.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn slot(id: Uuid, start_at: DateTime<Utc>) -> PlannedSlot {
        PlannedSlot {
            id,
            establishment_id: Uuid::new_v4(),
            formation_id: Uuid::new_v4(),
            formation_title: "Habilitation électrique".to_string(),
            instructor_id: None,
            room: Some("B204".to_string()),
            date: start_at.date_naive(),
            start_at,
            end_at: start_at + Duration::hours(4),
        }
    }

    #[test]
    fn point_lookup_bucket_floors_to_the_minute() {
        let now = Utc.with_ymd_and_hms(2025, 9, 22, 7, 50, 23).unwrap();
        let (from, to) = point_lookup_bucket(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 9, 22, 8, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 9, 22, 8, 1, 0).unwrap());
    }

    #[test]
    fn point_lookup_bucket_is_one_minute_wide_on_exact_minutes() {
        let now = Utc.with_ymd_and_hms(2025, 9, 22, 7, 50, 0).unwrap();
        let (from, to) = point_lookup_bucket(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 9, 22, 8, 0, 0).unwrap());
        assert_eq!(to - from, Duration::minutes(1));
    }

    #[test]
    fn sheet_title_interpolates_formation() {
        assert_eq!(
            sheet_title("SST initial"),
            "SST initial - Feuille d'émargement"
        );
    }

    #[test]
    fn missing_slots_filters_existing_sheets() {
        let start = Utc.with_ymd_and_hms(2025, 9, 22, 8, 0, 0).unwrap();
        let a = slot(Uuid::new_v4(), start);
        let b = slot(Uuid::new_v4(), start);
        let c = slot(Uuid::new_v4(), start);
        let slots = vec![a.clone(), b.clone(), c.clone()];

        let missing = missing_slots(&slots, &[b.id]);
        let ids: Vec<Uuid> = missing.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn missing_slots_is_empty_when_all_sheets_exist() {
        let start = Utc.with_ymd_and_hms(2025, 9, 22, 8, 0, 0).unwrap();
        let a = slot(Uuid::new_v4(), start);
        let slots = vec![a.clone()];
        assert!(missing_slots(&slots, &[a.id]).is_empty());
    }

    #[test]
    fn planned_slot_date_matches_start() {
        let start = Utc.with_ymd_and_hms(2025, 9, 22, 8, 0, 0).unwrap();
        let s = slot(Uuid::new_v4(), start);
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2025, 9, 22).unwrap());
    }
}
