use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use marquee_core::{ExpiryScheduler, ExpiryTask, SchedulerError};

/// Durable expiry queue: one fire-at row per booking in Postgres. Rows
/// survive restarts and stay put until `complete`, which is what gives the
/// worker its at-least-once redelivery.
pub struct StoreExpiryScheduler {
    pool: PgPool,
}

impl StoreExpiryScheduler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    booking_id: Uuid,
    fire_at: DateTime<Utc>,
}

#[async_trait]
impl ExpiryScheduler for StoreExpiryScheduler {
    async fn schedule(
        &self,
        booking_id: Uuid,
        fire_at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        // The primary key enforces at most one task per booking; re-scheduling
        // is a silent no-op.
        sqlx::query(
            "INSERT INTO expiry_jobs (booking_id, fire_at) VALUES ($1, $2) ON CONFLICT (booking_id) DO NOTHING",
        )
        .bind(booking_id)
        .bind(fire_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SchedulerError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ExpiryTask>, SchedulerError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT booking_id, fire_at FROM expiry_jobs WHERE fire_at <= $1 ORDER BY fire_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SchedulerError::Transient(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| ExpiryTask {
                booking_id: row.booking_id,
                fire_at: row.fire_at,
            })
            .collect())
    }

    async fn complete(&self, booking_id: Uuid) -> Result<(), SchedulerError> {
        sqlx::query("DELETE FROM expiry_jobs WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(|e| SchedulerError::Transient(e.to_string()))?;
        Ok(())
    }
}
