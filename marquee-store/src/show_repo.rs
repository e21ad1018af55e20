use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use marquee_core::{LedgerError, SeatLedger, ShowStore, StoreError};
use marquee_shared::Show;

pub struct StoreShowRepository {
    pool: PgPool,
}

impl StoreShowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ShowRow {
    id: Uuid,
    movie_title: String,
    starts_at: DateTime<Utc>,
    price_cents: i32,
    created_at: DateTime<Utc>,
}

impl From<ShowRow> for Show {
    fn from(row: ShowRow) -> Self {
        Show {
            id: row.id,
            movie_title: row.movie_title,
            starts_at: row.starts_at,
            price_cents: row.price_cents,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ShowStore for StoreShowRepository {
    async fn insert(&self, show: &Show) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO shows (id, movie_title, starts_at, price_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(show.id)
        .bind(&show.movie_title)
        .bind(show.starts_at)
        .bind(show.price_cents)
        .bind(show.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, show_id: Uuid) -> Result<Option<Show>, StoreError> {
        let row = sqlx::query_as::<_, ShowRow>(
            "SELECT id, movie_title, starts_at, price_cents, created_at FROM shows WHERE id = $1",
        )
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(row.map(Show::from))
    }
}

#[async_trait]
impl SeatLedger for StoreShowRepository {
    async fn reserve(
        &self,
        show_id: Uuid,
        seats: &[String],
        holder: Uuid,
    ) -> Result<(), LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::Transient(e.to_string()))?;

        // One statement for the whole seat set; conflicting keys are simply
        // not inserted and show up as a short row count.
        let result = sqlx::query(
            r#"
            INSERT INTO show_seats (show_id, seat, booking_id)
            SELECT $1, seat, $2 FROM UNNEST($3::text[]) AS seat
            ON CONFLICT (show_id, seat) DO NOTHING
            "#,
        )
        .bind(show_id)
        .bind(holder)
        .bind(seats)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if foreign_key_violation(&e) {
                LedgerError::ShowNotFound(show_id)
            } else {
                LedgerError::Transient(e.to_string())
            }
        })?;

        if result.rows_affected() as usize != seats.len() {
            // Partial hit: roll the whole request back, then report which
            // seats were contested.
            tx.rollback()
                .await
                .map_err(|e| LedgerError::Transient(e.to_string()))?;
            let taken: Vec<String> = sqlx::query_scalar(
                "SELECT seat FROM show_seats WHERE show_id = $1 AND seat = ANY($2::text[])",
            )
            .bind(show_id)
            .bind(seats)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LedgerError::Transient(e.to_string()))?;
            return Err(LedgerError::SeatConflict { taken });
        }

        // The reservation is committed only once every seat is durably held.
        tx.commit()
            .await
            .map_err(|e| LedgerError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn release(&self, show_id: Uuid, seats: &[String]) -> Result<(), LedgerError> {
        sqlx::query("DELETE FROM show_seats WHERE show_id = $1 AND seat = ANY($2::text[])")
            .bind(show_id)
            .bind(seats)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn occupants(&self, show_id: Uuid) -> Result<HashMap<String, Uuid>, LedgerError> {
        let rows: Vec<(String, Uuid)> =
            sqlx::query_as("SELECT seat, booking_id FROM show_seats WHERE show_id = $1")
                .bind(show_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| LedgerError::Transient(e.to_string()))?;
        Ok(rows.into_iter().collect())
    }
}

fn foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503")
    )
}
