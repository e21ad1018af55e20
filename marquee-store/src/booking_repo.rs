use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use marquee_core::{BookingStore, ExpireOutcome, SettleOutcome, StoreError};
use marquee_shared::Booking;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    show_id: Uuid,
    user_id: String,
    seats: Vec<String>,
    amount_cents: i32,
    is_paid: bool,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            show_id: row.show_id,
            user_id: row.user_id,
            seats: row.seats,
            amount_cents: row.amount_cents,
            is_paid: row.is_paid,
            created_at: row.created_at,
        }
    }
}

const BOOKING_COLUMNS: &str = "id, show_id, user_id, seats, amount_cents, is_paid, created_at";

#[async_trait]
impl BookingStore for StoreBookingRepository {
    async fn create_pending(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, show_id, user_id, seats, amount_cents, is_paid, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.id)
        .bind(booking.show_id)
        .bind(&booking.user_id)
        .bind(&booking.seats)
        .bind(booking.amount_cents)
        .bind(booking.is_paid)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(row.map(Booking::from))
    }

    async fn mark_paid_if_pending(&self, booking_id: Uuid) -> Result<SettleOutcome, StoreError> {
        // Single conditional update: either this statement flips the flag or
        // somebody else already settled/released the booking.
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET is_paid = TRUE WHERE id = $1 AND is_paid = FALSE RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;

        if let Some(row) = row {
            return Ok(SettleOutcome::Confirmed(row.into()));
        }

        let exists: Option<bool> =
            sqlx::query_scalar("SELECT is_paid FROM bookings WHERE id = $1")
                .bind(booking_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?;
        match exists {
            Some(_) => Ok(SettleOutcome::AlreadyPaid),
            None => Ok(SettleOutcome::NotFound),
        }
    }

    async fn release_if_pending(&self, booking_id: Uuid) -> Result<ExpireOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        // Compare-and-delete keyed on the unpaid flag. A payment committed
        // before this statement keeps the row and we fall through to
        // Retained; a payment arriving after it finds nothing to settle.
        let released: Option<(Uuid, Vec<String>)> = sqlx::query_as(
            "DELETE FROM bookings WHERE id = $1 AND is_paid = FALSE RETURNING show_id, seats",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;

        let Some((show_id, seats)) = released else {
            tx.rollback()
                .await
                .map_err(|e| StoreError::Transient(e.to_string()))?;
            return Ok(ExpireOutcome::Retained);
        };

        // Free only the keys this booking holds; same transaction, so the
        // booking row and its seats disappear together.
        sqlx::query(
            "DELETE FROM show_seats WHERE show_id = $1 AND booking_id = $2 AND seat = ANY($3::text[])",
        )
        .bind(show_id)
        .bind(booking_id)
        .bind(&seats)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        Ok(ExpireOutcome::Released { show_id, seats })
    }
}
