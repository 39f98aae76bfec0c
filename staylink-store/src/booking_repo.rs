use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use staylink_core::repository::{ActivityEntry, BookingRecord, BookingRepository, BookingStatus};
use uuid::Uuid;

pub struct PostgresBookingRepository {
    pub pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    status: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    is_free_cancellation: bool,
    total_amount: Decimal,
    currency: String,
    payment_reference: Option<String>,
}

impl TryFrom<BookingRow> for BookingRecord {
    type Error = String;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::from_code(&row.status)
            .ok_or_else(|| format!("booking {} has unknown status {}", row.id, row.status))?;

        Ok(Self {
            id: row.id,
            reference: row.reference,
            status,
            check_in: row.check_in,
            check_out: row.check_out,
            is_free_cancellation: row.is_free_cancellation,
            total_amount: row.total_amount,
            currency: row.currency,
            payment_reference: row.payment_reference,
        })
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn get_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<BookingRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, reference, status, check_in, check_out, is_free_cancellation,
                   total_amount, currency, payment_reference
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(BookingRecord::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn transition_booking_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_activity(
        &self,
        entry: &ActivityEntry,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO booking_activity (booking_id, action, detail, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.booking_id)
        .bind(&entry.action)
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
