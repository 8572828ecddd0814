use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyseat_core::repository::{
    BookingLedger, BookingWrite, CommitOutcome, ReservationStore, SeatMutation, StoreResult,
};
use skyseat_core::{Booking, Extras, PassengerDetail, PaymentSnapshot};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed flight inventory and booking ledger.
pub struct PostgresReservationStore {
    pub(crate) pool: PgPool,
}

impl PostgresReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    flight_id: Uuid,
    passengers: i32,
    passenger_details: Json<Vec<PassengerDetail>>,
    extras: Json<Extras>,
    payment: Json<PaymentSnapshot>,
    status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            flight_id: row.flight_id,
            passengers: u32::try_from(row.passengers)?,
            passenger_details: row.passenger_details.0,
            extras: row.extras.0,
            payment: row.payment.0,
            status: row.status.parse()?,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, flight_id, passengers, passenger_details, extras, payment, status, version, created_at, updated_at";

impl PostgresReservationStore {
    async fn fetch_bookings(&self, filter: &str, id: Uuid) -> StoreResult<Vec<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE {} = $1 ORDER BY created_at DESC", BOOKING_COLUMNS, filter);
        let rows: Vec<BookingRow> = sqlx::query_as(&sql).bind(id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Booking::try_from).collect()
    }
}

#[async_trait]
impl BookingLedger for PostgresReservationStore {
    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        self.fetch_bookings("user_id", user_id).await
    }

    async fn list_by_flight(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>> {
        self.fetch_bookings("flight_id", flight_id).await
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn commit(&self, mutation: SeatMutation) -> StoreResult<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        // 1. Seat count, only if nobody else moved the flight since we read it
        let seats = i32::try_from(mutation.seats_available)?;
        let flight = sqlx::query(
            r#"
            UPDATE flights
            SET doc = jsonb_set(doc, '{seatsAvailable}', to_jsonb($3::int)),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(mutation.flight_id)
        .bind(mutation.expected_flight_version)
        .bind(seats)
        .execute(&mut *tx)
        .await?;

        if flight.rows_affected() == 0 {
            tx.rollback().await?;
            debug!("Flight {} version {} is stale", mutation.flight_id, mutation.expected_flight_version);
            return Ok(CommitOutcome::Conflict);
        }

        // 2. Ledger write in the same transaction
        let written = match &mutation.booking {
            BookingWrite::Insert(booking) => {
                sqlx::query(
                    r#"
                    INSERT INTO bookings (id, user_id, flight_id, passengers, passenger_details, extras, payment, status, version, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(booking.id)
                .bind(booking.user_id)
                .bind(booking.flight_id)
                .bind(i32::try_from(booking.passengers)?)
                .bind(Json(&booking.passenger_details))
                .bind(Json(&booking.extras))
                .bind(Json(&booking.payment))
                .bind(booking.status.as_str())
                .bind(booking.version)
                .bind(booking.created_at)
                .bind(booking.updated_at)
                .execute(&mut *tx)
                .await?
            }
            BookingWrite::Update { booking, expected_version } => {
                sqlx::query(
                    r#"
                    UPDATE bookings
                    SET passengers = $3, passenger_details = $4, extras = $5, payment = $6,
                        status = $7, version = $8, updated_at = $9
                    WHERE id = $1 AND version = $2
                    "#,
                )
                .bind(booking.id)
                .bind(expected_version)
                .bind(i32::try_from(booking.passengers)?)
                .bind(Json(&booking.passenger_details))
                .bind(Json(&booking.extras))
                .bind(Json(&booking.payment))
                .bind(booking.status.as_str())
                .bind(booking.version)
                .bind(booking.updated_at)
                .execute(&mut *tx)
                .await?
            }
        };

        if written.rows_affected() == 0 {
            // Dropping the seat change with it: neither half may land alone.
            tx.rollback().await?;
            debug!("Booking {} is stale", mutation.booking.booking().id);
            return Ok(CommitOutcome::Conflict);
        }

        tx.commit().await?;
        Ok(CommitOutcome::Applied)
    }
}
