use async_trait::async_trait;
use serde_json::{Map, Value};
use skyseat_core::flight::normalize_code;
use skyseat_core::repository::{CommitOutcome, FlightDirectory, FlightMaintenance, StoreResult};
use skyseat_core::FlightRecord;
use sqlx::types::Json;
use tracing::info;
use uuid::Uuid;

use crate::booking_repo::PostgresReservationStore;

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    version: i64,
    doc: Json<Value>,
}

impl From<FlightRow> for FlightRecord {
    fn from(row: FlightRow) -> Self {
        FlightRecord { id: row.id, version: row.version, document: row.doc.0 }
    }
}

#[async_trait]
impl FlightDirectory for PostgresReservationStore {
    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<FlightRecord>> {
        let row: Option<FlightRow> = sqlx::query_as("SELECT id, version, doc FROM flights WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FlightRecord::from))
    }

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<FlightRecord>> {
        let row: Option<FlightRow> = sqlx::query_as(
            "SELECT id, version, doc FROM flights WHERE upper(doc->>'flightNumber') = $1 LIMIT 1",
        )
        .bind(normalize_code(flight_number))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(FlightRecord::from))
    }
}

#[async_trait]
impl FlightMaintenance for PostgresReservationStore {
    async fn patch_flight(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &Map<String, Value>,
    ) -> StoreResult<CommitOutcome> {
        // `||` on jsonb is a shallow merge: patched keys replace, others stay.
        let result = sqlx::query(
            r#"
            UPDATE flights
            SET doc = doc || $3::jsonb, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(Json(patch))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(CommitOutcome::Conflict);
        }
        info!("Patched flight {} at version {}", id, expected_version);
        Ok(CommitOutcome::Applied)
    }
}
