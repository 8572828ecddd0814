use async_trait::async_trait;
use skyseat_core::repository::{StoreResult, UserDirectory};
use skyseat_core::UserSummary;
use skyseat_shared::Masked;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
}

impl From<UserRow> for UserSummary {
    fn from(row: UserRow) -> Self {
        UserSummary {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: Masked::new(row.email),
            phone: row.phone,
        }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserSummary>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, first_name, last_name, email, phone FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserSummary::from))
    }

    async fn remove_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected() > 0;
        if removed {
            info!("Removed user {}", id);
        }
        Ok(removed)
    }
}
