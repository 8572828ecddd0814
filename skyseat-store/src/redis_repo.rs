use redis::{AsyncCommands, RedisResult};
use tracing::debug;
use uuid::Uuid;

/// Availability cache and request rate limiting. Never authoritative for seat counts.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn availability_key(flight_id: Uuid) -> String {
    format!("flight:{}:availability", flight_id)
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn get_flight_availability(&self, flight_id: Uuid) -> RedisResult<Option<u32>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(availability_key(flight_id)).await
    }

    /// Caches a committed seat count for `ttl_seconds`.
    pub async fn set_flight_availability(&self, flight_id: Uuid, seats: u32, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(availability_key(flight_id), seats, ttl_seconds).await?;
        debug!("Cached availability {} for flight {}", seats, flight_id);
        Ok(())
    }

    pub async fn delete_flight_availability(&self, flight_id: Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(availability_key(flight_id)).await
    }

    /// Fixed-window counter. Returns false once `limit` hits land inside one window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_key_layout() {
        let id = Uuid::nil();
        assert_eq!(availability_key(id), "flight:00000000-0000-0000-0000-000000000000:availability");
    }
}
