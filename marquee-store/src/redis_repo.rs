use redis::{AsyncCommands, RedisResult};
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Cached JSON occupant map for a show, if present.
    pub async fn get_seat_map(&self, show_id: &Uuid) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("show:{}:seats", show_id);
        conn.get(key).await
    }

    pub async fn set_seat_map(
        &self,
        show_id: &Uuid,
        payload: &str,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("show:{}:seats", show_id);
        conn.set_ex::<_, _, ()>(key, payload, ttl_seconds).await
    }

    /// Drop the cached map after a reserve/release so the next read re-seeds
    /// it from the ledger.
    pub async fn invalidate_seat_map(&self, show_id: &Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("show:{}:seats", show_id);
        conn.del::<_, ()>(key).await
    }

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
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
