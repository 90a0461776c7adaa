use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::common::{RetryConfig, retry_with_backoff};

/// Open a `ConnectionManager` and verify it with PING.
///
/// The manager reconnects on its own after the initial connection succeeds.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

/// `connect` with backoff, for brokers that may come up after the worker.
pub async fn connect_with_retry(
    url: &str,
    retry: RetryConfig,
) -> redis::RedisResult<ConnectionManager> {
    retry_with_backoff("redis", || connect(url), retry).await
}
