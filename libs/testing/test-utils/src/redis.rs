//! Redis container for the stream broker.

use redis::aio::ConnectionManager;
use redis::streams::StreamPendingReply;
use redis::{AsyncCommands, Client};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// The container lives as long as this value.
///
/// ```no_run
/// use test_utils::TestRedis;
///
/// # async fn example() {
/// let redis = TestRedis::new().await;
/// assert_eq!(redis.stream_len("meeting-created").await, 0);
/// # }
/// ```
pub struct TestRedis {
    #[allow(dead_code)]
    container: ContainerAsync<Redis>,
    connection: ConnectionManager,
    pub connection_string: String,
}

impl TestRedis {
    /// Redis 8; XAUTOCLAIM needs 7 or newer.
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");
        let connection_string = format!("redis://127.0.0.1:{}", port);

        let client = Client::open(connection_string.clone()).expect("Failed to create Redis client");
        let connection = ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis");

        tracing::info!(port, "Test Redis ready");

        Self {
            container,
            connection,
            connection_string,
        }
    }

    /// What producers and consumers take.
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// XLEN; 0 for a stream that does not exist yet.
    pub async fn stream_len(&self, stream: &str) -> usize {
        let mut conn = self.connection();
        conn.xlen(stream).await.expect("XLEN failed")
    }

    /// Entries delivered to `group` but not yet acknowledged.
    pub async fn pending(&self, stream: &str, group: &str) -> usize {
        let mut conn = self.connection();
        let reply: StreamPendingReply = conn.xpending(stream, group).await.expect("XPENDING failed");
        reply.count()
    }
}
