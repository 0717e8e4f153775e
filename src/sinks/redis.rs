//! Publishes each event's raw XML to a Redis channel (`PUBLISH`).

use crate::handlers::DataHandler;
use feed_model::Event;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct RedisSink {
    connection: ConnectionManager,
    channel: String,
}

impl RedisSink {
    pub async fn connect(addr: &str, channel: String) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(addr)?;
        let connection = client.get_connection_manager().await?;
        Ok(RedisSink { connection, channel })
    }
}

#[async_trait::async_trait]
impl DataHandler for RedisSink {
    async fn handle(&self, _cancel: CancellationToken, event: Arc<Event>) {
        let mut conn = self.connection.clone();
        let result: Result<i64, redis::RedisError> =
            conn.publish(&self.channel, event.raw_xml.as_str()).await;
        if let Err(e) = result {
            warn!(error = %e, channel = %self.channel, "failed to publish event to redis");
        }
    }
}
