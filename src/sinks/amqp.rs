//! Publishes each event's raw XML to an AMQP exchange.

use crate::handlers::DataHandler;
use feed_model::Event;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct AmqpSink {
    _connection: Connection,
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl AmqpSink {
    pub async fn connect(
        dsn: &str,
        exchange: String,
        routing_key: String,
        exchange_kind: &str,
        durable: bool,
        auto_delete: bool,
        internal: bool,
        no_wait: bool,
    ) -> Result<Self, lapin::Error> {
        let connection = Connection::connect(dsn, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        let kind = match exchange_kind {
            "direct" => ExchangeKind::Direct,
            "fanout" => ExchangeKind::Fanout,
            "headers" => ExchangeKind::Headers,
            "topic" => ExchangeKind::Topic,
            _ => ExchangeKind::Topic,
        };
        channel
            .exchange_declare(
                &exchange,
                kind,
                ExchangeDeclareOptions {
                    durable,
                    auto_delete,
                    internal,
                    nowait: no_wait,
                    ..ExchangeDeclareOptions::default()
                },
                Default::default(),
            )
            .await?;

        Ok(AmqpSink {
            _connection: connection,
            channel,
            exchange,
            routing_key,
        })
    }
}

#[async_trait::async_trait]
impl DataHandler for AmqpSink {
    async fn handle(&self, _cancel: CancellationToken, event: Arc<Event>) {
        let result = self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                event.raw_xml.as_bytes(),
                BasicProperties::default(),
            )
            .await;

        if let Err(e) = result {
            warn!(error = %e, exchange = %self.exchange, "failed to publish event to amqp");
        }
    }
}
