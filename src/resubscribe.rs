//! Periodic re-subscription worker: keeps the hub subscription for a topic
//! alive by re-issuing the subscribe form POST on a fixed interval.

use crate::error::ResubscribeError;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const RESUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ResubscribeWorker {
    client: Client,
    target_addr: String,
    topic: String,
    callback_addr: String,
    verify_token: String,
    secret: Option<String>,
    interval: Duration,
}

impl ResubscribeWorker {
    pub fn new(
        target_addr: String,
        topic: String,
        callback_addr: String,
        verify_token: String,
        secret: Option<String>,
        interval: Duration,
    ) -> Self {
        ResubscribeWorker {
            client: Client::builder()
                .timeout(RESUBSCRIBE_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
            target_addr,
            topic,
            callback_addr,
            verify_token,
            secret,
            interval,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => return,
            }

            if let Err(e) = self.subscribe().await {
                warn!(error = %e, topic = %self.topic, "re-subscription failed");
            } else {
                info!(topic = %self.topic, callback = %self.callback_addr, "re-subscribed");
            }
        }
    }

    async fn subscribe(&self) -> Result<(), ResubscribeError> {
        let mut form = vec![
            ("hub.topic", self.topic.as_str()),
            ("hub.callback", self.callback_addr.as_str()),
            ("hub.mode", "subscribe"),
            ("hub.verify", "sync"),
            ("hub.verify_token", self.verify_token.as_str()),
        ];
        if let Some(secret) = &self.secret {
            form.push(("hub.secret", secret.as_str()));
        }

        let response = self.client.post(&self.target_addr).form(&form).send().await?;
        if response.status().as_u16() >= 400 {
            return Err(ResubscribeError::HubRejected(response.status().as_u16()));
        }
        Ok(())
    }
}
