//! Persistent redelivery queue. Unifies the two redelivery variants found
//! in the original behind a single `RedeliveryStrategy`: hand due entries
//! to local data handlers, or re-POST the raw XML to a target URL with its
//! own retry accounting.

use crate::error::ScheduleError;
use crate::handlers::DataHandler;
use crate::schedule::store::ScheduleStore;
use chrono::{DateTime, Utc};
use feed_model::Event;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    run_at: DateTime<Utc>,
    data: Event,
}

pub enum RedeliveryStrategy {
    Handlers(Vec<Arc<dyn DataHandler>>),
    Http {
        target: Url,
        retry_delay: Duration,
        max_retries: u32,
    },
}

struct RetryState {
    count: u32,
    next_attempt_at: DateTime<Utc>,
}

pub struct ScheduleEngine {
    store: ScheduleStore,
    strategy: RedeliveryStrategy,
    worker_interval: Duration,
    retry_state: Mutex<HashMap<Vec<u8>, RetryState>>,
    http_client: reqwest::Client,
}

impl ScheduleEngine {
    pub fn open(
        database_path: &Path,
        strategy: RedeliveryStrategy,
        worker_interval: Duration,
    ) -> Result<Self, ScheduleError> {
        Ok(ScheduleEngine {
            store: ScheduleStore::open(database_path)?,
            strategy,
            worker_interval,
            retry_state: Mutex::new(HashMap::new()),
            http_client: reqwest::Client::new(),
        })
    }

    pub async fn register_schedule(
        &self,
        run_at: DateTime<Utc>,
        event: Arc<Event>,
    ) -> Result<(), ScheduleError> {
        if event.is_deletion() {
            return Ok(());
        }
        let Some(entry) = event.feed.entry.as_ref() else {
            return Ok(());
        };
        let key = entry.link.href.as_bytes().to_vec();
        let persisted = PersistedEntry {
            run_at,
            data: (*event).clone(),
        };
        let json = serde_json::to_string(&persisted)?;
        self.store.put(&key, &run_at.to_rfc3339(), &json)?;
        info!(url = %entry.link.href, run_at = %run_at, "registered schedule entry");
        Ok(())
    }

    pub async fn run_worker(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.worker_interval) => {}
                _ = cancel.cancelled() => return,
            }
            self.run_pass().await;
        }
    }

    async fn run_pass(&self) {
        let rows = match self.store.scan() {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "schedule scan failed");
                return;
            }
        };

        let now = Utc::now();
        let mut due_keys = Vec::new();

        for (key, _run_at_raw, data_raw) in rows {
            let persisted: PersistedEntry = match serde_json::from_str(&data_raw) {
                Ok(p) => p,
                Err(e) => {
                    warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "failed to deserialize schedule entry, skipping"
                    );
                    continue;
                }
            };

            if now <= persisted.run_at {
                continue;
            }

            match &self.strategy {
                RedeliveryStrategy::Handlers(handlers) => {
                    let event = Arc::new(persisted.data);
                    for handler in handlers {
                        let handler = handler.clone();
                        let event = event.clone();
                        tokio::spawn(async move {
                            handler.handle(CancellationToken::new(), event).await;
                        });
                    }
                    due_keys.push(key);
                }
                RedeliveryStrategy::Http {
                    target,
                    retry_delay,
                    max_retries,
                } => {
                    if let Some(state) = self.retry_state.lock().unwrap().get(&key) {
                        if now < state.next_attempt_at {
                            continue;
                        }
                    }

                    let delivered = self
                        .http_client
                        .post(target.clone())
                        .body(persisted.data.raw_xml.clone())
                        .send()
                        .await
                        .map(|resp| resp.status().as_u16() < 400)
                        .unwrap_or(false);

                    if delivered {
                        self.retry_state.lock().unwrap().remove(&key);
                        due_keys.push(key);
                    } else {
                        let exceeded = {
                            let mut states = self.retry_state.lock().unwrap();
                            let state = states.entry(key.clone()).or_insert(RetryState {
                                count: 0,
                                next_attempt_at: now,
                            });
                            state.count += 1;
                            state.next_attempt_at = now
                                + chrono::Duration::from_std(*retry_delay).unwrap_or(chrono::Duration::zero());
                            *max_retries != 0 && state.count > *max_retries
                        };
                        if exceeded {
                            warn!(
                                key = %String::from_utf8_lossy(&key),
                                "schedule entry exceeded max retries, abandoning"
                            );
                            self.retry_state.lock().unwrap().remove(&key);
                            due_keys.push(key);
                        }
                    }
                }
            }
        }

        if let Err(e) = self.store.delete_many(&due_keys) {
            warn!(error = %e, "failed to delete due schedule entries");
        }
    }

    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_model::{Author, Entry, Feed, Link};

    fn sample_event(video_id: &str) -> Arc<Event> {
        let entry = Entry {
            id: format!("yt:video:{video_id}"),
            video_id: video_id.to_owned(),
            channel_id: "UCxyz".to_owned(),
            title: "A video".to_owned(),
            link: Link {
                rel: "alternate".to_owned(),
                href: format!("https://www.youtube.com/watch?v={video_id}"),
            },
            author: Author {
                name: "Some Channel".to_owned(),
                uri: "https://www.youtube.com/channel/UCxyz".to_owned(),
            },
            published: "2024-01-02T03:04:05Z".to_owned(),
            updated: "2024-01-02T03:04:05Z".to_owned(),
        };
        Arc::new(Event {
            feed: Feed {
                entry: Some(entry),
                deleted_entry: None,
            },
            raw_xml: "<feed></feed>".to_owned(),
        })
    }

    struct CountingHandler {
        count: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl DataHandler for CountingHandler {
        async fn handle(&self, _cancel: CancellationToken, _event: Arc<Event>) {
            self.count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn register_then_pass_delivers_and_empties_store() {
        let dir = tempfile::tempdir().unwrap();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let handler: Arc<dyn DataHandler> = Arc::new(CountingHandler { count: count.clone() });

        let engine = ScheduleEngine::open(
            &dir.path().join("schedule.sqlite3"),
            RedeliveryStrategy::Handlers(vec![handler]),
            Duration::from_millis(10),
        )
        .unwrap();

        let run_at = Utc::now() - chrono::Duration::seconds(1);
        engine.register_schedule(run_at, sample_event("abc")).await.unwrap();

        engine.run_pass().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(engine.store.scan().unwrap().is_empty());

        engine.run_pass().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reregistration_overwrites_prior_entry() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScheduleEngine::open(
            &dir.path().join("schedule.sqlite3"),
            RedeliveryStrategy::Handlers(vec![]),
            Duration::from_secs(60),
        )
        .unwrap();

        let first = Utc::now() + chrono::Duration::hours(1);
        let second = Utc::now() + chrono::Duration::hours(2);
        engine.register_schedule(first, sample_event("abc")).await.unwrap();
        engine.register_schedule(second, sample_event("abc")).await.unwrap();

        let rows = engine.store.scan().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn http_strategy_abandons_entry_after_max_retries() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScheduleEngine::open(
            &dir.path().join("schedule.sqlite3"),
            RedeliveryStrategy::Http {
                target: Url::parse("http://127.0.0.1:1/").unwrap(),
                retry_delay: Duration::from_millis(0),
                max_retries: 2,
            },
            Duration::from_secs(60),
        )
        .unwrap();

        let run_at = Utc::now() - chrono::Duration::seconds(1);
        engine.register_schedule(run_at, sample_event("abc")).await.unwrap();

        for _ in 0..2 {
            engine.run_pass().await;
            assert_eq!(engine.store.scan().unwrap().len(), 1);
        }
        engine.run_pass().await;
        assert!(engine.store.scan().unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_strategy_retries_forever_when_max_retries_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScheduleEngine::open(
            &dir.path().join("schedule.sqlite3"),
            RedeliveryStrategy::Http {
                target: Url::parse("http://127.0.0.1:1/").unwrap(),
                retry_delay: Duration::from_millis(0),
                max_retries: 0,
            },
            Duration::from_secs(60),
        )
        .unwrap();

        let run_at = Utc::now() - chrono::Duration::seconds(1);
        engine.register_schedule(run_at, sample_event("abc")).await.unwrap();

        for _ in 0..10 {
            engine.run_pass().await;
            assert_eq!(engine.store.scan().unwrap().len(), 1);
        }
    }
}
