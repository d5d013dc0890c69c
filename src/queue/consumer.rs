//! Redis stream consumer for inbound creation requests.
//!
//! The intake boundary is at-least-once: the broker keeps every delivered
//! entry on the consumer group's pending list until it is acknowledged.
//! Per entry the contract is: deserialize, create, dispatch, then `XACK`.
//! Any failure rejects the entry without requeue — it is copied to the
//! dead-letter stream and acknowledged so it leaves the pending list, never
//! silently dropped as succeeded and never retried automatically.
//!
//! A broker redelivery that arrives after the record already reached `Sent`
//! fails at the dispatcher with `AlreadyProcessed` and is dead-lettered
//! instead of re-notifying the recipient. A redelivery after `create`
//! succeeded but before acknowledgment creates a fresh record; closing that
//! gap needs an idempotency key the message shape does not carry.
//!
//! Each connection starts by reading the consumer's own pending list from
//! id `0`: entries delivered before a crash or disconnect but never settled
//! are run through the same ack-or-dead-letter path before the loop switches
//! to `>` for new entries. Without that pass an unsettled entry would sit on
//! the pending list forever, since `>` only ever returns undelivered ones.

use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tokio::sync::broadcast;

use crate::config::QueueConfig;
use crate::error::{AppError, Result};
use crate::metrics::QueueMetrics;
use crate::notification::{CreateNotificationRequest, DispatchSummary, Dispatcher, NotificationService};

use super::ReconnectBackoff;

/// Stream entry field holding the JSON creation request
const PAYLOAD_FIELD: &str = "payload";

pub struct QueueConsumer {
    config: QueueConfig,
    service: Arc<NotificationService>,
    dispatcher: Arc<Dispatcher>,
    shutdown: broadcast::Sender<()>,
}

impl QueueConsumer {
    pub fn new(
        config: QueueConfig,
        service: Arc<NotificationService>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            service,
            dispatcher,
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Start the consume loop, reconnecting on broker errors.
    pub async fn start(&self) -> anyhow::Result<()> {
        if !self.config.enabled {
            tracing::info!("Queue intake disabled, skipping consumer");
            return Ok(());
        }

        tracing::info!(
            stream = %self.config.stream,
            group = %self.config.group,
            consumer = %self.config.consumer,
            "Starting queue consumer"
        );

        let mut backoff = ReconnectBackoff::new();

        loop {
            match self.run_consume_loop(&mut backoff).await {
                Ok(()) => {
                    tracing::info!("Queue consumer stopped gracefully");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Queue connection error, reconnecting"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Ok(())
    }

    async fn run_consume_loop(&self, backoff: &mut ReconnectBackoff) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.redis_url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;

        self.ensure_group(&mut conn).await?;
        backoff.reset();
        tracing::info!(stream = %self.config.stream, "Queue consumer connected");

        let read_options = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .block(self.config.block_ms as usize)
            .count(self.config.batch_size);

        self.drain_pending(&mut conn, &read_options).await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            // The read future's borrow of the connection must end before
            // entries are processed, so the select only yields the reply
            let stream_keys = [self.config.stream.as_str()];
            let reply: StreamReadReply = tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                reply = conn.xread_options(
                    &stream_keys,
                    &[">"],
                    &read_options,
                ) => reply?,
            };

            for key in reply.keys {
                for entry in key.ids {
                    self.process_entry(&mut conn, &entry).await?;
                }
            }
        }
    }

    /// Settle entries delivered to this consumer but never acknowledged.
    ///
    /// Reading from id `0` returns the consumer's own pending list (the
    /// broker ignores `BLOCK` for history reads, so this never stalls).
    /// Every entry goes through `process_entry`, so a redelivered message
    /// ends up acknowledged or dead-lettered exactly like a fresh one.
    async fn drain_pending(
        &self,
        conn: &mut MultiplexedConnection,
        read_options: &StreamReadOptions,
    ) -> anyhow::Result<()> {
        loop {
            let reply: StreamReadReply = conn
                .xread_options(&[self.config.stream.as_str()], &["0"], read_options)
                .await?;

            let mut settled = 0usize;
            for key in reply.keys {
                for entry in key.ids {
                    self.process_entry(conn, &entry).await?;
                    settled += 1;
                }
            }

            if settled == 0 {
                return Ok(());
            }
            tracing::warn!(count = settled, "Settled redelivered pending entries");
        }
    }

    /// Create the consumer group if it does not exist yet.
    async fn ensure_group(&self, conn: &mut MultiplexedConnection) -> anyhow::Result<()> {
        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(conn)
            .await;

        match created {
            Ok(()) => {
                tracing::info!(group = %self.config.group, "Consumer group created");
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Run one entry through the intake contract and settle it.
    async fn process_entry(
        &self,
        conn: &mut MultiplexedConnection,
        entry: &StreamId,
    ) -> anyhow::Result<()> {
        let payload: Option<Vec<u8>> = entry.get(PAYLOAD_FIELD);

        let result = match payload {
            Some(bytes) => self.handle_payload(&bytes).await,
            None => Err(AppError::Validation(format!(
                "stream entry {} has no {} field",
                entry.id, PAYLOAD_FIELD
            ))),
        };

        match result {
            Ok(summary) => {
                self.ack(conn, &entry.id).await?;
                QueueMetrics::record_acked();
                tracing::info!(
                    entry_id = %entry.id,
                    notification_id = %summary.notification_id,
                    sent = summary.sent,
                    "Queue entry processed and acknowledged"
                );
            }
            Err(e) => {
                self.reject(conn, entry, &e).await?;
                QueueMetrics::record_rejected();
                tracing::error!(
                    entry_id = %entry.id,
                    error = %e,
                    "Queue entry rejected without requeue"
                );
            }
        }

        Ok(())
    }

    /// The per-message contract: deserialize, create, dispatch.
    ///
    /// Split out from the broker plumbing so it is testable in isolation.
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<DispatchSummary> {
        let request: CreateNotificationRequest = serde_json::from_slice(payload)
            .map_err(|e| AppError::Validation(format!("malformed queue message: {}", e)))?;

        let record = self.service.create(request).await?;
        self.dispatcher.dispatch(record.id).await
    }

    async fn ack(&self, conn: &mut MultiplexedConnection, entry_id: &str) -> anyhow::Result<()> {
        let _: i64 = conn
            .xack(&self.config.stream, &self.config.group, &[entry_id])
            .await?;
        Ok(())
    }

    /// Reject without requeue: copy to the dead-letter stream, then
    /// acknowledge the original so it leaves the pending list.
    async fn reject(
        &self,
        conn: &mut MultiplexedConnection,
        entry: &StreamId,
        error: &AppError,
    ) -> anyhow::Result<()> {
        let payload: Vec<u8> = entry.get(PAYLOAD_FIELD).unwrap_or_default();

        let _: String = conn
            .xadd(
                &self.config.dead_letter_stream,
                "*",
                &[
                    (PAYLOAD_FIELD, payload.as_slice()),
                    ("origin_id", entry.id.as_bytes()),
                    ("error", error.to_string().as_bytes()),
                ],
            )
            .await?;

        self.ack(conn, &entry.id).await
    }
}
