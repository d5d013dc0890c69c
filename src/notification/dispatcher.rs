//! Dispatch engine: drives one record from `Pending` to `Sent`.
//!
//! Dispatch is idempotent at the record level. Two guards enforce it:
//! a per-record mutex serializes concurrent dispatch calls for the same id
//! (so a racing call never re-invokes a transport adapter), and the store's
//! conditional `mark_sent` transition is the authoritative backstop.
//!
//! Fan-out policy: every channel in the selector is attempted; one failing
//! channel does not abort its siblings. The record transitions to `Sent`
//! only if at least one channel succeeded. On total failure it stays
//! `Pending` and the summary carries the per-channel reasons.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::channels::{ChannelSender, TransportError};
use crate::error::{AppError, Result};
use crate::metrics::DispatchMetrics;
use crate::store::NotificationStore;

use super::{Channel, ChannelOutcome, DispatchSummary, Notification, OutboundMessage, Status};

/// Statistics for the dispatch engine
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Total dispatch calls, including rejected ones
    pub attempts: AtomicU64,
    /// Records successfully transitioned to `Sent`
    pub records_sent: AtomicU64,
    /// Individual channel sends that failed
    pub channel_failures: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            channel_failures: self.channel_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub attempts: u64,
    pub records_sent: u64,
    pub channel_failures: u64,
}

/// Drives notification records through channel fan-out.
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    senders: Vec<Arc<dyn ChannelSender>>,
    send_timeout: Duration,
    /// Per-record locks serializing concurrent dispatch of the same id
    inflight: DashMap<Uuid, Arc<Mutex<()>>>,
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        senders: Vec<Arc<dyn ChannelSender>>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            store,
            senders,
            send_timeout,
            inflight: DashMap::new(),
            stats: DispatcherStats::default(),
        }
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch one record across every channel in its selector.
    #[tracing::instrument(name = "dispatcher.dispatch", skip(self), fields(notification_id = %id))]
    pub async fn dispatch(&self, id: Uuid) -> Result<DispatchSummary> {
        self.stats.attempts.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_attempt();

        let lock = self
            .inflight
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let result = self.dispatch_locked(id).await;

        drop(_guard);
        // Drop the lock entry once no other caller holds it
        self.inflight
            .remove_if(&id, |_, mutex| Arc::strong_count(mutex) <= 2);

        result
    }

    async fn dispatch_locked(&self, id: Uuid) -> Result<DispatchSummary> {
        let record = self.store.find_by_id(id).await?;

        // Hard precondition, not a retry signal
        if record.status == Status::Sent {
            return Err(AppError::AlreadyProcessed(format!(
                "notification {} has already been sent",
                id
            )));
        }

        let targets: Vec<&Arc<dyn ChannelSender>> = self
            .senders
            .iter()
            .filter(|s| record.channels.contains(s.channel()))
            .collect();

        if targets.is_empty() {
            tracing::warn!(
                notification_id = %id,
                selector = %record.channels,
                "No recognized channel in selector"
            );
            return Err(AppError::ChannelNotSupported);
        }

        let message = OutboundMessage::new(&record.affair, &record.body);
        let mut outcomes = Vec::with_capacity(targets.len());

        for sender in targets {
            outcomes.push(self.attempt(sender.as_ref(), &record, &message).await);
        }

        let any_success = outcomes.iter().any(|o| o.success);
        if any_success {
            let updated = self.store.mark_sent(id, Utc::now()).await?;
            self.stats.records_sent.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_sent();
            tracing::info!(
                notification_id = %id,
                send_at = ?updated.send_at,
                "Notification marked sent"
            );
        } else {
            tracing::warn!(
                notification_id = %id,
                "All channel attempts failed, record stays pending"
            );
        }

        Ok(DispatchSummary {
            notification_id: id,
            sent: any_success,
            outcomes,
        })
    }

    /// Attempt one channel under the configured timeout.
    async fn attempt(
        &self,
        sender: &dyn ChannelSender,
        record: &Notification,
        message: &OutboundMessage,
    ) -> ChannelOutcome {
        let channel = sender.channel();
        let recipient = match channel {
            Channel::Email => record.email.as_str(),
            Channel::Sms | Channel::Whatsapp => record.number.as_str(),
        };

        tracing::debug!(
            notification_id = %record.id,
            channel = %channel,
            "Attempting channel send"
        );
        DispatchMetrics::record_channel_attempt(channel.as_str());

        let result = tokio::time::timeout(self.send_timeout, sender.send(recipient, message)).await;

        let outcome = match result {
            Ok(Ok(())) => ChannelOutcome::ok(channel),
            Ok(Err(e)) => ChannelOutcome::failed(channel, e.to_string()),
            Err(_) => ChannelOutcome::failed(
                channel,
                TransportError::Timeout {
                    channel,
                    seconds: self.send_timeout.as_secs(),
                }
                .to_string(),
            ),
        };

        if !outcome.success {
            self.stats.channel_failures.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_channel_failure(channel.as_str());
            tracing::warn!(
                notification_id = %record.id,
                channel = %channel,
                detail = outcome.detail.as_deref().unwrap_or(""),
                "Channel send failed"
            );
        }

        outcome
    }
}
