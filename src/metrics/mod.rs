//! Prometheus metrics for the notification service.
//!
//! Covers the creation path, the dispatch fan-out, and the queue intake.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "courier";

lazy_static! {
    /// Total notification records created
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_created_total", METRIC_PREFIX),
        "Total notification records created"
    ).unwrap();

    /// Total dispatch calls
    pub static ref DISPATCH_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatch_attempts_total", METRIC_PREFIX),
        "Total dispatch calls, including rejected ones"
    ).unwrap();

    /// Records transitioned to SENT
    pub static ref DISPATCH_SENT_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatch_sent_total", METRIC_PREFIX),
        "Records transitioned to SENT"
    ).unwrap();

    /// Channel send attempts by channel
    pub static ref CHANNEL_SEND_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_channel_send_total", METRIC_PREFIX),
        "Channel send attempts",
        &["channel"]
    ).unwrap();

    /// Channel send failures by channel
    pub static ref CHANNEL_SEND_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_channel_send_failures_total", METRIC_PREFIX),
        "Channel send failures",
        &["channel"]
    ).unwrap();

    /// Queue entries acknowledged
    pub static ref QUEUE_ACKED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_acked_total", METRIC_PREFIX),
        "Queue entries processed and acknowledged"
    ).unwrap();

    /// Queue entries rejected without requeue
    pub static ref QUEUE_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_rejected_total", METRIC_PREFIX),
        "Queue entries rejected without requeue"
    ).unwrap();
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_attempt() {
        DISPATCH_ATTEMPTS_TOTAL.inc();
    }

    pub fn record_sent() {
        DISPATCH_SENT_TOTAL.inc();
    }

    pub fn record_channel_attempt(channel: &str) {
        CHANNEL_SEND_TOTAL.with_label_values(&[channel]).inc();
    }

    pub fn record_channel_failure(channel: &str) {
        CHANNEL_SEND_FAILURES_TOTAL.with_label_values(&[channel]).inc();
    }
}

/// Helper struct for recording queue intake metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_acked() {
        QUEUE_ACKED_TOTAL.inc();
    }

    pub fn record_rejected() {
        QUEUE_REJECTED_TOTAL.inc();
    }
}
