//! API request/response shapes.

use serde::{Deserialize, Serialize};

use crate::notification::{ChannelOutcome, DispatchSummary};

/// Envelope mirroring the upstream services' message shape.
#[derive(Debug, Serialize)]
pub struct MessageResponse<T> {
    pub error: bool,
    pub message: T,
}

impl<T> MessageResponse<T> {
    pub fn ok(message: T) -> Self {
        Self {
            error: false,
            message,
        }
    }
}

/// Pagination query parameters for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    10
}

/// Dispatch result returned by the schedule endpoint: structured
/// per-channel outcomes plus the derived human-readable lines.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub error: bool,
    pub notification_id: uuid::Uuid,
    pub sent: bool,
    pub outcomes: Vec<ChannelOutcome>,
    pub summary: Vec<String>,
}

impl From<DispatchSummary> for ScheduleResponse {
    fn from(summary: DispatchSummary) -> Self {
        let lines = summary.lines();
        Self {
            error: false,
            notification_id: summary.notification_id,
            sent: summary.sent,
            outcomes: summary.outcomes,
            summary: lines,
        }
    }
}
