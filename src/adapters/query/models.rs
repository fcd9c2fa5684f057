//! Wire models for the asynchronous query protocol

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Query reached its successful terminal state.
pub const STATE_SUCCEEDED: &str = "SUCCEEDED";
/// Query is still executing and should be polled again.
pub const STATE_RUNNING: &str = "RUNNING";

/// Response envelope shared by submit and poll.
///
/// A submit that completes immediately carries the result inline; otherwise
/// it carries a request token for the poll loop. Any state other than
/// SUCCEEDED or RUNNING is terminal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub request_token: Option<String>,

    #[serde(default)]
    pub result: Option<QueryResultPayload>,
}

impl QueryResponse {
    pub fn is_succeeded(&self) -> bool {
        self.state == STATE_SUCCEEDED
    }

    pub fn is_running(&self) -> bool {
        self.state == STATE_RUNNING
    }
}

/// Result payload present once a query has SUCCEEDED.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResultPayload {
    #[serde(default)]
    pub records: Vec<serde_json::Value>,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// One page of event records with the derived forward cursor.
///
/// The cursor is the last record's `timestamp` field; callers advance it by
/// the minimal increment before the next fetch, turning the time-range
/// filter into a forward cursor. A missing or unparseable timestamp leaves
/// the cursor absent, which ends pagination.
#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<serde_json::Value>,
    pub next_cursor: Option<DateTime<Utc>>,
}

impl EventPage {
    /// Build a page from raw records, deriving the cursor.
    pub fn from_records(events: Vec<serde_json::Value>) -> Self {
        let next_cursor = events
            .last()
            .and_then(|record| record.get("timestamp"))
            .and_then(serde_json::Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc));

        Self {
            events,
            next_cursor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
