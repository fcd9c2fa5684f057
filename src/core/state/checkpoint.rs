//! Checkpoint model for resumable exports
//!
//! One checkpoint per integration marks the end of the last window whose
//! archive parts were durably uploaded. Only the owning window pipeline
//! mutates it, and only after upload; a run that fails mid-window leaves it
//! untouched so the next run reprocesses that window.

use crate::config::InitialPosition;
use crate::domain::window::truncate_to_hour;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Persisted processing state for a single integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Integration this checkpoint belongs to
    pub integration_id: String,

    /// End of the last fully-archived window
    pub last_processed_timestamp: DateTime<Utc>,

    /// When this checkpoint was last written
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Manufactured checkpoint for an integration seen for the first time.
    ///
    /// Lookback mode starts a fixed number of hours behind "now" (hour
    /// aligned); epoch mode starts at the Unix epoch for full backfills.
    pub fn initial(
        integration_id: impl Into<String>,
        position: InitialPosition,
        lookback_hours: u32,
    ) -> Self {
        let last_processed_timestamp = match position {
            InitialPosition::Lookback => {
                truncate_to_hour(Utc::now() - TimeDelta::hours(i64::from(lookback_hours)))
            }
            InitialPosition::Epoch => DateTime::UNIX_EPOCH,
        };

        Self {
            integration_id: integration_id.into(),
            last_processed_timestamp,
            updated_at: Utc::now(),
        }
    }

    /// Checkpoint advanced to a newly-archived window end.
    pub fn advanced_to(integration_id: impl Into<String>, window_end: DateTime<Utc>) -> Self {
        Self {
            integration_id: integration_id.into(),
            last_processed_timestamp: window_end,
            updated_at: Utc::now(),
        }
    }
}
