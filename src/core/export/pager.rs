//! Windowed pagination over the event store
//!
//! Produces a lazy, finite, non-restartable sequence of event batches
//! covering one window, ascending by timestamp. Each round trips a count
//! over the remaining `[cursor, window.end)` range before fetching, so the
//! loop terminates even when count and fetch disagree transiently.

use crate::adapters::query::{EventPage, EventStore};
use crate::domain::{Integration, Result, Window};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

/// Smallest cursor step: the remote store keys records at millisecond
/// precision, so advancing past the last seen timestamp by one millisecond
/// turns the time-range filter into a strictly-forward cursor.
fn minimal_increment() -> TimeDelta {
    TimeDelta::milliseconds(1)
}

/// Pager over one integration window.
pub struct WindowPager {
    events: Arc<dyn EventStore>,
    integration: Integration,
    window: Window,
    page_size: usize,
    cursor: DateTime<Utc>,
    done: bool,
}

impl WindowPager {
    pub fn new(
        events: Arc<dyn EventStore>,
        integration: Integration,
        window: Window,
        page_size: usize,
    ) -> Self {
        let cursor = window.start();
        Self {
            events,
            integration,
            window,
            page_size,
            cursor,
            done: false,
        }
    }

    /// Current forward-progress position inside the window.
    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }

    /// Next batch of events, or `None` once the window is exhausted.
    ///
    /// Iteration ends when the remaining range counts zero, when a fetch
    /// comes back empty, or when a page carries no usable cursor; after
    /// `None` the pager stays finished.
    pub async fn next_batch(&mut self) -> Result<Option<EventPage>> {
        if self.done {
            return Ok(None);
        }

        let remaining = self
            .events
            .count(&self.integration, self.cursor, self.window.end())
            .await?;
        if remaining == 0 {
            self.done = true;
            return Ok(None);
        }

        let page = self
            .events
            .fetch(
                &self.integration,
                self.cursor,
                self.window.end(),
                self.page_size,
            )
            .await?;

        if page.is_empty() {
            // count said there was more; trust the fetch and stop
            self.done = true;
            return Ok(None);
        }

        match page.next_cursor {
            Some(last_seen) => self.cursor = last_seen + minimal_increment(),
            None => self.done = true,
        }

        Ok(Some(page))
    }
}
