//! Local id generation.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// How a store assigns ids to records added without one.
#[derive(Debug)]
pub enum IdStrategy {
    /// Millisecond timestamps, strictly increasing per store
    Timestamp(TimestampIds),
    /// Random v4 UUIDs
    Uuid,
}

impl IdStrategy {
    /// Timestamp ids starting from the current time.
    #[must_use]
    pub fn timestamp() -> Self {
        Self::Timestamp(TimestampIds::default())
    }

    /// Next id.
    #[must_use]
    pub fn next_id(&self) -> String {
        match self {
            Self::Timestamp(ids) => ids.next().to_string(),
            Self::Uuid => uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Current time in milliseconds, bumped by one whenever two ids would
/// otherwise collide.
#[derive(Debug, Default)]
pub struct TimestampIds {
    last: AtomicI64,
}

impl TimestampIds {
    /// Next id, greater than every id handed out before.
    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            });
        match previous {
            Ok(last) | Err(last) => now.max(last + 1),
        }
    }
}
