//! Stored item construction
//!
//! Turns a capture and its classification into a fresh stored item. The
//! factory copies content as given. Cleaning text is the caller's job.

use chrono::{DateTime, Utc};

use crate::types::{CaptureEvent, ClassificationResult, ItemState, StoredItem};

/// Factory for new stored items
pub struct ItemFactory;

impl ItemFactory {
    /// Build the initial record for a capture.
    ///
    /// The item starts `fresh` with zero counters and no shown/action
    /// timestamps, whatever the classification confidence.
    pub fn from_capture(
        event: &CaptureEvent,
        classification: &ClassificationResult,
        now: DateTime<Utc>,
    ) -> StoredItem {
        Self::from_capture_with_text(event, event.text.clone(), classification, now)
    }

    /// Build the initial record, storing `text` in place of the capture's own text
    pub fn from_capture_with_text(
        event: &CaptureEvent,
        text: Option<String>,
        classification: &ClassificationResult,
        now: DateTime<Utc>,
    ) -> StoredItem {
        StoredItem {
            id: event.id,
            created_at: now,
            category: classification.category(),
            stack: classification.stack(),
            trigger: event.trigger,
            url: event.url.clone(),
            text,
            state: ItemState::Fresh,
            times_dismissed: 0,
            times_acted_on: 0,
            last_shown_at: None,
            last_action_at: None,
        }
    }
}
