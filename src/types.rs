//! Core types for the Resurface pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw captures, derived features, classification results and the
//! stored items the scorer later ranks.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ResurfaceError;

/// How a capture was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    QuickSave,
    ShareAction,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::QuickSave => "quick_save",
            TriggerKind::ShareAction => "share_action",
        }
    }
}

/// A single user capture, as handed over by the share-action or quick-save flows.
///
/// Every content field may be empty. Such a capture is valid, it just carries
/// little signal and will classify as uncategorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// Unique identifier, carried unchanged into the stored item
    pub id: Uuid,
    /// Capture time in the user's local offset
    pub timestamp: DateTime<FixedOffset>,
    /// Which capture flow produced this event
    pub trigger: TriggerKind,
    /// Bundle identifier of the app the content was shared from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Raw image bytes. Never decoded by the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
}

impl CaptureEvent {
    /// Create an empty capture with a freshly generated identifier
    pub fn new(timestamp: DateTime<FixedOffset>, trigger: TriggerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            trigger,
            source_app: None,
            url: None,
            text: None,
            image: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_source_app(mut self, source_app: impl Into<String>) -> Self {
        self.source_app = Some(source_app.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

/// Part of the day a capture happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeBucket {
    /// Map a local hour (0-23) to its bucket.
    ///
    /// Ranges are inclusive-start, exclusive-end:
    /// morning [5,12), afternoon [12,18), evening [18,22), night [22,24) and [0,5).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeBucket::Morning,
            12..=17 => TimeBucket::Afternoon,
            18..=21 => TimeBucket::Evening,
            _ => TimeBucket::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeBucket::Morning => "morning",
            TimeBucket::Afternoon => "afternoon",
            TimeBucket::Evening => "evening",
            TimeBucket::Night => "night",
        }
    }
}

/// Classification-ready projection of a capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Lowercased URL host, without scheme or path
    pub domain: Option<String>,
    pub source_app: Option<String>,
    pub time_bucket: TimeBucket,
    /// ISO weekday: 1 = Monday ... 7 = Sunday
    pub day_of_week: u8,
    /// Trimmed and truncated text. Empty when the capture had no text.
    pub snippet: String,
    pub has_measurement_units: bool,
    pub has_workout_markers: bool,
    pub has_quote_markers: bool,
    pub has_reading_markers: bool,
}

/// Fine-grained content category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Recipe,
    Workout,
    Quote,
    Reading,
    None,
}

impl Category {
    /// Actionable categories, in tie-break priority order
    pub const ACTIONABLE: [Category; 4] = [
        Category::Recipe,
        Category::Workout,
        Category::Quote,
        Category::Reading,
    ];

    /// Default category to stack mapping
    pub fn default_stack(&self) -> Stack {
        match self {
            Category::Recipe => Stack::Food,
            Category::Workout => Stack::Body,
            Category::Quote => Stack::Mind,
            Category::Reading => Stack::Reading,
            Category::None => Stack::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Recipe => "recipe",
            Category::Workout => "workout",
            Category::Quote => "quote",
            Category::Reading => "reading",
            Category::None => "none",
        }
    }
}

/// Coarse topical bucket used for grouping and resurfacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stack {
    Food,
    Body,
    Mind,
    Reading,
    Other,
}

impl Stack {
    pub const ALL: [Stack; 5] = [
        Stack::Food,
        Stack::Body,
        Stack::Mind,
        Stack::Reading,
        Stack::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stack::Food => "food",
            Stack::Body => "body",
            Stack::Mind => "mind",
            Stack::Reading => "reading",
            Stack::Other => "other",
        }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stack {
    type Err = ResurfaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Stack::ALL
            .into_iter()
            .find(|stack| stack.as_str() == wanted)
            .ok_or_else(|| ResurfaceError::UnknownStack(s.to_string()))
    }
}

/// Outcome of classifying a feature vector.
///
/// Fields are private so that every instance goes through the clamping
/// constructor, including instances decoded from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ClassificationRecord")]
pub struct ClassificationResult {
    category: Category,
    stack: Stack,
    confidence: f64,
}

#[derive(Deserialize)]
struct ClassificationRecord {
    category: Category,
    #[serde(default)]
    stack: Option<Stack>,
    #[serde(default)]
    confidence: f64,
}

impl From<ClassificationRecord> for ClassificationResult {
    fn from(record: ClassificationRecord) -> Self {
        let stack = record
            .stack
            .unwrap_or_else(|| record.category.default_stack());
        Self::with_stack(record.category, stack, record.confidence)
    }
}

impl ClassificationResult {
    /// Build a result using the default category to stack mapping
    pub fn new(category: Category, confidence: f64) -> Self {
        Self::with_stack(category, category.default_stack(), confidence)
    }

    /// Build a result with an explicit stack override
    pub fn with_stack(category: Category, stack: Stack, confidence: f64) -> Self {
        Self {
            category,
            stack,
            confidence: clamp_confidence(confidence),
        }
    }

    /// The safe fallback: category none, stack other
    pub fn uncategorized(confidence: f64) -> Self {
        Self::new(Category::None, confidence)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn stack(&self) -> Stack {
        self.stack
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Clamp a confidence into [0, 1]; NaN maps to 0
fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Lifecycle state of a stored item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Fresh,
    Acted,
    Dismissed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Fresh => "fresh",
            ItemState::Acted => "acted",
            ItemState::Dismissed => "dismissed",
        }
    }
}

/// Canonical persisted record.
///
/// Items are values: user actions produce a replacement via the `record_*`
/// constructors instead of mutating in place. State and counters are not
/// guaranteed to agree (older records may say `dismissed` with zero
/// dismissals), so nothing here assumes they do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// Same identifier as the originating capture
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub category: Category,
    pub stack: Stack,
    pub trigger: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub state: ItemState,
    #[serde(default)]
    pub times_dismissed: u32,
    #[serde(default)]
    pub times_acted_on: u32,
    #[serde(default)]
    pub last_shown_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_action_at: Option<DateTime<Utc>>,
}

impl StoredItem {
    /// Replacement recording that the item was displayed at `at`
    pub fn record_shown(self, at: DateTime<Utc>) -> Self {
        Self {
            last_shown_at: Some(at),
            ..self
        }
    }

    /// Replacement recording that the user acted on the item at `at`
    pub fn record_action(self, at: DateTime<Utc>) -> Self {
        Self {
            state: ItemState::Acted,
            times_acted_on: self.times_acted_on.saturating_add(1),
            last_action_at: Some(at),
            ..self
        }
    }

    /// Replacement recording that the user dismissed the item at `at`
    pub fn record_dismissal(self, at: DateTime<Utc>) -> Self {
        Self {
            state: ItemState::Dismissed,
            times_dismissed: self.times_dismissed.saturating_add(1),
            last_action_at: Some(at),
            ..self
        }
    }
}
