//! Feature extraction
//!
//! This module projects a raw capture into a feature vector:
//! - URL host as a lowercased domain
//! - Time-of-day bucket and ISO weekday from the local capture time
//! - A trimmed, length-capped text snippet
//! - Keyword flags computed over that exact snippet
//!
//! Extraction is total. Missing or malformed fields degrade to `None` or an
//! empty snippet. Image bytes are never inspected.

use chrono::{Datelike, Timelike};
use url::Url;

use crate::config::{ResurfaceConfig, DEFAULT_SNIPPET_MAX_LENGTH};
use crate::types::{CaptureEvent, FeatureVector, TimeBucket};

/// Cooking units, matched as whole tokens or as a number suffix ("200g")
const MEASUREMENT_UNITS: &[&str] = &[
    "g", "kg", "mg", "ml", "l", "oz", "lb", "cup", "cups", "tbsp", "tsp", "gram", "grams",
    "teaspoon", "teaspoons", "tablespoon", "tablespoons", "pinch",
];

const WORKOUT_MARKERS: &[&str] = &[
    "reps", "rep", "sets", "kg", "lbs", "squat", "squats", "deadlift", "deadlifts", "pushups",
    "pullups", "burpees", "amrap", "emom", "wod", "hiit", "superset", "warmup",
];

const READING_MARKERS: &[&str] = &[
    "article", "articles", "newsletter", "newsletters", "news", "essay", "blog", "longread",
    "longform", "column", "editorial",
];

const QUOTE_CHARS: &[char] = &['"', '\u{201C}', '\u{201D}', '\u{201E}', '\u{00AB}', '\u{00BB}'];

/// Dashes that introduce an attribution: em-dash and horizontal bar
const ATTRIBUTION_DASHES: &[char] = &['\u{2014}', '\u{2015}'];

/// Feature extractor for captures
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    snippet_max_length: usize,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SNIPPET_MAX_LENGTH)
    }
}

impl FeatureExtractor {
    /// Create an extractor with a snippet cap in characters
    pub fn new(snippet_max_length: usize) -> Self {
        Self { snippet_max_length }
    }

    pub fn from_config(config: &ResurfaceConfig) -> Self {
        Self::new(config.snippet_max_length)
    }

    /// Extract features from a capture
    pub fn extract(&self, capture: &CaptureEvent) -> FeatureVector {
        let domain = extract_domain(capture.url.as_deref());
        let time_bucket = TimeBucket::from_hour(capture.timestamp.hour());
        let day_of_week = capture.timestamp.weekday().number_from_monday() as u8;
        let snippet = build_snippet(capture.text.as_deref(), self.snippet_max_length);

        let features = FeatureVector {
            domain,
            source_app: capture.source_app.clone(),
            time_bucket,
            day_of_week,
            has_measurement_units: measurement_unit_hits(&snippet) > 0,
            has_workout_markers: workout_marker_hits(&snippet) > 0,
            has_quote_markers: quote_marker_hits(&snippet) > 0,
            has_reading_markers: reading_marker_hits(&snippet) > 0,
            snippet,
        };

        tracing::debug!(
            capture_id = %capture.id,
            domain = features.domain.as_deref().unwrap_or("-"),
            time_bucket = features.time_bucket.as_str(),
            day_of_week = features.day_of_week,
            snippet_chars = features.snippet.chars().count(),
            has_image = capture.image.is_some(),
            "extracted capture features"
        );

        features
    }
}

/// Lowercased host of a URL, or `None` when absent or unparseable
fn extract_domain(url: Option<&str>) -> Option<String> {
    let raw = url?.trim();
    if raw.is_empty() {
        return None;
    }

    match Url::parse(raw) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| host.trim_end_matches('.').to_ascii_lowercase())
            .filter(|host| !host.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed capture url");
            None
        }
    }
}

/// Trim, then cap at `max_chars` characters
fn build_snippet(text: Option<&str>, max_chars: usize) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let truncated: String = text.trim().chars().take(max_chars).collect();
    truncated.trim_end().to_string()
}

/// Lowercased alphanumeric tokens
fn tokens(snippet: &str) -> impl Iterator<Item = String> + '_ {
    snippet
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

/// Count distinct keywords present, allowing a leading quantity ("500ml").
///
/// Single-letter keywords only count after a quantity, either attached
/// ("200g") or as the previous token ("2 l"), so "e.g." is not a unit.
fn distinct_hits(snippet: &str, keywords: &[&str]) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    let mut after_number = false;
    for token in tokens(snippet) {
        let bare = token.trim_start_matches(|c: char| c.is_ascii_digit());
        if bare.is_empty() {
            after_number = true;
            continue;
        }
        let quantified = after_number || bare.len() < token.len();
        after_number = false;

        if let Some(keyword) = keywords.iter().copied().find(|k| *k == bare) {
            if (keyword.chars().count() > 1 || quantified) && !seen.contains(&keyword) {
                seen.push(keyword);
            }
        }
    }
    seen.len()
}

/// Sets-by-reps notation such as "3x10" or "5x5"
fn is_set_rep_notation(token: &str) -> bool {
    match token.split_once('x') {
        Some((sets, reps)) => {
            !sets.is_empty()
                && !reps.is_empty()
                && sets.chars().all(|c| c.is_ascii_digit())
                && reps.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Number of distinct measurement units in the snippet
pub fn measurement_unit_hits(snippet: &str) -> usize {
    distinct_hits(snippet, MEASUREMENT_UNITS)
}

/// Number of distinct workout markers in the snippet, counting set/rep notation once
pub fn workout_marker_hits(snippet: &str) -> usize {
    let notation = tokens(snippet).any(|token| is_set_rep_notation(&token));
    distinct_hits(snippet, WORKOUT_MARKERS) + usize::from(notation)
}

/// Quote evidence: one point for quotation characters, one for a dash attribution
pub fn quote_marker_hits(snippet: &str) -> usize {
    let quoted = snippet.contains(QUOTE_CHARS);
    usize::from(quoted) + usize::from(has_dash_attribution(snippet))
}

/// Number of distinct reading markers in the snippet
pub fn reading_marker_hits(snippet: &str) -> usize {
    distinct_hits(snippet, READING_MARKERS)
}

/// An em-dash followed by an alphabetic token, e.g. "— Seneca"
fn has_dash_attribution(snippet: &str) -> bool {
    snippet.match_indices(ATTRIBUTION_DASHES).any(|(idx, dash)| {
        snippet[idx + dash.len()..]
            .trim_start()
            .chars()
            .next()
            .is_some_and(char::is_alphabetic)
    })
}
