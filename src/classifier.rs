//! Capture classification
//!
//! The `Classifier` trait is the seam for swapping in a statistical model.
//! `HeuristicClassifier` is the default: it sums evidence weights per category
//! and picks the best category clearing the confidence floor.
//!
//! Evidence per category:
//! - domain allowlist (host equal to, or a subdomain of, a listed domain)
//! - source application allowlist (bundle identifier prefix)
//! - keyword flag, strengthened by the number of distinct keyword hits

use crate::config::ResurfaceConfig;
use crate::features::{
    measurement_unit_hits, quote_marker_hits, reading_marker_hits, workout_marker_hits,
};
use crate::types::{Category, ClassificationResult, FeatureVector};

/// Default minimum confidence for an actionable category
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.5;

const DOMAIN_WEIGHT: f64 = 0.6;
const SOURCE_APP_WEIGHT: f64 = 0.4;
/// Keyword weight is base + per-hit * min(hits, MAX_COUNTED_HITS)
const KEYWORD_BASE_WEIGHT: f64 = 0.45;
const KEYWORD_HIT_WEIGHT: f64 = 0.1;
const MAX_COUNTED_HITS: usize = 4;

/// Maps features to a category, stack and confidence. Must never fail.
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> ClassificationResult;
}

struct CategoryMarkers {
    category: Category,
    domains: &'static [&'static str],
    source_apps: &'static [&'static str],
}

const MARKERS: [CategoryMarkers; 4] = [
    CategoryMarkers {
        category: Category::Recipe,
        domains: &[
            "allrecipes.com",
            "seriouseats.com",
            "bbcgoodfood.com",
            "epicurious.com",
            "food52.com",
            "bonappetit.com",
            "budgetbytes.com",
            "smittenkitchen.com",
            "cooking.nytimes.com",
            "tasty.co",
        ],
        source_apps: &["com.paprikaapp", "com.mealime", "com.whisk"],
    },
    CategoryMarkers {
        category: Category::Workout,
        domains: &[
            "strava.com",
            "bodybuilding.com",
            "muscleandstrength.com",
            "darebee.com",
            "hevyapp.com",
            "fitbod.me",
        ],
        source_apps: &["com.strava", "com.nike.ntc", "com.hevyapp", "com.fitbod"],
    },
    CategoryMarkers {
        category: Category::Quote,
        domains: &["brainyquote.com", "quotefancy.com", "wikiquote.org"],
        source_apps: &["com.amazon.lassen", "com.apple.ibooks"],
    },
    CategoryMarkers {
        category: Category::Reading,
        domains: &[
            "medium.com",
            "substack.com",
            "theatlantic.com",
            "newyorker.com",
            "nytimes.com",
            "theguardian.com",
            "bbc.co.uk",
            "bbc.com",
            "economist.com",
            "wikipedia.org",
            "news.ycombinator.com",
            "longreads.com",
        ],
        source_apps: &[
            "com.apple.news",
            "com.medium.reader",
            "com.substack",
            "com.readwise",
            "com.ideashower.readitlater",
        ],
    },
];

/// Keyword-and-allowlist classifier
#[derive(Debug, Clone, Copy)]
pub struct HeuristicClassifier {
    confidence_floor: f64,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_FLOOR)
    }
}

impl HeuristicClassifier {
    pub fn new(confidence_floor: f64) -> Self {
        Self { confidence_floor }
    }

    pub fn from_config(config: &ResurfaceConfig) -> Self {
        Self::new(config.classification_confidence_floor)
    }

    /// Raw (unclamped) evidence score for one category
    pub fn category_confidence(&self, features: &FeatureVector, category: Category) -> f64 {
        let Some(markers) = MARKERS.iter().find(|m| m.category == category) else {
            return 0.0;
        };

        let mut confidence = 0.0;

        if let Some(domain) = features.domain.as_deref() {
            if markers.domains.iter().any(|d| domain_matches(domain, d)) {
                confidence += DOMAIN_WEIGHT;
            }
        }

        if let Some(app) = features.source_app.as_deref() {
            let app = app.to_ascii_lowercase();
            if markers.source_apps.iter().any(|listed| source_app_matches(&app, listed)) {
                confidence += SOURCE_APP_WEIGHT;
            }
        }

        let (flag, hits) = keyword_evidence(features, category);
        if flag {
            let counted = hits.clamp(1, MAX_COUNTED_HITS);
            confidence += KEYWORD_BASE_WEIGHT + KEYWORD_HIT_WEIGHT * counted as f64;
        }

        confidence
    }
}

impl Classifier for HeuristicClassifier {
    fn classify(&self, features: &FeatureVector) -> ClassificationResult {
        let mut best: Option<(Category, f64)> = None;

        for category in Category::ACTIONABLE {
            let confidence = self.category_confidence(features, category);
            tracing::trace!(category = category.as_str(), confidence, "category evidence");

            // Strict comparison keeps the earlier category on ties
            if best.map_or(true, |(_, top)| confidence > top) {
                best = Some((category, confidence));
            }
        }

        let result = match best {
            Some((category, confidence)) if confidence >= self.confidence_floor => {
                ClassificationResult::new(category, confidence)
            }
            Some((_, confidence)) => ClassificationResult::uncategorized(confidence),
            None => ClassificationResult::uncategorized(0.0),
        };

        tracing::debug!(
            category = result.category().as_str(),
            stack = result.stack().as_str(),
            confidence = result.confidence(),
            "classified capture"
        );

        result
    }
}

/// Host equals the listed domain or is one of its subdomains
fn domain_matches(host: &str, listed: &str) -> bool {
    host == listed
        || host
            .strip_suffix(listed)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Bundle id equal to `listed` or nested under it ("com.strava.run")
fn source_app_matches(app: &str, listed: &str) -> bool {
    app == listed
        || app
            .strip_prefix(listed)
            .is_some_and(|suffix| suffix.starts_with('.'))
}

/// Keyword flag and distinct hit count for a category
fn keyword_evidence(features: &FeatureVector, category: Category) -> (bool, usize) {
    let snippet = features.snippet.as_str();
    match category {
        Category::Recipe => (
            features.has_measurement_units,
            measurement_unit_hits(snippet),
        ),
        Category::Workout => (features.has_workout_markers, workout_marker_hits(snippet)),
        Category::Quote => (features.has_quote_markers, quote_marker_hits(snippet)),
        Category::Reading => (features.has_reading_markers, reading_marker_hits(snippet)),
        Category::None => (false, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::types::{CaptureEvent, Stack, TimeBucket, TriggerKind};
    use chrono::{FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;

    fn capture() -> CaptureEvent {
        let timestamp = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 4, 19, 15, 0)
            .unwrap();
        CaptureEvent::new(timestamp, TriggerKind::ShareAction)
    }

    fn classify(capture: &CaptureEvent) -> ClassificationResult {
        let features = FeatureExtractor::default().extract(capture);
        HeuristicClassifier::default().classify(&features)
    }

    fn empty_features() -> FeatureVector {
        FeatureVector {
            domain: None,
            source_app: None,
            time_bucket: TimeBucket::Night,
            day_of_week: 3,
            snippet: String::new(),
            has_measurement_units: false,
            has_workout_markers: false,
            has_quote_markers: false,
            has_reading_markers: false,
        }
    }

    #[test]
    fn test_empty_features_are_uncategorized() {
        let result = HeuristicClassifier::default().classify(&empty_features());
        assert_eq!(result.category(), Category::None);
        assert_eq!(result.stack(), Stack::Other);
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn test_capture_without_url_or_text_is_uncategorized() {
        let result = classify(&capture().with_image(vec![1, 2, 3]));
        assert_eq!(result.category(), Category::None);
        assert_eq!(result.stack(), Stack::Other);
    }

    #[test]
    fn test_recipe_domain() {
        let result = classify(&capture().with_url("https://www.seriouseats.com/best-lasagna"));
        assert_eq!(result.category(), Category::Recipe);
        assert_eq!(result.stack(), Stack::Food);
        assert!((result.confidence() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_recipe_keywords() {
        let result = classify(&capture().with_text("200g flour, 2 tbsp butter, 1 cup milk"));
        assert_eq!(result.category(), Category::Recipe);
        assert!((result.confidence() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_workout_beats_recipe_on_shared_kg() {
        let result = classify(&capture().with_text("Bench 3 sets of 8 reps at 60kg"));
        assert_eq!(result.category(), Category::Workout);
        assert_eq!(result.stack(), Stack::Body);
    }

    #[test]
    fn test_quote_with_attribution() {
        let result = classify(
            &capture().with_text("\u{201C}Luck is what happens when preparation meets opportunity\u{201D} \u{2014} Seneca"),
        );
        assert_eq!(result.category(), Category::Quote);
        assert_eq!(result.stack(), Stack::Mind);
    }

    #[test]
    fn test_reading_source_app_and_keyword() {
        let result = classify(
            &capture()
                .with_source_app("com.apple.news")
                .with_text("Interesting article on city planning"),
        );
        assert_eq!(result.category(), Category::Reading);
        assert_eq!(result.stack(), Stack::Reading);
        assert!((result.confidence() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_strong_evidence_is_clamped() {
        let result = classify(
            &capture()
                .with_url("https://medium.com/@someone/post")
                .with_source_app("com.medium.reader")
                .with_text("newsletter article essay blog"),
        );
        assert_eq!(result.category(), Category::Reading);
        assert_eq!(result.confidence(), 1.0);
    }

    #[test]
    fn test_below_floor_keeps_computed_confidence() {
        let result = classify(&capture().with_source_app("com.strava.run"));
        assert_eq!(result.category(), Category::None);
        assert_eq!(result.stack(), Stack::Other);
        assert!((result.confidence() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_floor_is_configurable() {
        let features = FeatureExtractor::default().extract(&capture().with_source_app("com.strava.run"));
        let result = HeuristicClassifier::new(0.3).classify(&features);
        assert_eq!(result.category(), Category::Workout);
    }

    #[test]
    fn test_tie_goes_to_earlier_category() {
        // cooking.nytimes.com matches both the recipe and reading allowlists
        let result = classify(&capture().with_url("https://cooking.nytimes.com/recipes/1"));
        assert_eq!(result.category(), Category::Recipe);
    }

    #[test]
    fn test_domain_matching_requires_label_boundary() {
        assert!(domain_matches("medium.com", "medium.com"));
        assert!(domain_matches("blog.medium.com", "medium.com"));
        assert!(!domain_matches("notmedium.com", "medium.com"));
    }

    #[test]
    fn test_source_app_matching_requires_segment_boundary() {
        assert!(source_app_matches("com.strava", "com.strava"));
        assert!(source_app_matches("com.strava.run", "com.strava"));
        assert!(!source_app_matches("com.stravafake", "com.strava"));

        let features = FeatureExtractor::default().extract(&capture().with_source_app("com.stravafake"));
        let result = HeuristicClassifier::new(0.3).classify(&features);
        assert_eq!(result.category(), Category::None);
    }

    #[test]
    fn test_abbreviation_is_not_a_unit() {
        let result = classify(&capture().with_text("Great article on cities, e.g. Vienna housing"));
        assert_eq!(result.category(), Category::Reading);
        assert_eq!(result.stack(), Stack::Reading);
    }

    #[test]
    fn test_malformed_url_does_not_fail() {
        let result = classify(&capture().with_url("ht!tp://::bad"));
        assert_eq!(result.category(), Category::None);
    }
}
