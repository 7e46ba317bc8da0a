//! Pipeline orchestration
//!
//! This module provides the public API for Resurface. It wires the capture
//! stages together and exposes the scorer to hosts.
//!
//! Capture pipeline stages:
//! 1. FeatureExtractor - Project the capture into features
//! 2. Classifier - Pick a category and stack
//! 3. ItemFactory - Build the fresh stored item
//!
//! Selection runs separately, on demand, over a snapshot of stored items.

use chrono::{DateTime, Utc};

use crate::classifier::{Classifier, HeuristicClassifier};
use crate::config::ResurfaceConfig;
use crate::error::ResurfaceError;
use crate::factory::ItemFactory;
use crate::features::FeatureExtractor;
use crate::scorer::BehaviourScorer;
use crate::store::ItemStore;
use crate::types::{CaptureEvent, ClassificationResult, FeatureVector, Stack, StoredItem};

/// Turn a capture into a stored item using the default configuration.
pub fn capture_to_item(event: &CaptureEvent, now: DateTime<Utc>) -> StoredItem {
    ResurfaceProcessor::new().process_capture(event, now)
}

/// Convert a capture JSON object into a stored item JSON object.
///
/// # Example
/// ```ignore
/// let item_json = capture_json_to_item_json(capture_json, Utc::now())?;
/// ```
pub fn capture_json_to_item_json(
    capture_json: &str,
    now: DateTime<Utc>,
) -> Result<String, ResurfaceError> {
    let event: CaptureEvent = serde_json::from_str(capture_json)?;
    let item = capture_to_item(&event, now);
    serde_json::to_string(&item).map_err(|e| ResurfaceError::EncodingError(e.to_string()))
}

/// Pick the best item of a stack from a JSON array of stored items.
///
/// Returns `Ok(None)` when the stack has no candidates.
pub fn best_item_json(
    items_json: &str,
    stack: &str,
    at: DateTime<Utc>,
) -> Result<Option<String>, ResurfaceError> {
    let stack: Stack = stack.parse()?;
    let items: Vec<StoredItem> = serde_json::from_str(items_json)?;

    ResurfaceProcessor::new()
        .suggest(stack, at, &items)
        .map(|item| {
            serde_json::to_string(item).map_err(|e| ResurfaceError::EncodingError(e.to_string()))
        })
        .transpose()
}

/// Processor holding a configuration and a classifier.
///
/// Every method takes `&self`, so one processor can be shared across threads.
pub struct ResurfaceProcessor {
    extractor: FeatureExtractor,
    classifier: Box<dyn Classifier>,
    scorer: BehaviourScorer,
}

impl Default for ResurfaceProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResurfaceProcessor {
    /// Create a processor with default settings and the heuristic classifier
    pub fn new() -> Self {
        Self::from_parts(ResurfaceConfig::default())
    }

    /// Create a processor from a validated configuration
    pub fn with_config(config: ResurfaceConfig) -> Result<Self, ResurfaceError> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: ResurfaceConfig) -> Self {
        Self {
            extractor: FeatureExtractor::from_config(&config),
            classifier: Box::new(HeuristicClassifier::from_config(&config)),
            scorer: BehaviourScorer::new(config),
        }
    }

    /// Replace the classifier, keeping the rest of the pipeline
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ResurfaceConfig {
        self.scorer.config()
    }

    pub fn scorer(&self) -> &BehaviourScorer {
        &self.scorer
    }

    /// Run extraction and classification without building an item
    pub fn classify(&self, event: &CaptureEvent) -> (FeatureVector, ClassificationResult) {
        let features = self.extractor.extract(event);
        let classification = self.classifier.classify(&features);
        (features, classification)
    }

    /// Run the full capture pipeline
    pub fn process_capture(&self, event: &CaptureEvent, now: DateTime<Utc>) -> StoredItem {
        let (features, classification) = self.classify(event);

        // Store exactly the snippet the keyword flags were computed over
        let text = Some(features.snippet).filter(|snippet| !snippet.is_empty());
        let item = ItemFactory::from_capture_with_text(event, text, &classification, now);

        tracing::info!(
            item_id = %item.id,
            trigger = item.trigger.as_str(),
            category = item.category.as_str(),
            stack = item.stack.as_str(),
            "captured item"
        );

        item
    }

    /// Process a capture and upsert the result into `store`
    pub fn ingest<S: ItemStore>(
        &self,
        store: &mut S,
        event: &CaptureEvent,
        now: DateTime<Utc>,
    ) -> StoredItem {
        let item = self.process_capture(event, now);
        store.upsert(item.clone());
        item
    }

    /// Best item of `stack` at `at`
    pub fn suggest<'a>(
        &self,
        stack: Stack,
        at: DateTime<Utc>,
        items: &'a [StoredItem],
    ) -> Option<&'a StoredItem> {
        self.scorer.best_item(stack, at, items)
    }

    /// Best item of every stack at `at`
    pub fn suggest_all<'a>(
        &self,
        at: DateTime<Utc>,
        items: &'a [StoredItem],
    ) -> Vec<(Stack, Option<&'a StoredItem>)> {
        self.scorer.best_items_by_stack(at, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryItemStore;
    use crate::types::{Category, ItemState, TriggerKind};
    use chrono::{Duration, FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
    }

    fn capture(text: &str) -> CaptureEvent {
        let timestamp = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 7, 1, 10, 0, 0)
            .unwrap();
        CaptureEvent::new(timestamp, TriggerKind::ShareAction).with_text(text)
    }

    fn sample_capture_json() -> &'static str {
        r#"{
            "id": "6f1c2a56-3b9e-4d0e-9a51-0c7f6b1e2d3a",
            "timestamp": "2024-07-01T18:30:00+02:00",
            "trigger": "share_action",
            "source_app": "com.apple.mobilesafari",
            "url": "https://www.bbcgoodfood.com/recipes/easy-pancakes",
            "text": "Easy pancakes: 100g flour, 300ml milk"
        }"#
    }

    struct AlwaysQuote;

    impl Classifier for AlwaysQuote {
        fn classify(&self, _features: &FeatureVector) -> ClassificationResult {
            ClassificationResult::new(Category::Quote, 2.0)
        }
    }

    #[test]
    fn test_capture_json_to_item_json() {
        let json = capture_json_to_item_json(sample_capture_json(), now()).unwrap();
        let item: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(item["id"], "6f1c2a56-3b9e-4d0e-9a51-0c7f6b1e2d3a");
        assert_eq!(item["category"], "recipe");
        assert_eq!(item["stack"], "food");
        assert_eq!(item["state"], "fresh");
        assert_eq!(item["times_dismissed"], 0);
        assert_eq!(item["times_acted_on"], 0);
        assert!(item["last_shown_at"].is_null());
        assert_eq!(item["created_at"], "2024-07-01T09:00:00Z");
    }

    #[test]
    fn test_stored_text_is_extracted_snippet() {
        let raw = format!("  {}   ", "a".repeat(800));
        let event = capture(&raw);
        let item = capture_to_item(&event, now());
        let features = FeatureExtractor::default().extract(&event);

        assert_eq!(features.snippet.chars().count(), 500);
        assert_eq!(item.text.as_deref(), Some(features.snippet.as_str()));
    }

    #[test]
    fn test_blank_text_is_stored_as_none() {
        let item = capture_to_item(&capture("   \n  "), now());
        assert_eq!(item.text, None);
    }

    #[test]
    fn test_invalid_capture_json() {
        assert!(capture_json_to_item_json("not valid json", now()).is_err());
    }

    #[test]
    fn test_empty_capture_is_other() {
        let event = CaptureEvent::new(now().fixed_offset(), TriggerKind::QuickSave);
        let item = capture_to_item(&event, now());
        assert_eq!(item.category, Category::None);
        assert_eq!(item.stack, Stack::Other);
    }

    #[test]
    fn test_custom_classifier_seam() {
        let processor = ResurfaceProcessor::new().with_classifier(Box::new(AlwaysQuote));
        let (_, classification) = processor.classify(&capture("anything"));

        assert_eq!(classification.category(), Category::Quote);
        assert_eq!(classification.confidence(), 1.0);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = ResurfaceConfig {
            freshness_horizon_seconds: -1,
            ..Default::default()
        };
        assert!(ResurfaceProcessor::with_config(config).is_err());
    }

    #[test]
    fn test_ingest_then_suggest() {
        let processor = ResurfaceProcessor::new();
        let mut store = InMemoryItemStore::new();

        let lasagna = processor.ingest(&mut store, &capture("500g pasta, 2 cups sauce"), now());
        let squats = processor.ingest(&mut store, &capture("Squats 5x5 at 100kg"), now());
        processor.ingest(&mut store, &capture("nothing special"), now());

        let later = now() + Duration::hours(3);
        let snapshot = store.fetch_all();
        assert_eq!(processor.suggest(Stack::Food, later, &snapshot).map(|i| i.id), Some(lasagna.id));
        assert_eq!(processor.suggest(Stack::Body, later, &snapshot).map(|i| i.id), Some(squats.id));
        assert!(processor.suggest(Stack::Mind, later, &snapshot).is_none());

        // Widget shows the recipe, recording it through the store
        let shown = store.get(lasagna.id).cloned().unwrap().record_shown(later);
        store.upsert(shown);
        let second = processor.ingest(&mut store, &capture("1 tbsp oil, 200g rice"), now());

        let snapshot = store.fetch_all();
        let winner = processor.suggest(Stack::Food, later + Duration::minutes(5), &snapshot);
        assert_eq!(winner.map(|i| i.id), Some(second.id));
        assert_eq!(store.get(lasagna.id).unwrap().state, ItemState::Fresh);
    }

    #[test]
    fn test_best_item_json() {
        let item = capture_to_item(&capture("A long read essay from the newsletter"), now());
        let items_json = serde_json::to_string(&vec![item.clone()]).unwrap();

        let winner = best_item_json(&items_json, "reading", now()).unwrap().unwrap();
        let decoded: StoredItem = serde_json::from_str(&winner).unwrap();
        assert_eq!(decoded, item);

        assert_eq!(best_item_json(&items_json, "food", now()).unwrap(), None);
        assert!(best_item_json(&items_json, "garden", now()).is_err());
    }

    #[test]
    fn test_suggest_all_covers_every_stack() {
        let processor = ResurfaceProcessor::new();
        let items = vec![capture_to_item(&capture("3 sets of 10 reps"), now())];
        let results = processor.suggest_all(now(), &items);

        assert_eq!(results.len(), 5);
        assert!(results
            .iter()
            .any(|(stack, winner)| *stack == Stack::Body && winner.is_some()));
    }
}
