//! Resurface - On-device capture classification and resurfacing engine
//!
//! Resurface turns raw captures (a link, a text snippet, an image) into
//! classified, storable items through a deterministic pipeline:
//! feature extraction → classification → item construction.
//!
//! Later, on demand, the scorer picks the single stored item worth showing for
//! a stack at a given moment, favouring fresh items and suppressing ones that
//! were shown recently or keep getting dismissed.
//!
//! Every stage is a pure, synchronous function over in-memory values. Storage
//! and presentation belong to the host.

pub mod classifier;
pub mod config;
pub mod error;
pub mod factory;
pub mod features;
pub mod pipeline;
pub mod scorer;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{Classifier, HeuristicClassifier};
pub use config::ResurfaceConfig;
pub use error::ResurfaceError;
pub use factory::ItemFactory;
pub use features::FeatureExtractor;
pub use pipeline::{best_item_json, capture_json_to_item_json, capture_to_item, ResurfaceProcessor};
pub use scorer::{BehaviourScorer, ScoreBreakdown};
pub use store::{InMemoryItemStore, ItemStore};
pub use types::{
    CaptureEvent, Category, ClassificationResult, FeatureVector, ItemState, Stack, StoredItem,
    TimeBucket, TriggerKind,
};

/// Resurface version
pub const RESURFACE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "resurface";
