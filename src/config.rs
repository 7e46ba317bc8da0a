//! Tunable constants for extraction, classification and scoring
//!
//! Every threshold, penalty and boost lives here so hosts can ship a config
//! file instead of a rebuild. Missing JSON fields fall back to the defaults.

use serde::{Deserialize, Serialize};

use crate::error::ResurfaceError;

/// Default freshness horizon: 7 days
pub const DEFAULT_FRESHNESS_HORIZON_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Default recently-shown window: 24 hours
pub const DEFAULT_RECENT_SHOWN_THRESHOLD_SECONDS: i64 = 24 * 60 * 60;

/// Default snippet cap, in characters
pub const DEFAULT_SNIPPET_MAX_LENGTH: usize = 500;

/// Configuration shared by the pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResurfaceConfig {
    /// Score every candidate starts from
    pub base_score: f64,
    /// Age at which the freshness boost reaches zero
    pub freshness_horizon_seconds: i64,
    /// Freshness boost at age zero
    pub freshness_boost_max: f64,
    /// Items shown more recently than this are suppressed
    pub recent_shown_threshold_seconds: i64,
    pub recent_shown_penalty: f64,
    pub per_dismissal_penalty: f64,
    pub per_action_boost: f64,
    /// Extra penalty for items currently in the dismissed state
    pub dismissed_state_penalty: f64,
    /// Minimum confidence for an actionable category
    pub classification_confidence_floor: f64,
    /// Snippet cap in characters, applied before keyword flags
    pub snippet_max_length: usize,
    /// Withhold a winner scoring below this. Off by default.
    pub min_score: Option<f64>,
}

impl Default for ResurfaceConfig {
    fn default() -> Self {
        Self {
            base_score: 100.0,
            freshness_horizon_seconds: DEFAULT_FRESHNESS_HORIZON_SECONDS,
            freshness_boost_max: 50.0,
            recent_shown_threshold_seconds: DEFAULT_RECENT_SHOWN_THRESHOLD_SECONDS,
            recent_shown_penalty: 1000.0,
            per_dismissal_penalty: 30.0,
            per_action_boost: 10.0,
            dismissed_state_penalty: 20.0,
            classification_confidence_floor: 0.5,
            snippet_max_length: DEFAULT_SNIPPET_MAX_LENGTH,
            min_score: None,
        }
    }
}

impl ResurfaceConfig {
    /// Check that every value is usable by the pipeline
    pub fn validate(&self) -> Result<(), ResurfaceError> {
        let magnitudes = [
            ("freshness_boost_max", self.freshness_boost_max),
            ("recent_shown_penalty", self.recent_shown_penalty),
            ("per_dismissal_penalty", self.per_dismissal_penalty),
            ("per_action_boost", self.per_action_boost),
            ("dismissed_state_penalty", self.dismissed_state_penalty),
        ];

        if !self.base_score.is_finite() {
            return Err(ResurfaceError::InvalidConfig(
                "base_score must be finite".to_string(),
            ));
        }

        for (name, value) in magnitudes {
            if !value.is_finite() || value < 0.0 {
                return Err(ResurfaceError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }

        if self.freshness_horizon_seconds <= 0 {
            return Err(ResurfaceError::InvalidConfig(
                "freshness_horizon_seconds must be positive".to_string(),
            ));
        }

        if self.recent_shown_threshold_seconds < 0 {
            return Err(ResurfaceError::InvalidConfig(
                "recent_shown_threshold_seconds must not be negative".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.classification_confidence_floor) {
            return Err(ResurfaceError::InvalidConfig(format!(
                "classification_confidence_floor must be within [0, 1] (got {})",
                self.classification_confidence_floor
            )));
        }

        if self.snippet_max_length == 0 {
            return Err(ResurfaceError::InvalidConfig(
                "snippet_max_length must be at least 1".to_string(),
            ));
        }

        if let Some(min_score) = self.min_score {
            if !min_score.is_finite() {
                return Err(ResurfaceError::InvalidConfig(
                    "min_score must be finite".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Load and validate a config from JSON
    pub fn from_json(json: &str) -> Result<Self, ResurfaceError> {
        let config: Self = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "rejected resurface config");
            return Err(e);
        }
        Ok(config)
    }

    /// Serialize the config to JSON
    pub fn to_json(&self) -> Result<String, ResurfaceError> {
        serde_json::to_string_pretty(self).map_err(|e| ResurfaceError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResurfaceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.freshness_horizon_seconds, 604_800);
        assert_eq!(config.recent_shown_threshold_seconds, 86_400);
        assert_eq!(config.recent_shown_penalty, 1000.0);
        assert_eq!(config.per_dismissal_penalty, 30.0);
        assert_eq!(config.per_action_boost, 10.0);
        assert_eq!(config.dismissed_state_penalty, 20.0);
        assert_eq!(config.classification_confidence_floor, 0.5);
        assert_eq!(config.min_score, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ResurfaceConfig::from_json(r#"{"per_action_boost": 15.0}"#).unwrap();
        assert_eq!(config.per_action_boost, 15.0);
        assert_eq!(config.per_dismissal_penalty, 30.0);
        assert_eq!(config.snippet_max_length, DEFAULT_SNIPPET_MAX_LENGTH);
    }

    #[test]
    fn test_round_trip() {
        let config = ResurfaceConfig {
            min_score: Some(-50.0),
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(ResurfaceConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ResurfaceConfig::from_json(r#"{"freshness_horizon_seconds": 0}"#).is_err());
        assert!(ResurfaceConfig::from_json(r#"{"per_dismissal_penalty": -1.0}"#).is_err());
        assert!(ResurfaceConfig::from_json(r#"{"classification_confidence_floor": 1.5}"#).is_err());
        assert!(ResurfaceConfig::from_json(r#"{"snippet_max_length": 0}"#).is_err());
        assert!(ResurfaceConfig::from_json(r#"{"recent_shown_threshold_seconds": -5}"#).is_err());
        assert!(ResurfaceConfig::from_json("not json").is_err());
    }
}
