//! Resurfacing selection
//!
//! Picks the single stored item worth showing for a stack at a reference time.
//!
//! Every candidate starts from a base score, then:
//! - freshness: `boost_max * max(0, 1 - age / horizon)`
//! - suppression: a large penalty if shown within the recent window
//! - dismissals: `times_dismissed * per_dismissal_penalty`, no floor
//! - actions: `times_acted_on * per_action_boost`, no cap
//! - state: a fixed penalty while the item is `dismissed`
//!
//! Ties go to the higher total, then the earlier `created_at`, then the earlier
//! position in the caller's slice. Scoring only reads items; recording that an
//! item was shown is the caller's job.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::ResurfaceConfig;
use crate::types::{ItemState, Stack, StoredItem};

/// Per-adjustment view of a candidate's score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub item_id: Uuid,
    pub base: f64,
    /// Freshness boost (>= 0)
    pub freshness: f64,
    /// Recently-shown penalty (<= 0)
    pub suppression: f64,
    /// Dismissal penalty (<= 0)
    pub dismissals: f64,
    /// Action boost (>= 0)
    pub actions: f64,
    /// Dismissed-state penalty (<= 0)
    pub state: f64,
    pub total: f64,
}

/// Scorer for stored items
#[derive(Debug, Clone, Default)]
pub struct BehaviourScorer {
    config: ResurfaceConfig,
}

impl BehaviourScorer {
    pub fn new(config: ResurfaceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResurfaceConfig {
        &self.config
    }

    /// Score a single item at `at`
    pub fn score(&self, item: &StoredItem, at: DateTime<Utc>) -> ScoreBreakdown {
        let config = &self.config;

        let base = config.base_score;
        let freshness = freshness_boost(item.created_at, at, config);
        let suppression = if recently_shown(item.last_shown_at, at, config) {
            -config.recent_shown_penalty
        } else {
            0.0
        };
        let dismissals = -(item.times_dismissed as f64 * config.per_dismissal_penalty);
        let actions = item.times_acted_on as f64 * config.per_action_boost;
        let state = match item.state {
            ItemState::Dismissed => -config.dismissed_state_penalty,
            ItemState::Fresh | ItemState::Acted => 0.0,
        };

        ScoreBreakdown {
            item_id: item.id,
            base,
            freshness,
            suppression,
            dismissals,
            actions,
            state,
            total: base + freshness + suppression + dismissals + actions + state,
        }
    }

    /// Select the best item of `stack` at `at`, or `None` if there is none
    pub fn best_item<'a>(
        &self,
        stack: Stack,
        at: DateTime<Utc>,
        items: &'a [StoredItem],
    ) -> Option<&'a StoredItem> {
        let mut best: Option<(&StoredItem, ScoreBreakdown)> = None;

        for item in items.iter().filter(|item| item.stack == stack) {
            let breakdown = self.score(item, at);
            tracing::debug!(
                item_id = %item.id,
                total = breakdown.total,
                freshness = breakdown.freshness,
                suppression = breakdown.suppression,
                "scored candidate"
            );

            let replace = match &best {
                None => true,
                Some((current, current_score)) => {
                    outranks(item, &breakdown, current, current_score) == Ordering::Greater
                }
            };
            if replace {
                best = Some((item, breakdown));
            }
        }

        let (winner, breakdown) = best?;

        if let Some(min_score) = self.config.min_score {
            if breakdown.total < min_score {
                tracing::debug!(
                    stack = stack.as_str(),
                    item_id = %winner.id,
                    total = breakdown.total,
                    min_score,
                    "best candidate below minimum score, withholding"
                );
                return None;
            }
        }

        tracing::debug!(
            stack = stack.as_str(),
            item_id = %winner.id,
            total = breakdown.total,
            "selected item to resurface"
        );
        Some(winner)
    }

    /// All candidates of `stack`, best first, with their breakdowns
    pub fn rank<'a>(
        &self,
        stack: Stack,
        at: DateTime<Utc>,
        items: &'a [StoredItem],
    ) -> Vec<(&'a StoredItem, ScoreBreakdown)> {
        let mut ranked: Vec<(&StoredItem, ScoreBreakdown)> = items
            .iter()
            .filter(|item| item.stack == stack)
            .map(|item| (item, self.score(item, at)))
            .collect();

        // Stable sort keeps slice order for full ties
        ranked.sort_by(|(a, a_score), (b, b_score)| outranks(b, b_score, a, a_score));
        ranked
    }

    /// Best item for every stack
    pub fn best_items_by_stack<'a>(
        &self,
        at: DateTime<Utc>,
        items: &'a [StoredItem],
    ) -> Vec<(Stack, Option<&'a StoredItem>)> {
        Stack::ALL
            .into_iter()
            .map(|stack| (stack, self.best_item(stack, at, items)))
            .collect()
    }
}

/// `Greater` when `a` should be preferred over `b`
fn outranks(
    a: &StoredItem,
    a_score: &ScoreBreakdown,
    b: &StoredItem,
    b_score: &ScoreBreakdown,
) -> Ordering {
    a_score
        .total
        .total_cmp(&b_score.total)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn freshness_boost(created_at: DateTime<Utc>, at: DateTime<Utc>, config: &ResurfaceConfig) -> f64 {
    if config.freshness_horizon_seconds <= 0 {
        return 0.0;
    }
    let age = (at - created_at).num_seconds().max(0) as f64;
    let horizon = config.freshness_horizon_seconds as f64;
    config.freshness_boost_max * (1.0 - age / horizon).max(0.0)
}

/// Shown less than the threshold ago. A future `last_shown_at` counts as recent.
fn recently_shown(
    last_shown_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
    config: &ResurfaceConfig,
) -> bool {
    last_shown_at.is_some_and(|shown| {
        (at - shown).num_seconds() < config.recent_shown_threshold_seconds
    })
}
