//! Reduction of triggered patterns into one [`ReboundEvent`].

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::config::CalibrationConfig;
use crate::domain::PriceDeltaSnapshot;
use crate::error::ScoringError;

use super::patterns::{PatternHit, RuleContext, RuleKind, RULES};
use super::severity::severity_score;
use super::{ReboundEvent, ReboundPattern, ReboundType};

/// Stateless detector over a validated calibration.
#[derive(Debug, Clone, Copy)]
pub struct ReboundDetector<'a> {
    config: &'a CalibrationConfig,
}

impl<'a> ReboundDetector<'a> {
    pub fn new(config: &'a CalibrationConfig) -> Self {
        Self { config }
    }

    /// Severity score for the snapshot's price tier.
    pub fn severity(&self, snapshot: &PriceDeltaSnapshot) -> f64 {
        severity_score(snapshot, &self.config.rebound.severity_tiers)
    }

    /// Run every rule in table order and return the ones that fired.
    pub fn evaluate(&self, snapshot: &PriceDeltaSnapshot) -> Vec<PatternHit> {
        let severity = self.severity(snapshot);
        let mut hits: Vec<PatternHit> = Vec::new();
        for rule in RULES {
            let ctx = RuleContext {
                snapshot,
                severity,
                config: self.config,
                prior: &hits,
            };
            if let Some(confidence) = (rule.evaluate)(&ctx) {
                hits.push(PatternHit {
                    pattern: rule.pattern,
                    kind: rule.kind,
                    confidence,
                });
            }
        }
        hits
    }

    /// Detect a rebound for `snapshot` on `date`.
    ///
    /// The event is always returned; callers act on it only when
    /// [`ReboundEvent::is_positive`] holds.
    pub fn detect(
        &self,
        snapshot: &PriceDeltaSnapshot,
        date: NaiveDate,
    ) -> Result<ReboundEvent, ScoringError> {
        validate_snapshot(snapshot)?;
        let severity_score = self.severity(snapshot);
        let hits = self.evaluate(snapshot);
        let triggered_patterns: BTreeSet<ReboundPattern> =
            hits.iter().map(|h| h.pattern).collect();

        let winner = winning_hit(&hits);
        let (confidence, rebound_type, winning_pattern) = match winner {
            Some((hit, rebound_type)) => {
                let mut confidence = hit.confidence;
                if triggered_patterns.contains(&ReboundPattern::NewsMomentum) {
                    confidence = self.apply_news_momentum(confidence, rebound_type);
                }
                (confidence.clamp(0.0, 100.0), rebound_type, Some(hit.pattern))
            }
            None => (0.0, ReboundType::None, None),
        };

        Ok(ReboundEvent {
            symbol: snapshot.symbol.clone(),
            date,
            triggered_patterns,
            confidence,
            severity_score,
            rebound_type,
            winning_pattern,
        })
    }

    /// +bonus on a strong winner, floor on a weak one, moderate unchanged.
    fn apply_news_momentum(&self, confidence: f64, winner: ReboundType) -> f64 {
        let p = &self.config.rebound.patterns.news_momentum;
        match winner {
            ReboundType::Strong => confidence + p.strong_bonus,
            ReboundType::Weak => confidence.max(p.weak_floor),
            ReboundType::Moderate | ReboundType::None => confidence,
        }
    }
}

/// Highest confidence among scored hits; ties go to the stronger type, then
/// the lower pattern number.
fn winning_hit(hits: &[PatternHit]) -> Option<(&PatternHit, ReboundType)> {
    hits.iter()
        .filter_map(|hit| match hit.kind {
            RuleKind::Scored(rebound_type) => Some((hit, rebound_type)),
            RuleKind::Modifier => None,
        })
        .max_by(|(a, a_type), (b, b_type)| {
            a.confidence
                .total_cmp(&b.confidence)
                .then(a_type.strength().cmp(&b_type.strength()))
                .then(b.pattern.number().cmp(&a.pattern.number()))
        })
}

fn validate_snapshot(snapshot: &PriceDeltaSnapshot) -> Result<(), ScoringError> {
    if snapshot.symbol.trim().is_empty() {
        return Err(ScoringError::malformed(&snapshot.symbol, "empty symbol"));
    }
    if !snapshot.is_finite() {
        return Err(ScoringError::malformed(
            &snapshot.symbol,
            "price deltas contain a non-finite value",
        ));
    }
    if snapshot.abs_drop_1d < 0.0 || snapshot.abs_drop_3d < 0.0 {
        return Err(ScoringError::malformed(
            &snapshot.symbol,
            "absolute drops must be non-negative",
        ));
    }
    Ok(())
}
