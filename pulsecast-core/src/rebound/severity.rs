//! Severity score from absolute-dollar drops, tiered by current price.
//!
//! Tiers are mutually exclusive: the first tier (highest price first) whose
//! `above_price` the stock exceeds is the only one applied. Within a tier every
//! rule contributes `points` per whole `step` of drop beyond `threshold`,
//! capped per rule.

use crate::config::{DropWindow, SeverityRule, SeverityTier};
use crate::domain::PriceDeltaSnapshot;

pub fn severity_score(snapshot: &PriceDeltaSnapshot, tiers: &[SeverityTier]) -> f64 {
    tiers
        .iter()
        .find(|tier| snapshot.current_price > tier.above_price)
        .map(|tier| tier.rules.iter().map(|rule| rule_points(snapshot, rule)).sum())
        .unwrap_or(0.0)
}

fn rule_points(snapshot: &PriceDeltaSnapshot, rule: &SeverityRule) -> f64 {
    let drop = match rule.window {
        DropWindow::OneDay => snapshot.abs_drop_1d,
        DropWindow::ThreeDay => snapshot.abs_drop_3d,
    };
    let steps = ((drop - rule.threshold).max(0.0) / rule.step).floor();
    (steps * rule.points).min(rule.cap)
}
