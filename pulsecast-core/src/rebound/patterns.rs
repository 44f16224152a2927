//! The rebound rule table.
//!
//! One entry per pattern: the pattern id, its kind, and an evaluator that
//! returns the pattern's confidence when its trigger fires. Evaluators read
//! thresholds from [`PatternThresholds`](crate::config::PatternThresholds) only.
//!
//! Rules run in table order. The sentiment-led rule looks at what already
//! fired, so it sits after every price-led rule; the news-momentum modifier
//! sits last.

use crate::config::CalibrationConfig;
use crate::domain::PriceDeltaSnapshot;

use super::{ReboundPattern, ReboundType};

/// Whether a rule produces its own confidence or adjusts the winner's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Scored(ReboundType),
    Modifier,
}

/// A pattern that fired, with its own confidence (0 for the modifier).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternHit {
    pub pattern: ReboundPattern,
    pub kind: RuleKind,
    pub confidence: f64,
}

/// Everything an evaluator may read.
pub struct RuleContext<'a> {
    pub snapshot: &'a PriceDeltaSnapshot,
    pub severity: f64,
    pub config: &'a CalibrationConfig,
    /// Hits from rules earlier in the table.
    pub prior: &'a [PatternHit],
}

pub struct ReboundRule {
    pub pattern: ReboundPattern,
    pub kind: RuleKind,
    pub evaluate: fn(&RuleContext<'_>) -> Option<f64>,
}

impl std::fmt::Debug for ReboundRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReboundRule")
            .field("pattern", &self.pattern)
            .field("kind", &self.kind)
            .finish()
    }
}

pub const RULES: &[ReboundRule] = &[
    ReboundRule {
        pattern: ReboundPattern::VShaped,
        kind: RuleKind::Scored(ReboundType::Strong),
        evaluate: v_shaped,
    },
    ReboundRule {
        pattern: ReboundPattern::MultiDayRecovery,
        kind: RuleKind::Scored(ReboundType::Strong),
        evaluate: multi_day_recovery,
    },
    ReboundRule {
        pattern: ReboundPattern::StrongDailyBounce,
        kind: RuleKind::Scored(ReboundType::Strong),
        evaluate: strong_daily_bounce,
    },
    ReboundRule {
        pattern: ReboundPattern::BullishSentimentRecovery,
        kind: RuleKind::Scored(ReboundType::Moderate),
        evaluate: bullish_sentiment_recovery,
    },
    ReboundRule {
        pattern: ReboundPattern::IntradayReversal,
        kind: RuleKind::Scored(ReboundType::Strong),
        evaluate: intraday_reversal,
    },
    ReboundRule {
        pattern: ReboundPattern::LargeDropRecovery,
        kind: RuleKind::Scored(ReboundType::Strong),
        evaluate: large_drop_recovery,
    },
    ReboundRule {
        pattern: ReboundPattern::MultiDayDropRecovery,
        kind: RuleKind::Scored(ReboundType::Moderate),
        evaluate: multi_day_drop_recovery,
    },
    ReboundRule {
        pattern: ReboundPattern::SentimentLed,
        kind: RuleKind::Scored(ReboundType::Weak),
        evaluate: sentiment_led,
    },
    ReboundRule {
        pattern: ReboundPattern::NewsMomentum,
        kind: RuleKind::Modifier,
        evaluate: news_momentum,
    },
];

/// Look up a rule by pattern.
pub fn rule(pattern: ReboundPattern) -> Option<&'static ReboundRule> {
    RULES.iter().find(|r| r.pattern == pattern)
}

// ─── Evaluators ──────────────────────────────────────────────────────

fn v_shaped(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.v_shaped;
    let s = ctx.snapshot;
    (s.decline_7d() > p.min_decline_7d && s.change_3d_pct > p.min_gain_3d && s.change_1d_pct > 0.0)
        .then(|| (p.base + ctx.severity).min(p.cap))
}

fn multi_day_recovery(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.multi_day_recovery;
    let s = ctx.snapshot;
    (s.change_3d_pct > p.min_gain_3d && s.change_1d_pct > p.min_gain_1d)
        .then(|| p.base + p.severity_factor * ctx.severity)
}

fn strong_daily_bounce(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.strong_daily_bounce;
    let s = ctx.snapshot;
    (s.change_1d_pct > p.min_gain_1d).then(|| {
        let bonus = if s.sentiment > p.sentiment_above {
            p.sentiment_bonus
        } else {
            0.0
        };
        p.base + ctx.severity + bonus
    })
}

fn bullish_sentiment_recovery(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.bullish_sentiment_recovery;
    let s = ctx.snapshot;
    (s.decline_7d() > p.min_decline_7d
        && s.change_1d_pct > p.min_gain_1d
        && s.sentiment > p.sentiment_above)
        .then(|| {
            (p.base
                + s.sentiment * p.sentiment_factor
                + s.decline_7d() * p.decline_factor
                + ctx.severity)
                .min(p.cap)
        })
}

fn sentiment_led(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.sentiment_led;
    let s = ctx.snapshot;
    let price_led_fired = ctx.prior.iter().any(|hit| hit.pattern.is_price_led());
    (s.sentiment > p.sentiment_above && s.decline_7d() > p.min_decline_7d && !price_led_fired)
        .then(|| {
            let bonus = if s.has_positive_move() {
                p.price_move_bonus
            } else {
                0.0
            };
            p.base + s.sentiment * p.sentiment_factor + bonus
        })
}

/// Modifier: fires, but carries no confidence of its own.
fn news_momentum(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.news_momentum;
    let s = ctx.snapshot;
    (s.news_count >= p.min_articles && s.sentiment > p.sentiment_above).then_some(0.0)
}

fn intraday_reversal(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.intraday_reversal;
    let s = ctx.snapshot;
    (s.change_1d_pct > p.min_gain_1d && s.change_3d_pct < 0.0)
        .then(|| p.base + p.severity_factor * ctx.severity)
}

/// Stabilization counts: a flat day after a large drop still fires.
fn large_drop_recovery(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.large_drop_recovery;
    let s = ctx.snapshot;
    if !(s.abs_drop_1d > p.min_drop_1d && s.change_1d_pct >= 0.0 && s.sentiment >= 0.0) {
        return None;
    }
    let core = (p.base + s.abs_drop_1d * p.drop_factor).min(p.cap);
    let recovery_boost = p
        .recovery_boosts
        .iter()
        .find(|b| s.change_1d_pct > b.above)
        .map(|b| b.boost)
        .unwrap_or(p.stabilization_boost);
    let (sentiment_bonus, cap) = if s.sentiment > p.sentiment_above {
        (p.sentiment_bonus, p.sentiment_cap)
    } else {
        (0.0, p.cap)
    };
    Some((core + recovery_boost + sentiment_bonus).min(cap))
}

fn multi_day_drop_recovery(ctx: &RuleContext<'_>) -> Option<f64> {
    let p = &ctx.config.rebound.patterns.multi_day_drop_recovery;
    let s = ctx.snapshot;
    (s.abs_drop_3d > p.min_drop_3d && s.change_1d_pct > 0.0)
        .then(|| (p.base + s.abs_drop_3d * p.drop_factor).min(p.cap))
}
