//! Rebound detection: severity tiers, the pattern rule table and the reduction
//! that turns triggered patterns into one [`ReboundEvent`].
//!
//! Each of the nine patterns is an independent rule (see [`patterns::RULES`]),
//! testable in isolation. [`ReboundDetector`] evaluates them all against one
//! [`PriceDeltaSnapshot`](crate::domain::PriceDeltaSnapshot) and combines:
//! maximum confidence across scored patterns, then the news-momentum modifier,
//! then a clamp to [0, 100].

pub mod detector;
pub mod patterns;
pub mod severity;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub use detector::ReboundDetector;
pub use patterns::{PatternHit, ReboundRule, RuleContext, RuleKind, RULES};
pub use severity::severity_score;

/// The nine rebound heuristics, numbered as they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReboundPattern {
    VShaped,
    MultiDayRecovery,
    StrongDailyBounce,
    BullishSentimentRecovery,
    SentimentLed,
    NewsMomentum,
    IntradayReversal,
    LargeDropRecovery,
    MultiDayDropRecovery,
}

impl ReboundPattern {
    pub fn number(&self) -> u8 {
        match self {
            ReboundPattern::VShaped => 1,
            ReboundPattern::MultiDayRecovery => 2,
            ReboundPattern::StrongDailyBounce => 3,
            ReboundPattern::BullishSentimentRecovery => 4,
            ReboundPattern::SentimentLed => 5,
            ReboundPattern::NewsMomentum => 6,
            ReboundPattern::IntradayReversal => 7,
            ReboundPattern::LargeDropRecovery => 8,
            ReboundPattern::MultiDayDropRecovery => 9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReboundPattern::VShaped => "v_shaped",
            ReboundPattern::MultiDayRecovery => "multi_day_recovery",
            ReboundPattern::StrongDailyBounce => "strong_daily_bounce",
            ReboundPattern::BullishSentimentRecovery => "bullish_sentiment_recovery",
            ReboundPattern::SentimentLed => "sentiment_led",
            ReboundPattern::NewsMomentum => "news_momentum",
            ReboundPattern::IntradayReversal => "intraday_reversal",
            ReboundPattern::LargeDropRecovery => "large_drop_recovery",
            ReboundPattern::MultiDayDropRecovery => "multi_day_drop_recovery",
        }
    }

    /// Patterns that count as a "strong price pattern" for the sentiment-led rule.
    pub fn is_price_led(&self) -> bool {
        matches!(
            self,
            ReboundPattern::VShaped
                | ReboundPattern::MultiDayRecovery
                | ReboundPattern::StrongDailyBounce
                | ReboundPattern::IntradayReversal
                | ReboundPattern::LargeDropRecovery
        )
    }
}

impl fmt::Display for ReboundPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.number(), self.name())
    }
}

/// Strength class of a rebound, taken from the winning pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReboundType {
    Strong,
    Moderate,
    Weak,
    None,
}

impl ReboundType {
    /// Ordering key for tie-breaks: higher is stronger.
    pub fn strength(&self) -> u8 {
        match self {
            ReboundType::Strong => 3,
            ReboundType::Moderate => 2,
            ReboundType::Weak => 1,
            ReboundType::None => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReboundType::Strong => "strong",
            ReboundType::Moderate => "moderate",
            ReboundType::Weak => "weak",
            ReboundType::None => "none",
        }
    }
}

impl fmt::Display for ReboundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one detection run for one stock on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReboundEvent {
    pub symbol: String,
    pub date: NaiveDate,
    /// Every pattern whose trigger fired, including the modifier.
    pub triggered_patterns: BTreeSet<ReboundPattern>,
    /// 0–100.
    pub confidence: f64,
    pub severity_score: f64,
    pub rebound_type: ReboundType,
    /// Scored pattern that set the confidence; `None` when nothing scored.
    pub winning_pattern: Option<ReboundPattern>,
}

impl ReboundEvent {
    /// A positive event triggers cache invalidation and regeneration.
    pub fn is_positive(&self) -> bool {
        self.rebound_type != ReboundType::None
    }

    /// Pattern numbers joined with `;` (stable order), for reports.
    pub fn pattern_list(&self) -> String {
        self.triggered_patterns
            .iter()
            .map(|p| p.number().to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_numbers_are_one_through_nine() {
        let numbers: BTreeSet<u8> = RULES.iter().map(|r| r.pattern.number()).collect();
        assert_eq!(numbers, (1..=9).collect());
    }

    #[test]
    fn event_without_type_is_not_positive() {
        let event = ReboundEvent {
            symbol: "X".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            triggered_patterns: [ReboundPattern::NewsMomentum].into_iter().collect(),
            confidence: 0.0,
            severity_score: 0.0,
            rebound_type: ReboundType::None,
            winning_pattern: None,
        };
        assert!(!event.is_positive());
        assert_eq!(event.pattern_list(), "6");
    }

    #[test]
    fn pattern_list_is_sorted_by_number() {
        let event = ReboundEvent {
            symbol: "X".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            triggered_patterns: [
                ReboundPattern::LargeDropRecovery,
                ReboundPattern::VShaped,
                ReboundPattern::MultiDayDropRecovery,
            ]
            .into_iter()
            .collect(),
            confidence: 90.0,
            severity_score: 5.0,
            rebound_type: ReboundType::Strong,
            winning_pattern: Some(ReboundPattern::VShaped),
        };
        assert_eq!(event.pattern_list(), "1;8;9");
    }
}
