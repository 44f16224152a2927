//! Property tests for scoring invariants.
//!
//! Uses proptest to verify:
//! 1. Confidence bounds: every aggregation yields confidence in [0, 100]
//! 2. Determinism: identical input always yields an identical result
//! 3. Direction: always the dead-banded sign of the predicted change
//! 4. Neutral normalization: no usable quote means zero influence
//! 5. Rebound bounds: confidence in [0, 100], severity within tier caps

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use pulsecast_core::config::CalibrationConfig;
use pulsecast_core::domain::{
    Direction, Horizon, LocalSignal, MarketQuote, PredictionInput, PriceDeltaSnapshot, Region,
    RegionalAggregate,
};
use pulsecast_core::{PredictionAggregator, ReboundDetector, ReboundType, RegionalNormalizer};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_horizon() -> impl Strategy<Value = Horizon> {
    prop_oneof![
        Just(Horizon::Today),
        Just(Horizon::Tomorrow),
        Just(Horizon::Week),
        Just(Horizon::Month),
    ]
}

fn arb_aggregate(region: Region) -> impl Strategy<Value = RegionalAggregate> {
    (-20.0..20.0_f64, 0usize..=4, 0usize..=4).prop_map(move |(impact, a, b)| {
        let (valid, total) = if a <= b { (a, b) } else { (b, a) };
        if valid == 0 {
            RegionalAggregate::neutral(region, total)
        } else {
            RegionalAggregate {
                region,
                avg_change_percent: impact,
                influence_score: impact,
                impact_percent: impact,
                valid_markets: valid,
                total_markets: total,
                sentiment_label: None,
                sentiment_confidence: None,
            }
        }
    })
}

fn arb_local() -> impl Strategy<Value = Option<LocalSignal>> {
    prop::option::of(
        (-3.0..3.0_f64, -3.0..3.0_f64, -3.0..3.0_f64)
            .prop_map(|(t, s, m)| LocalSignal::new(t, s, m)),
    )
}

fn arb_input() -> impl Strategy<Value = PredictionInput> {
    (
        arb_horizon(),
        0.0..2000.0_f64,
        arb_aggregate(Region::Asian),
        arb_aggregate(Region::European),
        arb_local(),
    )
        .prop_map(|(horizon, price, asian, european, local_signal)| PredictionInput {
            symbol: "PROP".into(),
            horizon,
            current_price: price,
            asian,
            european,
            local_signal,
        })
}

fn arb_snapshot() -> impl Strategy<Value = PriceDeltaSnapshot> {
    (
        (-15.0..15.0_f64, -20.0..20.0_f64, -30.0..30.0_f64),
        (0.0..60.0_f64, 0.0..120.0_f64),
        (1.0..1500.0_f64, -1.0..1.0_f64, 0u32..10),
    )
        .prop_map(
            |((d1, d3, d7), (drop1, drop3), (price, sentiment, news_count))| PriceDeltaSnapshot {
                symbol: "PROP".into(),
                change_1d_pct: d1,
                change_3d_pct: d3,
                change_7d_pct: d7,
                abs_drop_1d: drop1,
                abs_drop_3d: drop3,
                current_price: price,
                sentiment,
                news_count,
            },
        )
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 16).unwrap()
}

// ── 1–3. Aggregation ─────────────────────────────────────────────────

proptest! {
    /// Confidence never leaves [0, 100], whatever the input quality.
    #[test]
    fn confidence_is_bounded(input in arb_input()) {
        let config = CalibrationConfig::default();
        let result = PredictionAggregator::new(&config).aggregate(&input).unwrap();
        prop_assert!((0.0..=100.0).contains(&result.confidence));
    }

    /// Aggregation is a pure function of its input.
    #[test]
    fn aggregation_is_deterministic(input in arb_input()) {
        let config = CalibrationConfig::default();
        let agg = PredictionAggregator::new(&config);
        let a = agg.aggregate(&input).unwrap();
        let b = agg.aggregate(&input.clone()).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Direction is the sign of the predicted change with the flat dead band.
    #[test]
    fn direction_matches_change(input in arb_input()) {
        let config = CalibrationConfig::default();
        let eps = config.aggregation.flat_epsilon_pct;
        let result = PredictionAggregator::new(&config).aggregate(&input).unwrap();
        let expected = if result.predicted_change_percent > eps {
            Direction::Up
        } else if result.predicted_change_percent < -eps {
            Direction::Down
        } else {
            Direction::Flat
        };
        prop_assert_eq!(result.direction, expected);
    }

    /// Factor contributions add up to the raw score the change was scaled from.
    #[test]
    fn contributions_reconstruct_change(input in arb_input()) {
        let config = CalibrationConfig::default();
        let result = PredictionAggregator::new(&config).aggregate(&input).unwrap();
        let raw: f64 = result.contributing_factors.iter().map(|f| f.contribution).sum();
        let scale = config.horizons.get(input.horizon).scale_pct;
        prop_assert!((raw * scale - result.predicted_change_percent).abs() < 1e-9);
        for factor in &result.contributing_factors {
            prop_assert!((-1.0..=1.0).contains(&factor.value));
        }
    }
}

// ── 4. Normalization ─────────────────────────────────────────────────

proptest! {
    /// With zero valid quotes the aggregate is neutral, whatever the raw values.
    #[test]
    fn no_valid_quotes_is_neutral(changes in prop::collection::vec(-10.0..10.0_f64, 0..6)) {
        let config = CalibrationConfig::default();
        let quotes: Vec<MarketQuote> = changes
            .iter()
            .map(|c| MarketQuote {
                market_symbol: "^GDAXI".into(),
                region: Region::European,
                change_percent: *c,
                is_valid: false,
                fetched_at: Utc::now(),
            })
            .collect();
        let agg = RegionalNormalizer::new(&config).normalize(Region::European, &quotes);
        prop_assert_eq!(agg.avg_change_percent, 0.0);
        prop_assert_eq!(agg.influence_score, 0.0);
        prop_assert_eq!(agg.impact_percent, 0.0);
        prop_assert_eq!(agg.valid_markets, 0);
        prop_assert_eq!(agg.total_markets, changes.len());
    }
}

// ── 5. Rebound detection ─────────────────────────────────────────────

proptest! {
    /// Confidence is bounded and only positive events carry one.
    #[test]
    fn rebound_confidence_is_bounded(snapshot in arb_snapshot()) {
        let config = CalibrationConfig::default();
        let event = ReboundDetector::new(&config).detect(&snapshot, day()).unwrap();
        prop_assert!((0.0..=100.0).contains(&event.confidence));
        if event.rebound_type == ReboundType::None {
            prop_assert_eq!(event.confidence, 0.0);
            prop_assert!(event.winning_pattern.is_none());
        } else {
            prop_assert!(event.winning_pattern.is_some());
        }
    }

    /// Severity never exceeds the sum of the selected tier's caps (55 at most).
    #[test]
    fn severity_is_capped(snapshot in arb_snapshot()) {
        let config = CalibrationConfig::default();
        let severity = ReboundDetector::new(&config).severity(&snapshot);
        prop_assert!((0.0..=55.0).contains(&severity));
        if snapshot.current_price <= 20.0 {
            prop_assert_eq!(severity, 0.0);
        }
    }

    /// Detection is deterministic.
    #[test]
    fn detection_is_deterministic(snapshot in arb_snapshot()) {
        let config = CalibrationConfig::default();
        let detector = ReboundDetector::new(&config);
        prop_assert_eq!(
            detector.detect(&snapshot, day()).unwrap(),
            detector.detect(&snapshot, day()).unwrap()
        );
    }
}
