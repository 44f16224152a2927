//! Criterion benchmarks for the scoring hot paths.
//!
//! Benchmarks:
//! 1. Regional normalization of a full market table
//! 2. Prediction aggregation
//! 3. Rebound detection (all nine rules + reduction)

use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pulsecast_core::config::CalibrationConfig;
use pulsecast_core::domain::{
    Horizon, LocalSignal, MarketQuote, PredictionInput, PriceDeltaSnapshot, Region,
};
use pulsecast_core::{PredictionAggregator, ReboundDetector, RegionalNormalizer};

// ── Helpers ──────────────────────────────────────────────────────────

fn quotes(region: Region) -> Vec<MarketQuote> {
    let config = CalibrationConfig::default();
    config
        .regions
        .for_region(region)
        .markets
        .keys()
        .enumerate()
        .map(|(i, symbol)| MarketQuote {
            market_symbol: symbol.clone(),
            region,
            change_percent: (i as f64 * 0.7).sin(),
            is_valid: i % 5 != 4,
            fetched_at: Utc::now(),
        })
        .collect()
}

fn snapshot() -> PriceDeltaSnapshot {
    PriceDeltaSnapshot {
        symbol: "BENCH".into(),
        change_1d_pct: 1.8,
        change_3d_pct: -0.4,
        change_7d_pct: -6.5,
        abs_drop_1d: 7.2,
        abs_drop_3d: 14.0,
        current_price: 142.0,
        sentiment: 0.45,
        news_count: 4,
    }
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let config = CalibrationConfig::default();
    let european = quotes(Region::European);
    c.bench_function("normalize_european", |b| {
        let normalizer = RegionalNormalizer::new(&config);
        b.iter(|| normalizer.normalize(Region::European, black_box(&european)))
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let config = CalibrationConfig::default();
    let normalizer = RegionalNormalizer::new(&config);
    let input = PredictionInput {
        symbol: "BENCH".into(),
        horizon: Horizon::Tomorrow,
        current_price: 142.0,
        asian: normalizer.normalize(Region::Asian, &quotes(Region::Asian)),
        european: normalizer.normalize(Region::European, &quotes(Region::European)),
        local_signal: Some(LocalSignal::new(0.3, -0.1, 0.2)),
    };
    c.bench_function("aggregate", |b| {
        let aggregator = PredictionAggregator::new(&config);
        b.iter(|| aggregator.aggregate(black_box(&input)))
    });
}

fn bench_detect(c: &mut Criterion) {
    let config = CalibrationConfig::default();
    let date = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap_or_default();
    let snapshot = snapshot();
    c.bench_function("rebound_detect", |b| {
        let detector = ReboundDetector::new(&config);
        b.iter(|| detector.detect(black_box(&snapshot), date))
    });
}

criterion_group!(benches, bench_normalize, bench_aggregate, bench_detect);
criterion_main!(benches);
