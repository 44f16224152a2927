//! Property-based tests for the retry policy and the rebound log.
//!
//! 1. Backoff never exceeds the cap plus its jitter band
//! 2. Without jitter, backoff is non-decreasing in the attempt number
//! 3. The retry loop never runs more than `max_attempts` times
//! 4. The rebound log keeps at most one event per (symbol, day)

use std::collections::BTreeSet;

use chrono::NaiveDate;
use proptest::prelude::*;
use pulsecast_core::{ReboundEvent, ReboundPattern, ReboundType};
use pulsecast_runner::retry::run_with_retry;
use pulsecast_runner::{EngineError, ReboundLog, RetryPolicy};
use rand::rngs::StdRng;
use rand::SeedableRng;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_policy() -> impl Strategy<Value = RetryPolicy> {
    (1u32..6, 1u64..2_000, 1.0f64..4.0, 1u64..60_000, 0.0f64..=1.0).prop_map(
        |(max_attempts, initial, multiplier, max_backoff, jitter)| RetryPolicy {
            max_attempts,
            initial_backoff_ms: initial,
            backoff_multiplier: multiplier,
            max_backoff_ms: max_backoff,
            jitter_pct: jitter,
            task_timeout_secs: 60,
        },
    )
}

fn arb_event() -> impl Strategy<Value = ReboundEvent> {
    (
        prop::sample::select(vec!["NVDA", "META", "AAPL"]),
        0u32..14,
        50.0f64..100.0,
    )
        .prop_map(|(symbol, offset, confidence)| ReboundEvent {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap() + chrono::Days::new(offset as u64),
            triggered_patterns: BTreeSet::from([ReboundPattern::LargeDropRecovery]),
            confidence,
            severity_score: 0.0,
            rebound_type: ReboundType::Strong,
            winning_pattern: Some(ReboundPattern::LargeDropRecovery),
        })
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn backoff_is_bounded(policy in arb_policy(), attempt in 1u32..20, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let delay = policy.backoff(attempt, &mut rng).as_millis() as f64;
        let ceiling = policy.max_backoff_ms as f64 * (1.0 + policy.jitter_pct);
        prop_assert!(delay <= ceiling.ceil(), "{delay} > {ceiling}");
    }

    #[test]
    fn backoff_without_jitter_is_monotonic(policy in arb_policy(), attempt in 1u32..15) {
        let policy = RetryPolicy { jitter_pct: 0.0, ..policy };
        let mut rng = StdRng::seed_from_u64(0);
        let now = policy.backoff(attempt, &mut rng);
        let next = policy.backoff(attempt + 1, &mut rng);
        prop_assert!(next >= now);
    }

    #[test]
    fn retry_never_exceeds_max_attempts(max_attempts in 1u32..6, succeed_on in 1u32..10) {
        let policy = RetryPolicy {
            max_attempts,
            initial_backoff_ms: 0,
            jitter_pct: 0.0,
            ..RetryPolicy::default()
        };
        let mut calls = 0;
        let outcome = run_with_retry(&policy, "prop", |attempt| {
            calls += 1;
            if attempt >= succeed_on {
                Ok(attempt)
            } else {
                Err(EngineError::Computation("not yet".into()))
            }
        });
        prop_assert!(calls <= max_attempts);
        prop_assert_eq!(outcome.attempts, calls);
        prop_assert_eq!(outcome.result.is_ok(), succeed_on <= max_attempts);
    }

    #[test]
    fn rebound_log_keeps_one_event_per_symbol_day(events in prop::collection::vec(arb_event(), 1..40)) {
        let mut log = ReboundLog::new(7);
        for event in events {
            log.record(event);
        }
        let keys: BTreeSet<(NaiveDate, String)> =
            log.events().map(|e| (e.date, e.symbol.clone())).collect();
        prop_assert_eq!(keys.len(), log.len());
        let days: BTreeSet<NaiveDate> = log.events().map(|e| e.date).collect();
        if let (Some(first), Some(last)) = (days.first(), days.last()) {
            prop_assert!((*last - *first).num_days() < 7);
        }
    }
}
