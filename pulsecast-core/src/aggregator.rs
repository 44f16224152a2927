//! Prediction aggregation: regional impacts + local signal into one forecast.
//!
//! Each component is normalized to [-1, 1] before weighting:
//! - regional components are `tanh(impact_percent / impact_saturation_pct)`;
//! - the local component is the configured blend of the three local sub-scores.
//!
//! ```text
//! raw_score  = w_eu × european + w_asia × asian + w_local × local
//! change %   = raw_score × horizon scale
//! confidence = (base + |raw_score| × span) × completeness + agreement bonus
//! ```
//!
//! Completeness is the weighted average of each component's data ratio
//! (`valid_markets / total_markets`, and 1 or the configured fallback for the
//! local signal). Deterministic: identical input always yields an identical
//! result, which the prediction cache depends on.

use crate::config::CalibrationConfig;
use crate::domain::{
    ContributingFactor, DataFlag, Direction, FactorSource, LocalSignal, PredictionInput,
    PredictionResult, RegionalAggregate,
};
use crate::error::ScoringError;
use crate::explain::{top_reasons, trade_signals, ExplainContext};
use crate::local::local_impact_percent;

/// Fuses regional and local signals. Holds only a borrowed, validated config.
#[derive(Debug, Clone, Copy)]
pub struct PredictionAggregator<'a> {
    config: &'a CalibrationConfig,
}

impl<'a> PredictionAggregator<'a> {
    pub fn new(config: &'a CalibrationConfig) -> Self {
        Self { config }
    }

    /// Aggregate one input. Degraded data lowers confidence and sets flags;
    /// only non-finite numbers or a blank symbol are rejected.
    pub fn aggregate(&self, input: &PredictionInput) -> Result<PredictionResult, ScoringError> {
        validate_input(input)?;
        let agg = &self.config.aggregation;
        let regions = &self.config.regions;

        let european = regional_component(&input.european, regions.european.impact_saturation_pct);
        let asian = regional_component(&input.asian, regions.asian.impact_saturation_pct);
        let local = input
            .local_signal
            .as_ref()
            .map(|s| self.local_component(s))
            .unwrap_or(0.0);

        let contributing_factors = vec![
            factor(FactorSource::European, european, agg.european_weight),
            factor(FactorSource::Asian, asian, agg.asian_weight),
            factor(FactorSource::Local, local, agg.local_weight),
        ];
        let raw_score: f64 = contributing_factors.iter().map(|f| f.contribution).sum();
        let scale = self.config.horizons.get(input.horizon).scale_pct;
        let predicted_change_percent = raw_score * scale;
        let direction = Direction::from_change(predicted_change_percent, agg.flat_epsilon_pct);

        let mut flags = Vec::new();
        if !input.asian.has_data() {
            flags.push(DataFlag::AsianMarketsUnavailable);
        }
        if !input.european.has_data() {
            flags.push(DataFlag::EuropeanMarketsUnavailable);
        }
        let local_completeness = if input.local_signal.is_some() {
            1.0
        } else {
            flags.push(DataFlag::LocalSignalMissing);
            agg.local_missing_completeness
        };

        let completeness = agg.european_weight * input.european.completeness()
            + agg.asian_weight * input.asian.completeness()
            + agg.local_weight * local_completeness;

        // A missing local signal contributes 0 and so never agrees.
        let components = [european, asian, local];
        let agreement =
            components.iter().all(|v| *v > 0.0) || components.iter().all(|v| *v < 0.0);

        let mut confidence = (agg.base_confidence + raw_score.abs() * agg.conviction_span)
            * completeness;
        if agreement {
            confidence += agg.agreement_bonus;
        }

        let correction_warning = input
            .local_signal
            .as_ref()
            .and_then(|s| s.correction_warning.clone());
        if correction_warning.is_some() && direction == Direction::Up {
            confidence -= agg.correction_confidence_penalty;
        }
        let confidence = confidence.clamp(0.0, 100.0);

        let predicted_price = if input.current_price > 0.0 {
            Some(input.current_price * (1.0 + predicted_change_percent / 100.0))
        } else {
            flags.push(DataFlag::PriceUnavailable);
            None
        };

        let explain = ExplainContext {
            direction,
            confidence,
            european,
            asian,
            local: input.local_signal.as_ref(),
        };
        let signals = trade_signals(&explain, &self.config.explain);
        let top_reasons = top_reasons(&explain, &self.config.explain);

        if !flags.is_empty() {
            tracing::debug!(
                symbol = %input.symbol,
                horizon = %input.horizon,
                ?flags,
                "aggregated with degraded inputs"
            );
        }

        Ok(PredictionResult {
            symbol: input.symbol.clone(),
            horizon: input.horizon,
            direction,
            predicted_change_percent,
            confidence,
            contributing_factors,
            predicted_price,
            local_impact_percent: if input.local_signal.is_some() {
                local_impact_percent(local, &self.config.local.impact)
            } else {
                0.0
            },
            correction_warning,
            flags,
            signals,
            top_reasons,
        })
    }

    /// Blend of the three local sub-scores, each clamped to [-1, 1].
    fn local_component(&self, signal: &LocalSignal) -> f64 {
        let mix = &self.config.aggregation.local_mix;
        (mix.technical * signal.technical_score.clamp(-1.0, 1.0)
            + mix.sentiment * signal.sentiment_score.clamp(-1.0, 1.0)
            + mix.momentum * signal.momentum.clamp(-1.0, 1.0))
        .clamp(-1.0, 1.0)
    }
}

fn regional_component(aggregate: &RegionalAggregate, saturation_pct: f64) -> f64 {
    if !aggregate.has_data() {
        return 0.0;
    }
    (aggregate.impact_percent / saturation_pct).tanh()
}

fn factor(source: FactorSource, value: f64, weight: f64) -> ContributingFactor {
    ContributingFactor {
        source,
        value,
        weight,
        contribution: value * weight,
    }
}

fn validate_input(input: &PredictionInput) -> Result<(), ScoringError> {
    if input.symbol.trim().is_empty() {
        return Err(ScoringError::malformed(&input.symbol, "empty symbol"));
    }
    if !input.current_price.is_finite() {
        return Err(ScoringError::malformed(&input.symbol, "current_price is not finite"));
    }
    for agg in [&input.asian, &input.european] {
        if !agg.impact_percent.is_finite() || !agg.influence_score.is_finite() {
            return Err(ScoringError::malformed(
                &input.symbol,
                format!("{} aggregate is not finite", agg.region),
            ));
        }
        if agg.valid_markets > agg.total_markets {
            return Err(ScoringError::malformed(
                &input.symbol,
                format!("{} aggregate has more valid than total markets", agg.region),
            ));
        }
    }
    if let Some(signal) = &input.local_signal {
        if !signal.is_finite() {
            return Err(ScoringError::malformed(&input.symbol, "local signal is not finite"));
        }
    }
    Ok(())
}
