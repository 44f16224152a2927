//! Local (stock-specific) signal derivation from raw indicator features.
//!
//! Produces the three sub-scores the aggregator blends into its local
//! component, plus the correction warning when one fires.

use serde::{Deserialize, Serialize};

use crate::config::{CorrectionConfig, ImpactBands, LocalConfig};
use crate::correction::detect_correction;
use crate::domain::{IndicatorReadings, LocalSignal};

/// Bollinger band reading for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerSnapshot {
    pub close: f64,
    pub middle: f64,
    /// Upper minus lower band.
    pub width: f64,
}

impl BollingerSnapshot {
    /// Distance from the middle band in half-widths; `None` for a degenerate band.
    pub fn zscore(&self) -> Option<f64> {
        if self.width > 0.0 && self.width.is_finite() {
            Some((self.close - self.middle) / (self.width / 2.0))
        } else {
            None
        }
    }
}

/// Raw per-stock indicator features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalFeatures {
    pub rsi: f64,
    pub macd: f64,
    /// Today's volume over its moving average.
    pub volume_ratio: f64,
    pub intraday_change_pct: f64,
    /// Raw (unbounded) news sentiment score.
    pub news_sentiment: f64,
    pub price_change_1d: f64,
    pub price_change_7d: f64,
    /// US index influence in roughly [-1, 1].
    pub us_market_influence: f64,
    pub bollinger: Option<BollingerSnapshot>,
    /// Articles behind `news_sentiment`.
    pub news_count: u32,
}

impl Default for LocalFeatures {
    fn default() -> Self {
        Self {
            rsi: 50.0,
            macd: 0.0,
            volume_ratio: 1.0,
            intraday_change_pct: 0.0,
            news_sentiment: 0.0,
            price_change_1d: 0.0,
            price_change_7d: 0.0,
            us_market_influence: 0.0,
            bollinger: None,
            news_count: 0,
        }
    }
}

/// Derive a [`LocalSignal`] from raw features.
pub fn derive_local_signal(
    features: &LocalFeatures,
    local: &LocalConfig,
    correction: &CorrectionConfig,
) -> LocalSignal {
    LocalSignal {
        technical_score: technical_score(features, local),
        sentiment_score: sentiment_score(features, local),
        momentum: momentum(features, local),
        correction_warning: detect_correction(features, correction),
        readings: Some(IndicatorReadings {
            rsi: features.rsi,
            volume_ratio: features.volume_ratio,
            news_count: features.news_count,
        }),
    }
}

fn technical_score(f: &LocalFeatures, c: &LocalConfig) -> f64 {
    let rsi = if f.rsi < c.rsi_oversold {
        c.rsi_strong_score
    } else if f.rsi > c.rsi_overbought {
        -c.rsi_strong_score
    } else if f.rsi < c.rsi_soft_oversold {
        c.rsi_soft_score
    } else if f.rsi > c.rsi_soft_overbought {
        -c.rsi_soft_score
    } else {
        0.0
    };
    (rsi + f.macd.tanh() * c.macd_factor).clamp(-1.0, 1.0)
}

/// News sentiment, damped when the day's price move contradicts it.
fn sentiment_score(f: &LocalFeatures, c: &LocalConfig) -> f64 {
    let score = (f.news_sentiment / c.news_scale).tanh() * c.news_factor;
    let contradicted = (f.price_change_1d < -c.contradiction_move_pct
        && score > c.contradiction_sentiment)
        || (f.price_change_1d > c.contradiction_move_pct && score < -c.contradiction_sentiment);
    let score = if contradicted {
        score * c.contradiction_factor
    } else {
        score
    };
    score.clamp(-1.0, 1.0)
}

fn momentum(f: &LocalFeatures, c: &LocalConfig) -> f64 {
    let intraday = (f.intraday_change_pct / c.intraday_scale).tanh() * c.intraday_factor;
    let volume = if f.volume_ratio > c.volume_high_ratio {
        c.volume_high_score
    } else if f.volume_ratio > c.volume_mid_ratio {
        c.volume_mid_score
    } else if f.volume_ratio < c.volume_low_ratio {
        c.volume_low_score
    } else {
        0.0
    };
    let us = if f.us_market_influence.abs() > c.us_market_trend_band {
        (f.us_market_influence * c.us_market_amplify).clamp(-c.us_market_cap, c.us_market_cap)
    } else {
        f.us_market_influence * c.us_market_dampen
    };
    let own = (intraday + volume) / 2.0;
    (us * c.us_market_share + own * (1.0 - c.us_market_share)).clamp(-1.0, 1.0)
}

/// Reported impact (%) of a local score of either sign, banded by magnitude.
pub fn local_impact_percent(score: f64, bands: &ImpactBands) -> f64 {
    let magnitude = score.abs();
    let impact = if magnitude > bands.strong_above {
        bands.strong_base_pct + (magnitude - bands.strong_above) * bands.strong_slope
    } else if magnitude > bands.moderate_above {
        bands.moderate_base_pct + (magnitude - bands.moderate_above) * bands.moderate_slope
    } else if magnitude > 0.0 {
        bands.weak_base_pct + magnitude * bands.weak_slope
    } else {
        bands.neutral_pct
    };
    impact.clamp(0.0, bands.max_pct)
}
