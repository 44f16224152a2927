//! Overbought / correction-risk warning.
//!
//! Three independent checks, any of which may fire:
//! 1. 7-day surge combined with an extreme RSI.
//! 2. Close stretched far above the Bollinger middle band.
//! 3. Volume spike during a 7-day surge.
//!
//! The combined warning takes the highest severity and the highest confidence,
//! and lists every reason.

use crate::config::CorrectionConfig;
use crate::domain::{CorrectionWarning, WarningSeverity};
use crate::local::LocalFeatures;

struct Check {
    severity: WarningSeverity,
    reason: String,
    confidence: f64,
}

/// Run all checks; `None` when nothing fires.
pub fn detect_correction(
    features: &LocalFeatures,
    config: &CorrectionConfig,
) -> Option<CorrectionWarning> {
    let mut checks = Vec::new();
    let surge = features.price_change_7d > config.gain_7d_pct;

    if surge && features.rsi > config.rsi_threshold {
        let severity = if features.rsi > config.rsi_high {
            WarningSeverity::High
        } else {
            WarningSeverity::Medium
        };
        checks.push(Check {
            severity,
            reason: format!(
                "price up {:.1}% in 7 days with RSI {:.0}",
                features.price_change_7d, features.rsi
            ),
            confidence: (config.rsi_confidence_base
                + (features.rsi - config.rsi_confidence_pivot) * config.rsi_confidence_slope)
                .min(config.rsi_confidence_cap),
        });
    }

    if let Some(z) = features.bollinger.and_then(|bb| bb.zscore()) {
        if z > config.bb_zscore {
            let severity = if z > config.bb_zscore_high {
                WarningSeverity::High
            } else {
                WarningSeverity::Medium
            };
            checks.push(Check {
                severity,
                reason: format!("Bollinger z-score {z:.1} (overbought)"),
                confidence: (z / config.bb_full_confidence_zscore * 100.0)
                    .min(config.bb_confidence_cap),
            });
        }
    }

    if surge && features.volume_ratio > config.volume_spike_ratio {
        checks.push(Check {
            severity: WarningSeverity::Medium,
            reason: format!(
                "unusual volume ({:.1}x avg) with price spike",
                features.volume_ratio
            ),
            confidence: config.volume_spike_confidence,
        });
    }

    let severity = checks.iter().map(|c| c.severity).max()?;
    let confidence = checks.iter().map(|c| c.confidence).fold(0.0, f64::max);
    Some(CorrectionWarning {
        severity,
        reasons: checks.into_iter().map(|c| c.reason).collect(),
        confidence: confidence.clamp(0.0, 100.0),
    })
}
