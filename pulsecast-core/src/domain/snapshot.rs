//! Price-history deltas consumed by rebound detection.

use serde::{Deserialize, Serialize};

/// Read-only price/sentiment deltas for one stock, produced by the
/// price-history collaborator. Percent changes are percent points; the
/// absolute drops are dollar amounts (zero when the price rose).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDeltaSnapshot {
    pub symbol: String,
    pub change_1d_pct: f64,
    pub change_3d_pct: f64,
    pub change_7d_pct: f64,
    pub abs_drop_1d: f64,
    pub abs_drop_3d: f64,
    pub current_price: f64,
    /// News sentiment in [-1, 1].
    pub sentiment: f64,
    pub news_count: u32,
}

impl PriceDeltaSnapshot {
    /// Magnitude of the 7-day decline (0 when the stock rose).
    pub fn decline_7d(&self) -> f64 {
        (-self.change_7d_pct).max(0.0)
    }

    /// Any positive price move over the last 1 or 3 days.
    pub fn has_positive_move(&self) -> bool {
        self.change_1d_pct > 0.0 || self.change_3d_pct > 0.0
    }

    pub fn is_finite(&self) -> bool {
        [
            self.change_1d_pct,
            self.change_3d_pct,
            self.change_7d_pct,
            self.abs_drop_1d,
            self.abs_drop_3d,
            self.current_price,
            self.sentiment,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
