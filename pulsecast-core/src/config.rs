//! Calibration configuration: every weight, threshold and scale in one place.
//!
//! Nothing in the scoring modules carries an inline calibration literal; they all
//! read from [`CalibrationConfig`]. The struct deserializes from TOML with every
//! section optional, so a partial file overrides only the values it names.
//!
//! [`CalibrationConfig::validate`] is run once at startup. Scoring functions
//! assume a validated config and do not re-check invariants per call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::domain::{Horizon, Region};

/// Tolerance for the aggregation weights summing to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Tolerance for a region's market weight table summing to 100.
const MARKET_TABLE_TOLERANCE: f64 = 1e-6;

/// Longest cache lifetime any entry may be configured with (one week).
pub const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration errors, raised at load/validation time only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("aggregation weights must sum to 1.0 (got {sum})")]
    WeightSum { sum: f64 },

    #[error("{region} market weights must sum to 100 (got {sum})")]
    MarketTableSum { region: String, sum: f64 },

    #[error("severity tiers must be ordered highest price first ({above} follows {previous})")]
    TierOrder { previous: f64, above: f64 },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Root calibration configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CalibrationConfig {
    pub aggregation: AggregationConfig,
    pub horizons: HorizonConfig,
    pub regions: RegionsConfig,
    pub european_sentiment: SentimentThresholds,
    pub rebound: ReboundConfig,
    pub local: LocalConfig,
    pub correction: CorrectionConfig,
    pub explain: ExplainConfig,
}

impl CalibrationConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string. Unknown tables (e.g. `[engine]`) are ignored.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize back to TOML (used by `config show`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every structural invariant of the calibration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.aggregation.validate()?;
        self.horizons.validate()?;
        self.regions.asian.validate(Region::Asian)?;
        self.regions.european.validate(Region::European)?;
        self.rebound.validate()?;
        self.european_sentiment.validate()?;
        self.local.validate()?;
        self.correction.validate()?;
        self.explain.validate()
    }

    /// Content hash of the whole calibration (BLAKE3 over canonical JSON).
    pub fn fingerprint(&self) -> String {
        params_hash(self)
    }
}

/// BLAKE3 hex digest of a value's JSON serialization.
///
/// Used for parameterised cache keys: identical parameters always hash identically.
pub fn params_hash<T: Serialize + ?Sized>(value: &T) -> String {
    let json = serde_json::to_vec(value).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.into(),
            reason: format!("must be a positive finite number (got {value})"),
        })
    }
}

/// A confidence-like value on the 0–100 scale.
fn percent(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.into(),
            reason: format!("must lie in [0, 100] (got {value})"),
        })
    }
}

fn unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.into(),
            reason: format!("must lie in [0, 1] (got {value})"),
        })
    }
}

fn ordered(field: &str, low: f64, high: f64) -> Result<(), ConfigError> {
    if low <= high {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.into(),
            reason: format!("{low} must not exceed {high}"),
        })
    }
}

fn ttl(field: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 || secs > MAX_TTL_SECS {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            reason: format!("must lie in 1..={MAX_TTL_SECS} seconds (got {secs})"),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.into(),
            reason: format!("must be a non-negative finite number (got {value})"),
        })
    }
}

// ─── Aggregation ─────────────────────────────────────────────────────

/// Weights and confidence constants for the prediction aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub european_weight: f64,
    pub asian_weight: f64,
    pub local_weight: f64,
    /// |predicted change %| at or below this is `flat`.
    pub flat_epsilon_pct: f64,
    /// Confidence of a zero-conviction prediction with complete data.
    pub base_confidence: f64,
    /// Extra confidence at |raw_score| = 1.
    pub conviction_span: f64,
    /// Added when all three components share the same sign.
    pub agreement_bonus: f64,
    /// Completeness credited to the local component when the signal is missing.
    pub local_missing_completeness: f64,
    /// Subtracted when a correction warning contradicts an `up` call.
    pub correction_confidence_penalty: f64,
    pub local_mix: LocalMix,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            european_weight: 0.50,
            asian_weight: 0.20,
            local_weight: 0.30,
            flat_epsilon_pct: 0.05,
            base_confidence: 40.0,
            conviction_span: 50.0,
            agreement_bonus: 10.0,
            local_missing_completeness: 0.5,
            correction_confidence_penalty: 10.0,
            local_mix: LocalMix::default(),
        }
    }
}

impl AggregationConfig {
    pub fn weight_sum(&self) -> f64 {
        self.european_weight + self.asian_weight + self.local_weight
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, w) in [
            ("aggregation.european_weight", self.european_weight),
            ("aggregation.asian_weight", self.asian_weight),
            ("aggregation.local_weight", self.local_weight),
        ] {
            non_negative(field, w)?;
        }
        let sum = self.weight_sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        non_negative("aggregation.flat_epsilon_pct", self.flat_epsilon_pct)?;
        non_negative("aggregation.base_confidence", self.base_confidence)?;
        non_negative("aggregation.conviction_span", self.conviction_span)?;
        non_negative("aggregation.agreement_bonus", self.agreement_bonus)?;
        non_negative(
            "aggregation.correction_confidence_penalty",
            self.correction_confidence_penalty,
        )?;
        unit_interval(
            "aggregation.local_missing_completeness",
            self.local_missing_completeness,
        )?;
        self.local_mix.validate()
    }
}

/// How the three local sub-scores blend into the local component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalMix {
    pub technical: f64,
    pub sentiment: f64,
    pub momentum: f64,
}

impl Default for LocalMix {
    fn default() -> Self {
        Self {
            technical: 0.40,
            sentiment: 0.35,
            momentum: 0.25,
        }
    }
}

impl LocalMix {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("aggregation.local_mix.technical", self.technical)?;
        non_negative("aggregation.local_mix.sentiment", self.sentiment)?;
        non_negative("aggregation.local_mix.momentum", self.momentum)?;
        let sum = self.technical + self.sentiment + self.momentum;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidValue {
                field: "aggregation.local_mix".into(),
                reason: format!("must sum to 1.0 (got {sum})"),
            });
        }
        Ok(())
    }
}

// ─── Horizons ────────────────────────────────────────────────────────

/// Scale and cache lifetime for one forecast horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonCalibration {
    /// Predicted change (%) at |raw_score| = 1.
    pub scale_pct: f64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    pub today: HorizonCalibration,
    pub tomorrow: HorizonCalibration,
    pub week: HorizonCalibration,
    pub month: HorizonCalibration,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            today: HorizonCalibration { scale_pct: 1.5, ttl_secs: 60 },
            tomorrow: HorizonCalibration { scale_pct: 2.5, ttl_secs: 300 },
            week: HorizonCalibration { scale_pct: 5.0, ttl_secs: 300 },
            month: HorizonCalibration { scale_pct: 10.0, ttl_secs: 300 },
        }
    }
}

impl HorizonConfig {
    pub fn get(&self, horizon: Horizon) -> &HorizonCalibration {
        match horizon {
            Horizon::Today => &self.today,
            Horizon::Tomorrow => &self.tomorrow,
            Horizon::Week => &self.week,
            Horizon::Month => &self.month,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for horizon in Horizon::ALL {
            let cal = self.get(horizon);
            positive(&format!("horizons.{horizon}.scale_pct"), cal.scale_pct)?;
            ttl(&format!("horizons.{horizon}.ttl_secs"), cal.ttl_secs)?;
        }
        Ok(())
    }
}

// ─── Regions ─────────────────────────────────────────────────────────

/// Per-region weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Share (%) of the final prediction this region may contribute.
    pub weight_pct: f64,
    /// Impact (%) that maps to a fully saturated component (tanh scale).
    pub impact_saturation_pct: f64,
    /// Market symbol → weight. Sums to 100 within the region.
    pub markets: BTreeMap<String, f64>,
}

impl RegionConfig {
    pub fn market_weight(&self, market_symbol: &str) -> f64 {
        self.markets.get(market_symbol).copied().unwrap_or(0.0)
    }

    fn validate(&self, region: Region) -> Result<(), ConfigError> {
        positive(&format!("regions.{region}.weight_pct"), self.weight_pct)?;
        positive(
            &format!("regions.{region}.impact_saturation_pct"),
            self.impact_saturation_pct,
        )?;
        for (market, w) in &self.markets {
            non_negative(&format!("regions.{region}.markets.{market}"), *w)?;
        }
        let sum: f64 = self.markets.values().sum();
        if (sum - 100.0).abs() > MARKET_TABLE_TOLERANCE {
            return Err(ConfigError::MarketTableSum {
                region: region.to_string(),
                sum,
            });
        }
        Ok(())
    }
}

fn market_table(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionsConfig {
    pub asian: RegionConfig,
    pub european: RegionConfig,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            asian: RegionConfig {
                weight_pct: 20.0,
                impact_saturation_pct: 0.4,
                markets: market_table(&[
                    ("^N225", 30.0),
                    ("^HSI", 25.0),
                    ("000001.SS", 25.0),
                    ("^NSEI", 20.0),
                ]),
            },
            european: RegionConfig {
                weight_pct: 50.0,
                impact_saturation_pct: 1.0,
                markets: market_table(&[
                    ("^FTSE", 25.0),
                    ("^GDAXI", 30.0),
                    ("^FCHI", 20.0),
                    ("^STOXX50E", 25.0),
                ]),
            },
        }
    }
}

impl RegionsConfig {
    pub fn for_region(&self, region: Region) -> &RegionConfig {
        match region {
            Region::Asian => &self.asian,
            Region::European => &self.european,
        }
    }
}

/// Influence-score thresholds for the European sentiment label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentThresholds {
    /// `influence_score` above this is bullish.
    pub bullish_above: f64,
    /// `influence_score` below this is bearish.
    pub bearish_below: f64,
    /// |influence_score| at which label confidence saturates.
    pub strong_move: f64,
    /// Label confidence of a zero move with complete data.
    pub base_confidence: f64,
    /// Extra label confidence at a saturated move.
    pub confidence_span: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            bullish_above: 0.3,
            bearish_below: -0.3,
            strong_move: 1.5,
            base_confidence: 50.0,
            confidence_span: 50.0,
        }
    }
}

impl SentimentThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        ordered("european_sentiment", self.bearish_below, self.bullish_above)?;
        positive("european_sentiment.strong_move", self.strong_move)?;
        percent("european_sentiment.base_confidence", self.base_confidence)?;
        percent("european_sentiment.confidence_span", self.confidence_span)
    }
}

// ─── Rebound ─────────────────────────────────────────────────────────

/// Which absolute-dollar drop a severity rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropWindow {
    OneDay,
    ThreeDay,
}

/// `points` per whole `step` dollars of drop beyond `threshold`, capped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityRule {
    pub window: DropWindow,
    pub threshold: f64,
    pub step: f64,
    pub points: f64,
    pub cap: f64,
}

/// Rules applying when `current_price > above_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityTier {
    pub above_price: f64,
    pub rules: Vec<SeverityRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReboundConfig {
    /// Days a ReboundEvent is retained before eviction.
    pub retention_days: u32,
    /// Highest price band first; the first matching band is the only one applied.
    pub severity_tiers: Vec<SeverityTier>,
    pub patterns: PatternThresholds,
}

impl Default for ReboundConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            severity_tiers: vec![
                SeverityTier {
                    above_price: 100.0,
                    rules: vec![
                        SeverityRule {
                            window: DropWindow::OneDay,
                            threshold: 5.0,
                            step: 5.0,
                            points: 5.0,
                            cap: 25.0,
                        },
                        SeverityRule {
                            window: DropWindow::ThreeDay,
                            threshold: 10.0,
                            step: 10.0,
                            points: 10.0,
                            cap: 30.0,
                        },
                    ],
                },
                SeverityTier {
                    above_price: 50.0,
                    rules: vec![SeverityRule {
                        window: DropWindow::OneDay,
                        threshold: 0.0,
                        step: 3.0,
                        points: 5.0,
                        cap: 20.0,
                    }],
                },
                SeverityTier {
                    above_price: 20.0,
                    rules: vec![SeverityRule {
                        window: DropWindow::OneDay,
                        threshold: 0.0,
                        step: 1.0,
                        points: 3.0,
                        cap: 15.0,
                    }],
                },
            ],
            patterns: PatternThresholds::default(),
        }
    }
}

impl ReboundConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rebound.retention_days".into(),
                reason: "must be > 0".into(),
            });
        }
        for pair in self.severity_tiers.windows(2) {
            if pair[1].above_price >= pair[0].above_price {
                return Err(ConfigError::TierOrder {
                    previous: pair[0].above_price,
                    above: pair[1].above_price,
                });
            }
        }
        for tier in &self.severity_tiers {
            for rule in &tier.rules {
                let field = format!("rebound.severity_tiers[{}]", tier.above_price);
                positive(&format!("{field}.step"), rule.step)?;
                non_negative(&format!("{field}.threshold"), rule.threshold)?;
                non_negative(&format!("{field}.points"), rule.points)?;
                non_negative(&format!("{field}.cap"), rule.cap)?;
            }
        }
        self.patterns.validate()
    }
}

/// Thresholds for the nine rebound patterns. Percentages are percent points
/// (`3.0` = 3%), declines are magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PatternThresholds {
    pub v_shaped: VShaped,
    pub multi_day_recovery: MultiDayRecovery,
    pub strong_daily_bounce: StrongDailyBounce,
    pub bullish_sentiment_recovery: BullishSentimentRecovery,
    pub sentiment_led: SentimentLed,
    pub news_momentum: NewsMomentum,
    pub intraday_reversal: IntradayReversal,
    pub large_drop_recovery: LargeDropRecovery,
    pub multi_day_drop_recovery: MultiDayDropRecovery,
}

impl PatternThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.v_shaped;
        let m = &self.multi_day_recovery;
        let b = &self.strong_daily_bounce;
        let r = &self.bullish_sentiment_recovery;
        let s = &self.sentiment_led;
        let n = &self.news_momentum;
        let i = &self.intraday_reversal;
        let l = &self.large_drop_recovery;
        let d = &self.multi_day_drop_recovery;

        for (field, value) in [
            ("v_shaped.base", v.base),
            ("v_shaped.cap", v.cap),
            ("multi_day_recovery.base", m.base),
            ("strong_daily_bounce.base", b.base),
            ("bullish_sentiment_recovery.base", r.base),
            ("bullish_sentiment_recovery.cap", r.cap),
            ("sentiment_led.base", s.base),
            ("news_momentum.weak_floor", n.weak_floor),
            ("intraday_reversal.base", i.base),
            ("large_drop_recovery.base", l.base),
            ("large_drop_recovery.cap", l.cap),
            ("large_drop_recovery.sentiment_cap", l.sentiment_cap),
            ("multi_day_drop_recovery.base", d.base),
            ("multi_day_drop_recovery.cap", d.cap),
        ] {
            percent(&format!("rebound.patterns.{field}"), value)?;
        }

        for (field, value) in [
            ("v_shaped.min_decline_7d", v.min_decline_7d),
            ("v_shaped.min_gain_3d", v.min_gain_3d),
            ("multi_day_recovery.min_gain_3d", m.min_gain_3d),
            ("multi_day_recovery.min_gain_1d", m.min_gain_1d),
            ("multi_day_recovery.severity_factor", m.severity_factor),
            ("strong_daily_bounce.min_gain_1d", b.min_gain_1d),
            ("strong_daily_bounce.sentiment_bonus", b.sentiment_bonus),
            ("bullish_sentiment_recovery.min_decline_7d", r.min_decline_7d),
            ("bullish_sentiment_recovery.min_gain_1d", r.min_gain_1d),
            ("bullish_sentiment_recovery.sentiment_factor", r.sentiment_factor),
            ("bullish_sentiment_recovery.decline_factor", r.decline_factor),
            ("sentiment_led.min_decline_7d", s.min_decline_7d),
            ("sentiment_led.sentiment_factor", s.sentiment_factor),
            ("sentiment_led.price_move_bonus", s.price_move_bonus),
            ("news_momentum.strong_bonus", n.strong_bonus),
            ("intraday_reversal.min_gain_1d", i.min_gain_1d),
            ("intraday_reversal.severity_factor", i.severity_factor),
            ("large_drop_recovery.min_drop_1d", l.min_drop_1d),
            ("large_drop_recovery.drop_factor", l.drop_factor),
            ("large_drop_recovery.sentiment_bonus", l.sentiment_bonus),
            ("large_drop_recovery.stabilization_boost", l.stabilization_boost),
            ("multi_day_drop_recovery.min_drop_3d", d.min_drop_3d),
            ("multi_day_drop_recovery.drop_factor", d.drop_factor),
        ] {
            non_negative(&format!("rebound.patterns.{field}"), value)?;
        }

        for (field, value) in [
            ("strong_daily_bounce.sentiment_above", b.sentiment_above),
            ("bullish_sentiment_recovery.sentiment_above", r.sentiment_above),
            ("sentiment_led.sentiment_above", s.sentiment_above),
            ("news_momentum.sentiment_above", n.sentiment_above),
            ("large_drop_recovery.sentiment_above", l.sentiment_above),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: format!("rebound.patterns.{field}"),
                    reason: "must be finite".into(),
                });
            }
        }

        for (k, step) in l.recovery_boosts.iter().enumerate() {
            let field = format!("rebound.patterns.large_drop_recovery.recovery_boosts[{k}]");
            non_negative(&format!("{field}.boost"), step.boost)?;
            if !step.above.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{field}.above"),
                    reason: "must be finite".into(),
                });
            }
        }
        for pair in l.recovery_boosts.windows(2) {
            ordered(
                "rebound.patterns.large_drop_recovery.recovery_boosts",
                pair[1].above,
                pair[0].above,
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VShaped {
    pub min_decline_7d: f64,
    pub min_gain_3d: f64,
    pub base: f64,
    pub cap: f64,
}

impl Default for VShaped {
    fn default() -> Self {
        Self { min_decline_7d: 3.0, min_gain_3d: 1.0, base: 80.0, cap: 95.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiDayRecovery {
    pub min_gain_3d: f64,
    pub min_gain_1d: f64,
    pub base: f64,
    pub severity_factor: f64,
}

impl Default for MultiDayRecovery {
    fn default() -> Self {
        Self { min_gain_3d: 2.0, min_gain_1d: 0.5, base: 75.0, severity_factor: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrongDailyBounce {
    pub min_gain_1d: f64,
    pub base: f64,
    pub sentiment_above: f64,
    pub sentiment_bonus: f64,
}

impl Default for StrongDailyBounce {
    fn default() -> Self {
        Self { min_gain_1d: 2.5, base: 70.0, sentiment_above: 0.2, sentiment_bonus: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BullishSentimentRecovery {
    pub min_decline_7d: f64,
    pub min_gain_1d: f64,
    pub sentiment_above: f64,
    pub base: f64,
    pub sentiment_factor: f64,
    pub decline_factor: f64,
    pub cap: f64,
}

impl Default for BullishSentimentRecovery {
    fn default() -> Self {
        Self {
            min_decline_7d: 2.0,
            min_gain_1d: 0.3,
            sentiment_above: 0.3,
            base: 60.0,
            sentiment_factor: 30.0,
            decline_factor: 2.0,
            cap: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentLed {
    pub sentiment_above: f64,
    pub min_decline_7d: f64,
    pub base: f64,
    pub sentiment_factor: f64,
    pub price_move_bonus: f64,
}

impl Default for SentimentLed {
    fn default() -> Self {
        Self {
            sentiment_above: 0.4,
            min_decline_7d: 3.0,
            base: 50.0,
            sentiment_factor: 30.0,
            price_move_bonus: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsMomentum {
    pub min_articles: u32,
    pub sentiment_above: f64,
    pub strong_bonus: f64,
    pub weak_floor: f64,
}

impl Default for NewsMomentum {
    fn default() -> Self {
        Self { min_articles: 3, sentiment_above: 0.4, strong_bonus: 5.0, weak_floor: 60.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntradayReversal {
    pub min_gain_1d: f64,
    pub base: f64,
    pub severity_factor: f64,
}

impl Default for IntradayReversal {
    fn default() -> Self {
        Self { min_gain_1d: 1.5, base: 70.0, severity_factor: 0.7 }
    }
}

/// One step of the large-drop recovery boost: `boost` when 1d change > `above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryBoost {
    pub above: f64,
    pub boost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LargeDropRecovery {
    pub min_drop_1d: f64,
    pub base: f64,
    pub drop_factor: f64,
    pub cap: f64,
    /// Cap when the sentiment bonus applies.
    pub sentiment_cap: f64,
    pub sentiment_above: f64,
    pub sentiment_bonus: f64,
    /// Checked in order; the first whose `above` is exceeded wins.
    pub recovery_boosts: Vec<RecoveryBoost>,
    /// Boost for a flat (stabilized) day.
    pub stabilization_boost: f64,
}

impl Default for LargeDropRecovery {
    fn default() -> Self {
        Self {
            min_drop_1d: 5.0,
            base: 65.0,
            drop_factor: 2.0,
            cap: 90.0,
            sentiment_cap: 95.0,
            sentiment_above: 0.3,
            sentiment_bonus: 20.0,
            recovery_boosts: vec![
                RecoveryBoost { above: 2.0, boost: 20.0 },
                RecoveryBoost { above: 0.5, boost: 10.0 },
                RecoveryBoost { above: 0.1, boost: 5.0 },
            ],
            stabilization_boost: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiDayDropRecovery {
    pub min_drop_3d: f64,
    pub base: f64,
    pub drop_factor: f64,
    pub cap: f64,
}

impl Default for MultiDayDropRecovery {
    fn default() -> Self {
        Self { min_drop_3d: 10.0, base: 60.0, drop_factor: 1.5, cap: 88.0 }
    }
}

// ─── Local signal & correction ───────────────────────────────────────

/// Constants for deriving a local signal from raw indicator features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_soft_oversold: f64,
    pub rsi_soft_overbought: f64,
    pub rsi_strong_score: f64,
    pub rsi_soft_score: f64,
    pub macd_factor: f64,
    /// Raw news score divisor before tanh.
    pub news_scale: f64,
    pub news_factor: f64,
    /// 1-day move (%) beyond which contradicting sentiment is damped.
    pub contradiction_move_pct: f64,
    pub contradiction_sentiment: f64,
    /// Multiplier applied to contradicted sentiment.
    pub contradiction_factor: f64,
    pub intraday_scale: f64,
    pub intraday_factor: f64,
    /// Volume ratio bands: above `volume_high_ratio` scores `volume_high_score`,
    /// above `volume_mid_ratio` scores `volume_mid_score`, below
    /// `volume_low_ratio` scores `volume_low_score`.
    pub volume_high_ratio: f64,
    pub volume_high_score: f64,
    pub volume_mid_ratio: f64,
    pub volume_mid_score: f64,
    pub volume_low_ratio: f64,
    pub volume_low_score: f64,
    /// Share of the momentum score taken by the US-market influence.
    pub us_market_share: f64,
    /// |influence| beyond which the US factor is amplified instead of damped.
    pub us_market_trend_band: f64,
    pub us_market_amplify: f64,
    pub us_market_dampen: f64,
    pub us_market_cap: f64,
    pub impact: ImpactBands,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_soft_oversold: 40.0,
            rsi_soft_overbought: 60.0,
            rsi_strong_score: 0.7,
            rsi_soft_score: 0.3,
            macd_factor: 0.4,
            news_scale: 5.0,
            news_factor: 0.8,
            contradiction_move_pct: 2.0,
            contradiction_sentiment: 0.2,
            contradiction_factor: 0.5,
            intraday_scale: 3.0,
            intraday_factor: 0.5,
            volume_high_ratio: 1.5,
            volume_high_score: 0.6,
            volume_mid_ratio: 1.2,
            volume_mid_score: 0.3,
            volume_low_ratio: 0.8,
            volume_low_score: -0.2,
            us_market_share: 0.4,
            us_market_trend_band: 0.2,
            us_market_amplify: 1.2,
            us_market_dampen: 0.8,
            us_market_cap: 0.9,
            impact: ImpactBands::default(),
        }
    }
}

impl LocalConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ordered("local.rsi_oversold", self.rsi_oversold, self.rsi_soft_oversold)?;
        ordered("local.rsi_soft_oversold", self.rsi_soft_oversold, self.rsi_soft_overbought)?;
        ordered("local.rsi_soft_overbought", self.rsi_soft_overbought, self.rsi_overbought)?;
        unit_interval("local.rsi_strong_score", self.rsi_strong_score)?;
        unit_interval("local.rsi_soft_score", self.rsi_soft_score)?;
        non_negative("local.macd_factor", self.macd_factor)?;
        positive("local.news_scale", self.news_scale)?;
        non_negative("local.news_factor", self.news_factor)?;
        non_negative("local.contradiction_move_pct", self.contradiction_move_pct)?;
        non_negative("local.contradiction_sentiment", self.contradiction_sentiment)?;
        unit_interval("local.contradiction_factor", self.contradiction_factor)?;
        positive("local.intraday_scale", self.intraday_scale)?;
        non_negative("local.intraday_factor", self.intraday_factor)?;
        ordered("local.volume_low_ratio", self.volume_low_ratio, self.volume_mid_ratio)?;
        ordered("local.volume_mid_ratio", self.volume_mid_ratio, self.volume_high_ratio)?;
        for (field, value) in [
            ("local.volume_high_score", self.volume_high_score),
            ("local.volume_mid_score", self.volume_mid_score),
            ("local.volume_low_score", self.volume_low_score),
        ] {
            if !(value.is_finite() && (-1.0..=1.0).contains(&value)) {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    reason: format!("must lie in [-1, 1] (got {value})"),
                });
            }
        }
        unit_interval("local.us_market_share", self.us_market_share)?;
        non_negative("local.us_market_trend_band", self.us_market_trend_band)?;
        non_negative("local.us_market_amplify", self.us_market_amplify)?;
        non_negative("local.us_market_dampen", self.us_market_dampen)?;
        unit_interval("local.us_market_cap", self.us_market_cap)?;
        self.impact.validate()
    }
}

/// Bands mapping |local score| to a reported impact (%).
///
/// Zero scores report `neutral_pct`. Above zero, the weak band starts at
/// `weak_base_pct`; past `moderate_above` and `strong_above` the moderate and
/// strong bands take over. Each band grows linearly with its own slope from
/// its lower edge. The result is clamped to `[0, max_pct]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactBands {
    pub neutral_pct: f64,
    pub weak_base_pct: f64,
    pub weak_slope: f64,
    pub moderate_above: f64,
    pub moderate_base_pct: f64,
    pub moderate_slope: f64,
    pub strong_above: f64,
    pub strong_base_pct: f64,
    pub strong_slope: f64,
    pub max_pct: f64,
}

impl Default for ImpactBands {
    fn default() -> Self {
        Self {
            neutral_pct: 1.0,
            weak_base_pct: 2.0,
            weak_slope: 10.0,
            moderate_above: 0.3,
            moderate_base_pct: 4.0,
            moderate_slope: 10.0,
            strong_above: 0.5,
            strong_base_pct: 6.0,
            strong_slope: 4.0,
            max_pct: 10.0,
        }
    }
}

impl ImpactBands {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("local.impact.moderate_above", self.moderate_above)?;
        ordered("local.impact.moderate_above", self.moderate_above, self.strong_above)?;
        ordered("local.impact.strong_above", self.strong_above, 1.0)?;
        positive("local.impact.max_pct", self.max_pct)?;
        for (field, value) in [
            ("local.impact.neutral_pct", self.neutral_pct),
            ("local.impact.weak_base_pct", self.weak_base_pct),
            ("local.impact.weak_slope", self.weak_slope),
            ("local.impact.moderate_base_pct", self.moderate_base_pct),
            ("local.impact.moderate_slope", self.moderate_slope),
            ("local.impact.strong_base_pct", self.strong_base_pct),
            ("local.impact.strong_slope", self.strong_slope),
        ] {
            non_negative(field, value)?;
        }
        Ok(())
    }
}

/// Thresholds for the overbought correction warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub gain_7d_pct: f64,
    pub rsi_threshold: f64,
    pub rsi_high: f64,
    pub bb_zscore: f64,
    pub bb_zscore_high: f64,
    pub volume_spike_ratio: f64,
    /// Fixed confidence (0–100) of the volume-spike warning.
    pub volume_spike_confidence: f64,
    /// RSI check confidence: `base + (rsi - pivot) × slope`, capped.
    pub rsi_confidence_base: f64,
    pub rsi_confidence_pivot: f64,
    pub rsi_confidence_slope: f64,
    pub rsi_confidence_cap: f64,
    /// Bollinger z-score worth 100 confidence before the cap.
    pub bb_full_confidence_zscore: f64,
    pub bb_confidence_cap: f64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            gain_7d_pct: 10.0,
            rsi_threshold: 80.0,
            rsi_high: 85.0,
            bb_zscore: 2.0,
            bb_zscore_high: 2.5,
            volume_spike_ratio: 2.0,
            volume_spike_confidence: 65.0,
            rsi_confidence_base: 50.0,
            rsi_confidence_pivot: 70.0,
            rsi_confidence_slope: 2.0,
            rsi_confidence_cap: 90.0,
            bb_full_confidence_zscore: 3.0,
            bb_confidence_cap: 85.0,
        }
    }
}

impl CorrectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("correction.gain_7d_pct", self.gain_7d_pct)?;
        ordered("correction.rsi_threshold", self.rsi_threshold, self.rsi_high)?;
        positive("correction.bb_zscore", self.bb_zscore)?;
        ordered("correction.bb_zscore", self.bb_zscore, self.bb_zscore_high)?;
        non_negative("correction.volume_spike_ratio", self.volume_spike_ratio)?;
        percent("correction.volume_spike_confidence", self.volume_spike_confidence)?;
        percent("correction.rsi_confidence_base", self.rsi_confidence_base)?;
        non_negative("correction.rsi_confidence_pivot", self.rsi_confidence_pivot)?;
        non_negative("correction.rsi_confidence_slope", self.rsi_confidence_slope)?;
        percent("correction.rsi_confidence_cap", self.rsi_confidence_cap)?;
        positive("correction.bb_full_confidence_zscore", self.bb_full_confidence_zscore)?;
        percent("correction.bb_confidence_cap", self.bb_confidence_cap)
    }
}

// ─── Explanations ────────────────────────────────────────────────────

/// Thresholds for the trade signals and top reasons attached to a result.
/// Confidences are on the result's 0–100 scale; scores are local sub-scores
/// in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    pub max_signals: usize,
    pub max_reasons: usize,

    /// Directional calls: very strong needs aligned local scores too.
    pub very_strong_confidence: f64,
    pub strong_confidence: f64,
    pub moderate_confidence: f64,
    pub aligned_technical: f64,
    pub aligned_sentiment: f64,

    pub rsi_extreme_overbought: f64,
    pub rsi_overbought: f64,
    pub rsi_extreme_oversold: f64,
    pub rsi_oversold: f64,

    pub volume_exceptional_ratio: f64,
    pub volume_high_ratio: f64,

    /// News-driven call: |sentiment| above this with more than `news_min_articles`.
    pub news_sentiment: f64,
    pub news_min_articles: u32,

    pub reason_technical_strong: f64,
    pub reason_technical_moderate: f64,
    pub reason_sentiment_strong: f64,
    pub reason_sentiment_slight: f64,
    pub reason_sentiment_min_articles: u32,
    /// |regional component| beyond which the region is cited.
    pub reason_regional_strength: f64,
    pub reason_volume_ratio: f64,
    pub reason_rsi_oversold: f64,
    pub reason_rsi_overbought: f64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            max_signals: 5,
            max_reasons: 3,
            very_strong_confidence: 80.0,
            strong_confidence: 70.0,
            moderate_confidence: 60.0,
            aligned_technical: 0.6,
            aligned_sentiment: 0.4,
            rsi_extreme_overbought: 80.0,
            rsi_overbought: 75.0,
            rsi_extreme_oversold: 20.0,
            rsi_oversold: 25.0,
            volume_exceptional_ratio: 2.5,
            volume_high_ratio: 1.8,
            news_sentiment: 0.7,
            news_min_articles: 5,
            reason_technical_strong: 0.7,
            reason_technical_moderate: 0.4,
            reason_sentiment_strong: 0.6,
            reason_sentiment_slight: 0.3,
            reason_sentiment_min_articles: 3,
            reason_regional_strength: 0.2,
            reason_volume_ratio: 1.5,
            reason_rsi_oversold: 30.0,
            reason_rsi_overbought: 70.0,
        }
    }
}

impl ExplainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        percent("explain.moderate_confidence", self.moderate_confidence)?;
        percent("explain.very_strong_confidence", self.very_strong_confidence)?;
        ordered("explain.moderate_confidence", self.moderate_confidence, self.strong_confidence)?;
        ordered("explain.strong_confidence", self.strong_confidence, self.very_strong_confidence)?;
        ordered("explain.rsi_extreme_oversold", self.rsi_extreme_oversold, self.rsi_oversold)?;
        ordered("explain.rsi_overbought", self.rsi_overbought, self.rsi_extreme_overbought)?;
        ordered("explain.volume_high_ratio", self.volume_high_ratio, self.volume_exceptional_ratio)?;
        ordered(
            "explain.reason_technical_moderate",
            self.reason_technical_moderate,
            self.reason_technical_strong,
        )?;
        ordered(
            "explain.reason_sentiment_slight",
            self.reason_sentiment_slight,
            self.reason_sentiment_strong,
        )?;
        ordered(
            "explain.reason_rsi_oversold",
            self.reason_rsi_oversold,
            self.reason_rsi_overbought,
        )?;
        for (field, value) in [
            ("explain.aligned_technical", self.aligned_technical),
            ("explain.aligned_sentiment", self.aligned_sentiment),
            ("explain.news_sentiment", self.news_sentiment),
            ("explain.reason_technical_moderate", self.reason_technical_moderate),
            ("explain.reason_sentiment_slight", self.reason_sentiment_slight),
            ("explain.reason_regional_strength", self.reason_regional_strength),
        ] {
            unit_interval(field, value)?;
        }
        non_negative("explain.volume_high_ratio", self.volume_high_ratio)?;
        non_negative("explain.reason_volume_ratio", self.reason_volume_ratio)?;
        Ok(())
    }
}
