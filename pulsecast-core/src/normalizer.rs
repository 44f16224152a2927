//! Regional normalization: raw per-market quotes into one influence signal.
//!
//! Pure over its inputs. Degraded input (no usable quote) yields a neutral
//! aggregate, never an error; the aggregator reads the completeness ratio to
//! lower confidence accordingly.
//!
//! Quotes tagged with another region are ignored entirely: they count toward
//! neither `valid_markets` nor `total_markets`.

use crate::config::{CalibrationConfig, RegionConfig, SentimentThresholds};
use crate::domain::{MarketQuote, MarketSentiment, Region, RegionalAggregate};

/// Normalizes quotes using the calibrated market tables.
#[derive(Debug, Clone, Copy)]
pub struct RegionalNormalizer<'a> {
    config: &'a CalibrationConfig,
}

impl<'a> RegionalNormalizer<'a> {
    pub fn new(config: &'a CalibrationConfig) -> Self {
        Self { config }
    }

    /// Normalize with the region's configured share of the final prediction.
    pub fn normalize(&self, region: Region, quotes: &[MarketQuote]) -> RegionalAggregate {
        let region_config = self.config.regions.for_region(region);
        self.normalize_with_weight(region, quotes, region_config.weight_pct)
    }

    /// Normalize with an explicit `region_weight_pct`.
    pub fn normalize_with_weight(
        &self,
        region: Region,
        quotes: &[MarketQuote],
        region_weight_pct: f64,
    ) -> RegionalAggregate {
        normalize(
            region,
            quotes,
            region_weight_pct,
            self.config.regions.for_region(region),
            &self.config.european_sentiment,
        )
    }
}

/// Free-function form of [`RegionalNormalizer::normalize_with_weight`].
pub fn normalize(
    region: Region,
    quotes: &[MarketQuote],
    region_weight_pct: f64,
    table: &RegionConfig,
    thresholds: &SentimentThresholds,
) -> RegionalAggregate {
    let in_region: Vec<&MarketQuote> = quotes.iter().filter(|q| q.region == region).collect();
    if in_region.len() < quotes.len() {
        tracing::debug!(
            %region,
            ignored = quotes.len() - in_region.len(),
            "ignoring quotes tagged with another region"
        );
    }
    let total_markets = in_region.len();
    let valid: Vec<&MarketQuote> = in_region.into_iter().filter(|q| q.is_usable()).collect();

    if valid.is_empty() {
        tracing::debug!(%region, total_markets, "no usable quotes, neutral aggregate");
        return RegionalAggregate::neutral(region, total_markets);
    }

    let valid_markets = valid.len();
    let avg_change_percent =
        valid.iter().map(|q| q.change_percent).sum::<f64>() / valid_markets as f64;
    let influence_score = valid
        .iter()
        .map(|q| table.market_weight(&q.market_symbol) * q.change_percent)
        .sum::<f64>()
        / 100.0;
    let impact_percent = influence_score * region_weight_pct / 100.0;

    let mut aggregate = RegionalAggregate {
        region,
        avg_change_percent,
        influence_score,
        impact_percent,
        valid_markets,
        total_markets,
        sentiment_label: None,
        sentiment_confidence: None,
    };

    if region == Region::European {
        let (label, confidence) = classify(influence_score, aggregate.completeness(), thresholds);
        aggregate.sentiment_label = Some(label);
        aggregate.sentiment_confidence = Some(confidence);
    }

    aggregate
}

/// Label from the influence sign/magnitude; confidence grows with magnitude
/// and is scaled by the valid/total ratio.
fn classify(
    influence_score: f64,
    completeness: f64,
    thresholds: &SentimentThresholds,
) -> (MarketSentiment, f64) {
    let label = if influence_score > thresholds.bullish_above {
        MarketSentiment::Bullish
    } else if influence_score < thresholds.bearish_below {
        MarketSentiment::Bearish
    } else {
        MarketSentiment::Neutral
    };
    let strength = (influence_score.abs() / thresholds.strong_move).min(1.0);
    let confidence = ((thresholds.base_confidence + strength * thresholds.confidence_span)
        * completeness)
        .clamp(0.0, 100.0);
    (label, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(symbol: &str, region: Region, change: f64, valid: bool) -> MarketQuote {
        MarketQuote {
            market_symbol: symbol.into(),
            region,
            change_percent: change,
            is_valid: valid,
            fetched_at: Utc::now(),
        }
    }

    fn european(changes: &[(&str, f64, bool)]) -> Vec<MarketQuote> {
        changes
            .iter()
            .map(|(s, c, v)| quote(s, Region::European, *c, *v))
            .collect()
    }

    #[test]
    fn all_invalid_quotes_give_neutral_aggregate() {
        let config = CalibrationConfig::default();
        let quotes = european(&[("^FTSE", 1.2, false), ("^GDAXI", -0.4, false)]);
        let agg = RegionalNormalizer::new(&config).normalize(Region::European, &quotes);
        assert_eq!(agg.avg_change_percent, 0.0);
        assert_eq!(agg.influence_score, 0.0);
        assert_eq!(agg.impact_percent, 0.0);
        assert_eq!(agg.valid_markets, 0);
        assert_eq!(agg.total_markets, 2);
    }

    #[test]
    fn empty_quote_list_is_neutral() {
        let config = CalibrationConfig::default();
        let agg = RegionalNormalizer::new(&config).normalize(Region::Asian, &[]);
        assert_eq!(agg, RegionalAggregate::neutral(Region::Asian, 0));
    }

    #[test]
    fn influence_uses_market_table() {
        let config = CalibrationConfig::default();
        let quotes = european(&[
            ("^FTSE", 1.0, true),
            ("^GDAXI", 2.0, true),
            ("^FCHI", -1.0, true),
            ("^STOXX50E", 0.0, true),
        ]);
        let agg = RegionalNormalizer::new(&config).normalize(Region::European, &quotes);
        // (25×1 + 30×2 − 20×1 + 0) / 100
        assert!((agg.influence_score - 0.65).abs() < 1e-12);
        assert!((agg.impact_percent - 0.325).abs() < 1e-12);
        assert!((agg.avg_change_percent - 0.5).abs() < 1e-12);
        assert_eq!(agg.sentiment_label, Some(MarketSentiment::Bullish));
    }

    #[test]
    fn invalid_quotes_are_excluded_but_counted() {
        let config = CalibrationConfig::default();
        let quotes = european(&[("^FTSE", 1.0, true), ("^GDAXI", 5.0, false)]);
        let agg = RegionalNormalizer::new(&config).normalize(Region::European, &quotes);
        assert_eq!(agg.valid_markets, 1);
        assert_eq!(agg.total_markets, 2);
        assert!((agg.influence_score - 0.25).abs() < 1e-12);
    }

    #[test]
    fn sentiment_confidence_scales_with_completeness() {
        let config = CalibrationConfig::default();
        let normalizer = RegionalNormalizer::new(&config);
        let full = european(&[("^FTSE", -4.0, true), ("^GDAXI", -4.0, true)]);
        let half = european(&[("^FTSE", -4.0, true), ("^GDAXI", -4.0, false)]);
        let a = normalizer.normalize(Region::European, &full);
        let b = normalizer.normalize(Region::European, &half);
        assert_eq!(a.sentiment_label, Some(MarketSentiment::Bearish));
        assert!(a.sentiment_confidence.unwrap() > b.sentiment_confidence.unwrap());
    }

    #[test]
    fn off_region_quotes_do_not_dilute_completeness() {
        let config = CalibrationConfig::default();
        let mut quotes = european(&[("^FTSE", 1.0, true), ("^GDAXI", 2.0, true)]);
        quotes.push(quote("^N225", Region::Asian, -3.0, true));
        let agg = RegionalNormalizer::new(&config).normalize(Region::European, &quotes);
        assert_eq!(agg.valid_markets, 2);
        assert_eq!(agg.total_markets, 2);
        assert_eq!(agg.completeness(), 1.0);
        assert!((agg.avg_change_percent - 1.5).abs() < 1e-12);
    }

    #[test]
    fn label_confidence_follows_thresholds() {
        let mut config = CalibrationConfig::default();
        config.european_sentiment.base_confidence = 30.0;
        config.european_sentiment.confidence_span = 60.0;
        let quotes = european(&[("^FTSE", 0.0, true)]);
        let agg = RegionalNormalizer::new(&config).normalize(Region::European, &quotes);
        assert_eq!(agg.sentiment_label, Some(MarketSentiment::Neutral));
        assert_eq!(agg.sentiment_confidence, Some(30.0));
    }

    #[test]
    fn asian_aggregate_has_no_label() {
        let config = CalibrationConfig::default();
        let quotes = vec![quote("^N225", Region::Asian, 1.0, true)];
        let agg = RegionalNormalizer::new(&config).normalize(Region::Asian, &quotes);
        assert!(agg.sentiment_label.is_none());
        assert!((agg.impact_percent - 0.3 * 20.0 / 100.0).abs() < 1e-12);
    }

    #[test]
    fn explicit_region_weight_overrides_config() {
        let config = CalibrationConfig::default();
        let quotes = vec![quote("^N225", Region::Asian, 1.0, true)];
        let agg = RegionalNormalizer::new(&config).normalize_with_weight(
            Region::Asian,
            &quotes,
            100.0,
        );
        assert!((agg.impact_percent - agg.influence_score).abs() < 1e-12);
    }
}
