//! Explanations attached to a prediction: trade signals and top reasons.
//!
//! Both read the finished call (direction and confidence), the normalized
//! regional components, and the local signal with its indicator readings.
//! Output order is fixed so identical inputs explain identically.

use crate::config::ExplainConfig;
use crate::domain::{Direction, LocalSignal, SignalKind, SignalStrength, TradeSignal};

/// What the explainers see of one aggregated prediction.
#[derive(Debug, Clone, Copy)]
pub struct ExplainContext<'a> {
    pub direction: Direction,
    /// Final confidence, 0–100.
    pub confidence: f64,
    /// Normalized European component in [-1, 1].
    pub european: f64,
    /// Normalized Asian component in [-1, 1].
    pub asian: f64,
    pub local: Option<&'a LocalSignal>,
}

impl ExplainContext<'_> {
    fn scores(&self) -> (f64, f64) {
        self.local
            .map(|s| (s.technical_score, s.sentiment_score))
            .unwrap_or((0.0, 0.0))
    }
}

fn signal(kind: SignalKind, strength: SignalStrength, reason: impl Into<String>) -> TradeSignal {
    TradeSignal {
        kind,
        strength,
        reason: reason.into(),
    }
}

/// Directional call, then RSI, volume and news signals; at most `max_signals`.
pub fn trade_signals(ctx: &ExplainContext<'_>, c: &ExplainConfig) -> Vec<TradeSignal> {
    let (technical, sentiment) = ctx.scores();
    let mut signals = Vec::new();

    let call = match ctx.direction {
        Direction::Up => Some((SignalKind::Buy, 1.0, "bullish")),
        Direction::Down => Some((SignalKind::Sell, -1.0, "bearish")),
        Direction::Flat => None,
    };
    if let Some((kind, sign, word)) = call {
        let aligned =
            technical * sign > c.aligned_technical && sentiment * sign > c.aligned_sentiment;
        if ctx.confidence > c.very_strong_confidence && aligned {
            signals.push(signal(
                kind,
                SignalStrength::VeryStrong,
                format!("{word} technicals aligned with news sentiment"),
            ));
        } else if ctx.confidence > c.strong_confidence {
            signals.push(signal(
                kind,
                SignalStrength::Strong,
                format!("high-confidence {word} prediction"),
            ));
        } else if ctx.confidence > c.moderate_confidence {
            signals.push(signal(
                kind,
                SignalStrength::Moderate,
                format!("{word} momentum detected"),
            ));
        }
    }

    if let Some(r) = ctx.local.and_then(|s| s.readings) {
        if r.rsi > c.rsi_extreme_overbought {
            signals.push(signal(
                SignalKind::Warning,
                SignalStrength::Critical,
                format!("extreme overbought (RSI {:.1}), strong correction risk", r.rsi),
            ));
        } else if r.rsi > c.rsi_overbought {
            signals.push(signal(
                SignalKind::Warning,
                SignalStrength::High,
                format!("overbought (RSI {:.1}), correction possible", r.rsi),
            ));
        }

        if r.rsi < c.rsi_extreme_oversold {
            signals.push(signal(
                SignalKind::Opportunity,
                SignalStrength::Critical,
                format!("extreme oversold (RSI {:.1}), bounce likely", r.rsi),
            ));
        } else if r.rsi < c.rsi_oversold {
            signals.push(signal(
                SignalKind::Opportunity,
                SignalStrength::High,
                format!("oversold (RSI {:.1}), potential bounce", r.rsi),
            ));
        }

        if r.volume_ratio > c.volume_exceptional_ratio {
            signals.push(signal(
                SignalKind::Alert,
                SignalStrength::Critical,
                format!("exceptional volume ({:.1}x average)", r.volume_ratio),
            ));
        } else if r.volume_ratio > c.volume_high_ratio {
            signals.push(signal(
                SignalKind::Alert,
                SignalStrength::High,
                format!("high volume ({:.1}x average)", r.volume_ratio),
            ));
        }

        if r.news_count > c.news_min_articles {
            if sentiment > c.news_sentiment {
                signals.push(signal(
                    SignalKind::Buy,
                    SignalStrength::Strong,
                    format!("very positive news sentiment across {} articles", r.news_count),
                ));
            } else if sentiment < -c.news_sentiment {
                signals.push(signal(
                    SignalKind::Sell,
                    SignalStrength::Strong,
                    format!("very negative news sentiment across {} articles", r.news_count),
                ));
            }
        }
    }

    signals.truncate(c.max_signals);
    signals
}

/// Technical, sentiment, regional, volume and RSI reasons; at most `max_reasons`.
pub fn top_reasons(ctx: &ExplainContext<'_>, c: &ExplainConfig) -> Vec<String> {
    let mut reasons: Vec<String> = Vec::new();
    let readings = ctx.local.and_then(|s| s.readings);

    if let Some(local) = ctx.local {
        let t = local.technical_score;
        let technical = if t > c.reason_technical_strong {
            Some("strong bullish technical indicators")
        } else if t > c.reason_technical_moderate {
            Some("moderately bullish technical setup")
        } else if t < -c.reason_technical_strong {
            Some("strong bearish technical indicators")
        } else if t < -c.reason_technical_moderate {
            Some("moderately bearish technical setup")
        } else {
            None
        };
        reasons.extend(technical.map(String::from));

        let s = local.sentiment_score;
        let busy_news = readings.is_some_and(|r| r.news_count > c.reason_sentiment_min_articles);
        let sentiment = if s > c.reason_sentiment_strong && busy_news {
            Some("positive news sentiment with strong buying interest")
        } else if s > c.reason_sentiment_slight {
            Some("slight bullish sentiment shift")
        } else if s < -c.reason_sentiment_strong && busy_news {
            Some("negative news sentiment with selling pressure")
        } else if s < -c.reason_sentiment_slight {
            Some("slight bearish sentiment shift")
        } else {
            None
        };
        reasons.extend(sentiment.map(String::from));
    }

    for (name, value) in [("Asian", ctx.asian), ("European", ctx.european)] {
        if value > c.reason_regional_strength {
            reasons.push(format!("{name} markets showing strength"));
        } else if value < -c.reason_regional_strength {
            reasons.push(format!("{name} market weakness weighing on US stocks"));
        }
    }

    if let Some(r) = readings {
        if r.volume_ratio > c.reason_volume_ratio {
            reasons.push("volume supporting the price direction".into());
        }
        if r.rsi < c.reason_rsi_oversold {
            reasons.push("oversold conditions present".into());
        } else if r.rsi > c.reason_rsi_overbought {
            reasons.push("overbought conditions present".into());
        }
    }

    reasons.truncate(c.max_reasons);
    reasons
}
