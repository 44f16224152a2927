//! Domain types shared by every scoring stage.

pub mod market;
pub mod prediction;
pub mod signal;
pub mod snapshot;

pub use market::{MarketQuote, MarketSentiment, Region, RegionalAggregate};
pub use prediction::{
    ContributingFactor, DataFlag, Direction, FactorSource, Horizon, PredictionInput,
    PredictionResult, SignalKind, SignalStrength, TradeSignal,
};
pub use signal::{CorrectionWarning, IndicatorReadings, LocalSignal, WarningSeverity};
pub use snapshot::PriceDeltaSnapshot;
