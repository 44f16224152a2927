//! Pulsecast Core: calibration, domain types and the pure scoring stages.
//!
//! This crate contains the stateless half of the prediction engine:
//! - Central calibration config with startup validation
//! - Regional normalization of per-market quotes
//! - Weighted fusion of regional and local signals into a prediction
//! - Rebound detection over a table of independent pattern rules
//! - Local signal derivation and the correction warning
//! - Trade signals and top reasons explaining each prediction
//!
//! Nothing here holds mutable state or performs I/O; caching, retries and
//! provider access live in `pulsecast-runner`.

pub mod aggregator;
pub mod config;
pub mod correction;
pub mod domain;
pub mod error;
pub mod explain;
pub mod local;
pub mod normalizer;
pub mod rebound;

pub use aggregator::PredictionAggregator;
pub use config::{CalibrationConfig, ConfigError};
pub use error::ScoringError;
pub use normalizer::RegionalNormalizer;
pub use rebound::{ReboundDetector, ReboundEvent, ReboundPattern, ReboundType};
