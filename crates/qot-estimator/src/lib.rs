//! Quality-of-Transmission Estimator
//!
//! Computes the optical signal-to-noise ratio of a candidate route from its
//! physical model (fiber spans + in-line amplifiers), converts it to a
//! Q-factor through vendor/rate/modulation-specific polynomial constants,
//! and reports the value together with the acceptance threshold so callers
//! can report margin rather than a bare pass/fail.

use thiserror::Error;

use optical_model::{AmpType, FiberType, ModulationFormat, Rate};

pub mod estimator;
pub mod params;

pub use estimator::QotEstimator;
pub use params::QualityParameters;

#[derive(Error, Debug)]
pub enum QotError {
    #[error("no noise figure configured for amplifier type {0}")]
    MissingNoiseFigure(AmpType),
    #[error("no {0} configured for fiber type {1}")]
    MissingFiberParameter(&'static str, FiberType),
    #[error("no numeric rate configured for {0}")]
    MissingRateValue(Rate),
    #[error("no {0} configured for modulation format {1}")]
    MissingFormatParameter(&'static str, ModulationFormat),
    #[error("no OSNR->Q constants for {vendor}/{rate}/{mod_format}")]
    MissingConstants {
        vendor: String,
        rate: Rate,
        mod_format: ModulationFormat,
    },
    #[error("no Q threshold for {vendor}/{rate}/{mod_format}")]
    MissingThreshold {
        vendor: String,
        rate: Rate,
        mod_format: ModulationFormat,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QotError>;
