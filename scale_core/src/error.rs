use thiserror::Error;

use crate::decoder::FaultClass;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("no valid samples were obtained")]
    NoSamples,
    #[error("reference weight must be non-zero")]
    ZeroReferenceWeight,
    #[error("calibration produced a zero scale factor")]
    ZeroScale,
    #[error("calibration produced a non-finite value")]
    NonFinite,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScaleError {
    #[error("timeout waiting for HX711 data-ready")]
    Timeout,
    #[error("degenerate sample pattern: {0}")]
    DegeneratePattern(FaultClass),
    #[error("calibration error: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("gpio backend failure: {0}")]
    Backend(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScaleError {
    /// Timeouts and degenerate patterns may clear on a later exchange;
    /// everything else needs the caller to change something first.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScaleError::Timeout | ScaleError::DegeneratePattern(_))
    }
}

pub type Result<T> = std::result::Result<T, ScaleError>;
