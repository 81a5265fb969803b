//! Linear raw-count to gram model.
//!
//! `weight = (raw - offset) / scale`. `offset` comes from tare, `scale`
//! (counts per gram) from a reference weight. The default state is the
//! identity mapping, so an uncalibrated session reports raw counts.

use scale_traits::Clock;
use tracing::info;

use crate::error::{CalibrationError, Result};
use crate::sampler::{RawSource, Sampler};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Raw counts at zero load.
    pub offset: f64,
    /// Raw counts per gram; never zero once set through this API.
    pub scale: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
        }
    }
}

impl Calibration {
    /// Restore a recorded calibration.
    pub fn new(offset: f64, scale: f64) -> Result<Self> {
        if !offset.is_finite() || !scale.is_finite() {
            return Err(CalibrationError::NonFinite.into());
        }
        if scale == 0.0 {
            return Err(CalibrationError::ZeroScale.into());
        }
        Ok(Self { offset, scale })
    }

    #[inline]
    pub fn to_weight(&self, raw: f64) -> f64 {
        (raw - self.offset) / self.scale
    }

    pub fn is_identity(&self) -> bool {
        self.offset == 0.0 && self.scale == 1.0
    }

    /// Set `offset` from an already averaged no-load reading.
    pub fn apply_tare(&mut self, mean: Option<f64>) -> Result<f64> {
        let mean = mean.ok_or(CalibrationError::NoSamples)?;
        if !mean.is_finite() {
            return Err(CalibrationError::NonFinite.into());
        }
        self.offset = mean;
        Ok(mean)
    }

    /// Derive `scale` from an averaged reading taken with `known_grams` on the cell.
    pub fn apply_reference(&mut self, mean: Option<f64>, known_grams: f64) -> Result<f64> {
        check_reference(known_grams)?;
        let mean = mean.ok_or(CalibrationError::NoSamples)?;
        let scale = (mean - self.offset) / known_grams;
        if !scale.is_finite() {
            return Err(CalibrationError::NonFinite.into());
        }
        if scale == 0.0 {
            return Err(CalibrationError::ZeroScale.into());
        }
        self.scale = scale;
        Ok(scale)
    }

    /// Average `window` reads with no load and record them as the zero point.
    pub fn tare<S: RawSource, C: Clock>(
        &mut self,
        sampler: &mut Sampler<S, C>,
        window: usize,
    ) -> Result<f64> {
        let offset = self.apply_tare(sampler.read_average(window)?)?;
        info!(offset, window, "tare complete");
        Ok(offset)
    }

    /// Average `window` reads with `known_grams` applied and derive counts per gram.
    pub fn calibrate<S: RawSource, C: Clock>(
        &mut self,
        sampler: &mut Sampler<S, C>,
        known_grams: f64,
        window: usize,
    ) -> Result<f64> {
        // reject before touching the device
        check_reference(known_grams)?;
        let scale = self.apply_reference(sampler.read_average(window)?, known_grams)?;
        info!(scale, offset = self.offset, known_grams, "calibration complete");
        Ok(scale)
    }
}

fn check_reference(known_grams: f64) -> Result<()> {
    if !known_grams.is_finite() {
        return Err(CalibrationError::NonFinite.into());
    }
    if known_grams == 0.0 {
        return Err(CalibrationError::ZeroReferenceWeight.into());
    }
    Ok(())
}
