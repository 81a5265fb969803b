//! One owned HX711 session: transport, sampler and calibration together.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use scale_traits::{Clock, GpioPort};
use tracing::{debug, info};

use crate::calibration::Calibration;
use crate::config::{DiagnosticsCfg, SamplingCfg, TransportCfg};
use crate::decoder::RawSample;
use crate::diagnostics::{self, DiagnosticReport, FormatReport, LineCheck};
use crate::error::{Result, ScaleError};
use crate::sampler::{RawSource, Sampler, StabilityReport};
use crate::transport::Hx711;
use crate::types::PinConfig;

/// One exchange converted to grams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub raw: RawSample,
    pub grams: f64,
}

pub struct ScaleSession<P: GpioPort, C: Clock> {
    sampler: Sampler<Hx711<P, C>, C>,
    calibration: Calibration,
}

impl<P: GpioPort, C: Clock + Clone> ScaleSession<P, C> {
    pub fn builder() -> ScaleSessionBuilder<P, C> {
        ScaleSessionBuilder::default()
    }

    pub fn pins(&self) -> PinConfig {
        self.transport().pins()
    }

    pub fn transport(&self) -> &Hx711<P, C> {
        self.sampler.source()
    }

    pub fn transport_mut(&mut self) -> &mut Hx711<P, C> {
        self.sampler.source_mut()
    }

    pub fn sampler_config(&self) -> &SamplingCfg {
        self.sampler.config()
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Restore a recorded calibration without re-running tare/calibrate.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// One exchange, with the configured timeout retries.
    pub fn read_raw(&mut self) -> Result<RawSample> {
        self.sampler.source_mut().acquire()
    }

    pub fn read_average(&mut self, n: usize) -> Result<Option<f64>> {
        self.sampler.read_average(n)
    }

    pub fn stability(&mut self, n: usize) -> Result<StabilityReport> {
        self.sampler.assess(n)
    }

    /// Tare over the configured window.
    pub fn tare(&mut self) -> Result<f64> {
        let window = self.sampler.config().tare_window;
        self.calibration.tare(&mut self.sampler, window)
    }

    /// Reference calibration over the configured window.
    pub fn calibrate(&mut self, known_grams: f64) -> Result<f64> {
        let window = self.sampler.config().calibrate_window;
        self.calibration
            .calibrate(&mut self.sampler, known_grams, window)
    }

    pub fn reading(&mut self) -> Result<Reading> {
        let raw = self.read_raw()?;
        Ok(Reading {
            raw,
            grams: self.calibration.to_weight(f64::from(raw.value)),
        })
    }

    pub fn weight(&mut self) -> Result<f64> {
        Ok(self.reading()?.grams)
    }

    /// Weight of the mean of `n` reads; `None` when every read failed.
    pub fn weight_average(&mut self, n: usize) -> Result<Option<f64>> {
        let cal = self.calibration;
        Ok(self.read_average(n)?.map(|m| cal.to_weight(m)))
    }

    pub fn diagnose(&mut self, cfg: &DiagnosticsCfg) -> Result<DiagnosticReport> {
        diagnostics::run(self.sampler.source_mut(), cfg)
    }

    pub fn line_check(&mut self) -> Result<LineCheck> {
        diagnostics::line_check(self.sampler.source_mut())
    }

    /// Rank the four orderings over `n` reads and switch to the winner.
    pub fn detect_ordering(&mut self, n: usize) -> Result<FormatReport> {
        let report = diagnostics::detect_ordering(&mut self.sampler, n)?;
        let chosen = report.chosen();
        self.transport_mut().set_ordering(chosen);
        debug!(ordering = %chosen, "decode ordering applied");
        Ok(report)
    }

    /// Read, hand the result to `on_reading`, sleep `interval`, repeat.
    ///
    /// Stops when `stop` is set or `on_reading` breaks. Timeouts and degenerate
    /// words are passed to the callback; backend failures end the loop with an
    /// error. `stop` is only checked between exchanges. Returns the number of
    /// exchanges attempted.
    pub fn run_continuous<F>(
        &mut self,
        interval: Duration,
        stop: &AtomicBool,
        mut on_reading: F,
    ) -> Result<u64>
    where
        F: FnMut(Result<Reading>) -> ControlFlow<()>,
    {
        let mut count = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let outcome = match self.reading() {
                Err(e) if !e.is_recoverable() => return Err(e),
                other => other,
            };
            count += 1;
            if on_reading(outcome).is_break() || stop.load(Ordering::Relaxed) {
                break;
            }
            self.sampler.clock().sleep(interval);
        }
        info!(count, "continuous acquisition stopped");
        Ok(count)
    }
}

/// Builder for `ScaleSession`. Port, clock and pins are required.
pub struct ScaleSessionBuilder<P, C> {
    port: Option<P>,
    clock: Option<C>,
    pins: Option<PinConfig>,
    transport: TransportCfg,
    sampling: SamplingCfg,
    calibration: Calibration,
}

impl<P, C> Default for ScaleSessionBuilder<P, C> {
    fn default() -> Self {
        Self {
            port: None,
            clock: None,
            pins: None,
            transport: TransportCfg::default(),
            sampling: SamplingCfg::default(),
            calibration: Calibration::default(),
        }
    }
}

impl<P: GpioPort, C: Clock + Clone> ScaleSessionBuilder<P, C> {
    pub fn with_port(mut self, port: P) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_clock(mut self, clock: C) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_pins(mut self, pins: PinConfig) -> Self {
        self.pins = Some(pins);
        self
    }

    pub fn with_transport(mut self, cfg: TransportCfg) -> Self {
        self.transport = cfg;
        self
    }

    pub fn with_sampling(mut self, cfg: SamplingCfg) -> Self {
        self.sampling = cfg;
        self
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn build(self) -> Result<ScaleSession<P, C>> {
        let port = self
            .port
            .ok_or_else(|| ScaleError::Config("missing GPIO port".into()))?;
        let clock = self
            .clock
            .ok_or_else(|| ScaleError::Config("missing clock".into()))?;
        let pins = self
            .pins
            .ok_or_else(|| ScaleError::Config("missing pin configuration".into()))?;
        if self.sampling.stability_threshold.is_nan() || self.sampling.stability_threshold <= 0.0 {
            return Err(ScaleError::Config(
                "stability threshold must be positive".into(),
            ));
        }
        let transport = Hx711::new(port, clock.clone(), pins, self.transport)?;
        Ok(ScaleSession {
            sampler: Sampler::new(transport, clock, self.sampling),
            calibration: self.calibration,
        })
    }
}
