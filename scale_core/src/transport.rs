//! Bit-banged HX711 exchange over a `GpioPort`.
//!
//! One call to [`Hx711::read_raw`] is one complete exchange: wait for DOUT low
//! with the clock held low, shift 24 data bits, then emit the gain pulses that
//! select the channel for the *next* conversion. The exchange is never left
//! half-done on the happy path; only a port failure can abort it mid-shift.

use std::time::Duration;

use scale_traits::{Clock, GpioPort, Level, PinMode, PortError};
use tracing::{debug, trace, warn};

use crate::config::{SampleEdge, TransportCfg};
use crate::decoder::{BitOrdering, DATA_BITS, RawSample};
use crate::error::{Result, ScaleError};
use crate::hw_error::map_hw_error;
use crate::types::{GainSetting, PinConfig};
use crate::util::wait_until_low;

/// Clock HIGH held this long guarantees power-down (datasheet minimum is 60 us).
pub const POWER_DOWN_HOLD: Duration = Duration::from_micros(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeFailure {
    Timeout,
    Backend,
}

/// Progress of the last exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    AwaitingReady,
    Shifting {
        bit: u8,
    },
    EmittingGainPulses,
    Decoded,
    Failed(ExchangeFailure),
}

fn port_err(e: PortError) -> ScaleError {
    map_hw_error(e.as_ref())
}

pub struct Hx711<P: GpioPort, C: Clock> {
    port: P,
    clock: C,
    pins: PinConfig,
    cfg: TransportCfg,
    state: ExchangeState,
}

impl<P: GpioPort, C: Clock> Hx711<P, C> {
    /// Claim both pins and park the clock LOW.
    pub fn new(port: P, clock: C, pins: PinConfig, cfg: TransportCfg) -> Result<Self> {
        let mut hx = Self {
            port,
            clock,
            pins,
            cfg,
            state: ExchangeState::Idle,
        };
        hx.claim_pins()?;
        debug!(pins = %hx.pins, ordering = %hx.cfg.ordering, "hx711 transport ready");
        Ok(hx)
    }

    fn claim_pins(&mut self) -> Result<()> {
        self.port
            .configure(self.pins.data_pin(), PinMode::Input)
            .map_err(port_err)?;
        self.port
            .configure(self.pins.clock_pin(), PinMode::Output)
            .map_err(port_err)?;
        self.set_clock(Level::Low)
    }

    pub fn pins(&self) -> PinConfig {
        self.pins
    }

    pub fn config(&self) -> &TransportCfg {
        &self.cfg
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Takes effect from the conversion after the next exchange.
    pub fn set_gain(&mut self, gain: GainSetting) {
        self.pins.gain = gain;
    }

    pub fn set_ordering(&mut self, ordering: BitOrdering) {
        self.cfg.ordering = ordering;
    }

    /// Move to a different pin pair (diagnostics only).
    pub fn rebind(&mut self, pins: PinConfig) -> Result<()> {
        debug!(from = %self.pins, to = %pins, "rebinding hx711 pins");
        self.pins = pins;
        self.state = ExchangeState::Idle;
        self.claim_pins()
    }

    #[inline]
    fn set_clock(&mut self, level: Level) -> Result<()> {
        self.port
            .write(self.pins.clock_pin(), level)
            .map_err(port_err)
    }

    #[inline]
    fn data_level(&mut self) -> Result<Level> {
        self.port.read(self.pins.data_pin()).map_err(port_err)
    }

    /// DOUT low means a conversion is waiting.
    pub fn is_ready(&mut self) -> Result<bool> {
        Ok(self.data_level()?.is_low())
    }

    /// Block until DOUT goes low; returns how long that took.
    pub fn wait_ready(&mut self) -> Result<Duration> {
        // a HIGH clock here would power the chip down
        self.set_clock(Level::Low)?;
        let data = self.pins.data_pin();
        let port = &mut self.port;
        wait_until_low(
            || {
                port.read(data)
                    .map(Level::is_high)
                    .map_err(port_err)
            },
            &self.clock,
            self.cfg.ready_timeout,
            self.cfg.poll_interval,
        )
    }

    /// One clock pulse; returns the data level when `sample` is set.
    fn pulse(&mut self, sample: bool) -> Result<bool> {
        let mut bit = false;
        self.set_clock(Level::High)?;
        self.port.sleep(self.cfg.pulse_width);
        if sample && self.cfg.sample_edge == SampleEdge::WhileHigh {
            bit = self.data_level()?.is_high();
        }
        self.set_clock(Level::Low)?;
        if sample && self.cfg.sample_edge == SampleEdge::AfterFalling {
            bit = self.data_level()?.is_high();
        }
        self.port.sleep(self.cfg.pulse_width);
        Ok(bit)
    }

    fn exchange(&mut self) -> Result<RawSample> {
        self.state = ExchangeState::AwaitingReady;
        let waited = self.wait_ready()?;

        let mut wire = 0u32;
        for bit in 0..DATA_BITS {
            self.state = ExchangeState::Shifting { bit };
            wire = (wire << 1) | u32::from(self.pulse(true)?);
        }

        self.state = ExchangeState::EmittingGainPulses;
        for _ in 0..self.pins.gain.extra_pulses() {
            self.pulse(false)?;
        }

        let sample = RawSample::from_wire(wire, self.cfg.ordering);
        self.state = ExchangeState::Decoded;
        trace!(
            wire,
            value = sample.value,
            waited_us = waited.as_micros() as u64,
            "hx711 raw read"
        );
        Ok(sample)
    }

    /// One full exchange. Degenerate patterns are logged but still returned.
    pub fn read_raw(&mut self) -> Result<RawSample> {
        match self.exchange() {
            Ok(sample) => {
                let class = sample.class();
                if class.is_degenerate() {
                    warn!(%class, magnitude = sample.magnitude, pins = %self.pins, "degenerate hx711 sample");
                }
                Ok(sample)
            }
            Err(e) => {
                self.state = ExchangeState::Failed(match e {
                    ScaleError::Timeout => ExchangeFailure::Timeout,
                    _ => ExchangeFailure::Backend,
                });
                Err(e)
            }
        }
    }

    /// Retries timeouts like the sampler does (`read_retries`), then turns
    /// all-ones, all-zeros and saturated words into errors.
    pub fn read_checked(&mut self) -> Result<RawSample> {
        let sample = self.read_with_retries(self.cfg.read_retries)?;
        let class = sample.class();
        if class.is_degenerate() {
            return Err(ScaleError::DegeneratePattern(class));
        }
        Ok(sample)
    }

    /// Retry readiness timeouts up to `retries` extra times, then report the last one.
    pub fn read_with_retries(&mut self, retries: u32) -> Result<RawSample> {
        let mut attempt = 0;
        loop {
            match self.read_raw() {
                Err(ScaleError::Timeout) if attempt < retries => {
                    attempt += 1;
                    warn!(attempt, retries, "hx711 not ready; retrying");
                }
                other => return other,
            }
        }
    }

    /// Hold the clock HIGH past the power-down threshold.
    pub fn power_down(&mut self) -> Result<()> {
        self.set_clock(Level::Low)?;
        self.set_clock(Level::High)?;
        self.port.sleep(POWER_DOWN_HOLD);
        self.state = ExchangeState::Idle;
        debug!(pins = %self.pins, "hx711 powered down");
        Ok(())
    }

    /// The chip wakes on channel A, gain 128; the configured gain is re-sent
    /// with the next exchange.
    pub fn power_up(&mut self) -> Result<()> {
        self.set_clock(Level::Low)?;
        self.state = ExchangeState::Idle;
        debug!(pins = %self.pins, "hx711 powered up");
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.power_down()?;
        self.power_up()
    }

    /// DOUT level with the clock parked LOW.
    pub fn idle_level(&mut self) -> Result<Level> {
        self.set_clock(Level::Low)?;
        self.data_level()
    }

    /// Clock `pulses` times without waiting for ready, sampling DOUT each time.
    pub fn toggle_probe(&mut self, pulses: usize) -> Result<Vec<bool>> {
        self.set_clock(Level::Low)?;
        let mut bits = Vec::with_capacity(pulses);
        for _ in 0..pulses {
            bits.push(self.pulse(true)?);
        }
        self.state = ExchangeState::Idle;
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scale_hardware::{SimConfig, SimulatedHx711};
    use scale_traits::TestClock;

    fn transport(
        cfg: SimConfig,
    ) -> (Hx711<SimulatedHx711<TestClock>, TestClock>, TestClock) {
        let clock = TestClock::new();
        let sim = SimulatedHx711::new(cfg, clock.clone());
        let pins = PinConfig::new(5, 6, GainSetting::A128).unwrap();
        let hx = Hx711::new(sim, clock.clone(), pins, TransportCfg::default()).unwrap();
        (hx, clock)
    }

    #[test]
    fn read_ends_decoded_with_25_pulses() {
        let (mut hx, _clock) = transport(SimConfig {
            noise_counts: 0,
            ..SimConfig::default()
        });
        hx.port_mut().push_value(-5);
        let s = hx.read_raw().unwrap();
        assert_eq!(s.value, -5);
        assert_eq!(s.magnitude, 0xFF_FFFB);
        assert_eq!(hx.state(), ExchangeState::Decoded);
        assert_eq!(hx.port().total_pulses(), 25);
    }

    #[test]
    fn timeout_marks_state_failed() {
        let (mut hx, clock) = transport(SimConfig {
            fault: scale_hardware::SimFault::Unpowered,
            ..SimConfig::default()
        });
        assert_eq!(hx.read_raw().unwrap_err(), ScaleError::Timeout);
        assert_eq!(hx.state(), ExchangeState::Failed(ExchangeFailure::Timeout));
        assert!(clock.offset() >= Duration::from_secs(1));
        assert_eq!(hx.port().total_pulses(), 0);
    }
}
