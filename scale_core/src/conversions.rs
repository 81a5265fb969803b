//! `From` implementations bridging `scale_config` types to `scale_core` types.

use std::time::Duration;

use crate::calibration::Calibration;
use crate::config::{DiagnosticsCfg, SampleEdge, SamplingCfg, TransportCfg};
use crate::decoder::{BitOrdering, Order};
use crate::error::Result;
use crate::types::{GainSetting, PinConfig};

// ── Ordering ─────────────────────────────────────────────────────────────────

impl From<scale_config::WireOrder> for Order {
    fn from(o: scale_config::WireOrder) -> Self {
        match o {
            scale_config::WireOrder::Msb => Order::MsbFirst,
            scale_config::WireOrder::Lsb => Order::LsbFirst,
        }
    }
}

impl From<scale_config::SampleEdge> for SampleEdge {
    fn from(e: scale_config::SampleEdge) -> Self {
        match e {
            scale_config::SampleEdge::WhileHigh => SampleEdge::WhileHigh,
            scale_config::SampleEdge::AfterFalling => SampleEdge::AfterFalling,
        }
    }
}

// ── TransportCfg ─────────────────────────────────────────────────────────────

impl From<&scale_config::Hx711Cfg> for TransportCfg {
    fn from(c: &scale_config::Hx711Cfg) -> Self {
        Self {
            ready_timeout: Duration::from_millis(c.ready_timeout_ms),
            poll_interval: Duration::from_micros(c.poll_interval_us),
            pulse_width: Duration::from_micros(c.pulse_us),
            ordering: BitOrdering {
                byte_order: c.byte_order.into(),
                bit_order: c.bit_order.into(),
            },
            sample_edge: c.sample_edge.into(),
            read_retries: c.read_retries,
        }
    }
}

// ── SamplingCfg ──────────────────────────────────────────────────────────────

impl From<&scale_config::SamplingCfg> for SamplingCfg {
    fn from(c: &scale_config::SamplingCfg) -> Self {
        Self {
            inter_read_delay: Duration::from_millis(c.inter_read_delay_ms),
            average_window: c.average_window,
            tare_window: c.tare_window,
            calibrate_window: c.calibrate_window,
            stability_threshold: c.stability_threshold,
            read_interval: Duration::from_millis(c.read_interval_ms),
        }
    }
}

// ── DiagnosticsCfg ───────────────────────────────────────────────────────────

impl From<&scale_config::DiagnosticsCfg> for DiagnosticsCfg {
    fn from(c: &scale_config::DiagnosticsCfg) -> Self {
        Self {
            attempts: c.attempts,
            alternate_pins: c.alternate_pins.iter().map(|[d, k]| (*d, *k)).collect(),
            settle: Duration::from_millis(c.settle_ms),
            format_samples: c.format_samples,
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl TryFrom<&scale_config::PersistedCalibration> for Calibration {
    type Error = crate::error::ScaleError;

    fn try_from(c: &scale_config::PersistedCalibration) -> Result<Self> {
        Calibration::new(c.offset, c.scale)
    }
}

// ── PinConfig ────────────────────────────────────────────────────────────────

impl TryFrom<&scale_config::Config> for PinConfig {
    type Error = crate::error::ScaleError;

    fn try_from(c: &scale_config::Config) -> Result<Self> {
        PinConfig::new(
            c.pins.data,
            c.pins.clock,
            GainSetting::from_gain(c.hx711.gain)?,
        )
    }
}
