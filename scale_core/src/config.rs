//! Runtime configuration for the transport, sampler and diagnostics.
//!
//! Separate from the TOML schema in `scale_config`; see `conversions` for the
//! mapping between the two.

use std::time::Duration;

use scale_traits::PinId;

use crate::decoder::BitOrdering;

/// Where in each clock pulse the data line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleEdge {
    /// Between the rising and falling edge.
    #[default]
    WhileHigh,
    /// Right after the falling edge.
    AfterFalling,
}

#[derive(Debug, Clone)]
pub struct TransportCfg {
    /// Give up waiting for DOUT low after this long.
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    /// Hold time for each clock level. Must stay well under the 60 us power-down threshold.
    pub pulse_width: Duration,
    pub ordering: BitOrdering,
    pub sample_edge: SampleEdge,
    /// Timeouts retried before a read through the sampler fails.
    pub read_retries: u32,
}

impl Default for TransportCfg {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(1),
            pulse_width: Duration::from_micros(1),
            ordering: BitOrdering::REFERENCE,
            sample_edge: SampleEdge::WhileHigh,
            read_retries: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SamplingCfg {
    /// Pause between reads of one averaging window.
    pub inter_read_delay: Duration,
    pub average_window: usize,
    pub tare_window: usize,
    pub calibrate_window: usize,
    /// Stable when spread / |mean| is below this.
    pub stability_threshold: f64,
    /// Pause between exchanges in continuous acquisition.
    pub read_interval: Duration,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            inter_read_delay: Duration::from_millis(10),
            average_window: 5,
            tare_window: 20,
            calibrate_window: 20,
            stability_threshold: 0.05,
            read_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiagnosticsCfg {
    /// Reads per candidate wiring.
    pub attempts: usize,
    /// `(data, clock)` pairs tried after the nominal and swapped assignment.
    pub alternate_pins: Vec<(PinId, PinId)>,
    /// Pause between reads of one probe.
    pub settle: Duration,
    /// Reads collected for reading-format detection.
    pub format_samples: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        Self {
            attempts: 5,
            alternate_pins: vec![(17, 27), (27, 17)],
            settle: Duration::from_millis(100),
            format_samples: 5,
        }
    }
}
