#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the HX711 scale tools.
//!
//! - `Config` and its sections are deserialized from TOML; every section is
//!   optional and falls back to the defaults below.
//! - `Config::validate` rejects values the driver cannot run with.
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    /// BCM pin wired to the chip's DOUT.
    pub data: u8,
    /// BCM pin wired to the chip's PD_SCK.
    pub clock: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self { data: 5, clock: 6 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireOrder {
    #[default]
    Msb,
    Lsb,
}

/// When the data line is sampled relative to each clock pulse.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SampleEdge {
    #[default]
    WhileHigh,
    AfterFalling,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Hx711Cfg {
    /// 128 (channel A), 64 (channel A) or 32 (channel B).
    pub gain: u32,
    /// Max time to wait for DOUT low before a read fails.
    pub ready_timeout_ms: u64,
    pub poll_interval_us: u64,
    /// Clock HIGH/LOW hold time per pulse.
    pub pulse_us: u64,
    pub byte_order: WireOrder,
    pub bit_order: WireOrder,
    pub sample_edge: SampleEdge,
    /// Extra attempts after a readiness timeout (0 = fail on the first).
    pub read_retries: u32,
}

impl Default for Hx711Cfg {
    fn default() -> Self {
        Self {
            gain: 128,
            ready_timeout_ms: 1000,
            poll_interval_us: 1000,
            pulse_us: 1,
            byte_order: WireOrder::Msb,
            bit_order: WireOrder::Msb,
            sample_edge: SampleEdge::WhileHigh,
            read_retries: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingCfg {
    pub inter_read_delay_ms: u64,
    pub average_window: usize,
    pub tare_window: usize,
    pub calibrate_window: usize,
    /// Readings are stable when spread / mean stays below this.
    pub stability_threshold: f64,
    /// Pause between exchanges in continuous acquisition.
    pub read_interval_ms: u64,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            inter_read_delay_ms: 10,
            average_window: 5,
            tare_window: 20,
            calibrate_window: 20,
            stability_threshold: 0.05,
            read_interval_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiagnosticsCfg {
    /// Reads per candidate wiring.
    pub attempts: usize,
    /// Extra `[data, clock]` pairs tried after the configured and swapped pins.
    pub alternate_pins: Vec<[u8; 2]>,
    pub settle_ms: u64,
    /// Reads per ordering during format detection.
    pub format_samples: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        Self {
            attempts: 5,
            alternate_pins: vec![[17, 27], [27, 17]],
            settle_ms: 100,
            format_samples: 5,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// A previously recorded calibration to restore instead of re-running tare.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PersistedCalibration {
    /// Raw counts at zero load.
    pub offset: f64,
    /// Raw counts per gram.
    pub scale: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SimFaultCfg {
    #[default]
    None,
    Unpowered,
    DataShorted,
    ClockDisconnected,
    SwappedWiring,
}

/// Device emulator used by the `sim` backend.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorCfg {
    pub fault: SimFaultCfg,
    pub base_counts: i32,
    pub noise_counts: i32,
    pub counts_per_gram: f64,
    pub load_grams: f64,
    pub conversion_ms: u64,
    pub seed: Option<u64>,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            fault: SimFaultCfg::None,
            base_counts: 8_000,
            noise_counts: 40,
            counts_per_gram: 420.0,
            load_grams: 0.0,
            conversion_ms: 100,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub hx711: Hx711Cfg,
    pub sampling: SamplingCfg,
    pub diagnostics: DiagnosticsCfg,
    pub logging: Logging,
    pub calibration: Option<PersistedCalibration>,
    pub simulator: SimulatorCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("validating config {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.data == self.pins.clock {
            eyre::bail!(
                "pins.data and pins.clock must differ (both are {})",
                self.pins.data
            );
        }

        // HX711
        if !matches!(self.hx711.gain, 128 | 64 | 32) {
            eyre::bail!("hx711.gain must be one of 128, 64, 32");
        }
        if self.hx711.ready_timeout_ms == 0 {
            eyre::bail!("hx711.ready_timeout_ms must be >= 1");
        }
        if self.hx711.poll_interval_us == 0 {
            eyre::bail!("hx711.poll_interval_us must be >= 1");
        }
        // 60 us of clock HIGH powers the chip down
        if self.hx711.pulse_us == 0 || self.hx711.pulse_us >= 50 {
            eyre::bail!("hx711.pulse_us must be in [1, 50)");
        }
        if self.hx711.read_retries > 100 {
            eyre::bail!("hx711.read_retries is unreasonably large (>100)");
        }

        // Sampling
        if self.sampling.average_window == 0 {
            eyre::bail!("sampling.average_window must be >= 1");
        }
        if self.sampling.tare_window == 0 {
            eyre::bail!("sampling.tare_window must be >= 1");
        }
        if self.sampling.calibrate_window == 0 {
            eyre::bail!("sampling.calibrate_window must be >= 1");
        }
        let t = self.sampling.stability_threshold;
        if !(t > 0.0 && t <= 1.0) {
            eyre::bail!("sampling.stability_threshold must be in (0.0, 1.0]");
        }
        if self.sampling.read_interval_ms == 0 {
            eyre::bail!("sampling.read_interval_ms must be >= 1");
        }

        // Diagnostics
        if self.diagnostics.attempts == 0 {
            eyre::bail!("diagnostics.attempts must be >= 1");
        }
        if self.diagnostics.format_samples == 0 {
            eyre::bail!("diagnostics.format_samples must be >= 1");
        }
        for pair in &self.diagnostics.alternate_pins {
            if pair[0] == pair[1] {
                eyre::bail!(
                    "diagnostics.alternate_pins entry [{}, {}] uses the same pin twice",
                    pair[0],
                    pair[1]
                );
            }
        }

        // Calibration
        if let Some(c) = self.calibration {
            if !c.offset.is_finite() || !c.scale.is_finite() {
                eyre::bail!("calibration.offset and calibration.scale must be finite");
            }
            if c.scale == 0.0 {
                eyre::bail!("calibration.scale must be non-zero");
            }
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly (got {r:?})");
        }

        // Simulator
        if self.simulator.conversion_ms == 0 {
            eyre::bail!("simulator.conversion_ms must be >= 1");
        }
        if self.simulator.noise_counts < 0 {
            eyre::bail!("simulator.noise_counts must be >= 0");
        }
        if !self.simulator.counts_per_gram.is_finite() {
            eyre::bail!("simulator.counts_per_gram must be finite");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").unwrap();
        assert_eq!(cfg.pins.data, 5);
        assert_eq!(cfg.pins.clock, 6);
        assert_eq!(cfg.hx711.gain, 128);
        assert_eq!(cfg.sampling.stability_threshold, 0.05);
        assert_eq!(cfg.diagnostics.alternate_pins, vec![[17, 27], [27, 17]]);
        assert!(cfg.calibration.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn enums_use_lowercase_names() {
        let cfg = load_toml(
            r#"
[hx711]
byte_order = "lsb"
sample_edge = "after-falling"

[simulator]
fault = "clock-disconnected"
"#,
        )
        .unwrap();
        assert_eq!(cfg.hx711.byte_order, WireOrder::Lsb);
        assert_eq!(cfg.hx711.bit_order, WireOrder::Msb);
        assert_eq!(cfg.hx711.sample_edge, SampleEdge::AfterFalling);
        assert_eq!(cfg.simulator.fault, SimFaultCfg::ClockDisconnected);
    }
}
