//! Backend selection and session assembly from the typed config.

use std::time::Duration;

use eyre::WrapErr;
use scale_config::{Config, SimFaultCfg, SimulatorCfg};
use scale_core::{Calibration, PinConfig, SamplingCfg, ScaleSession, TransportCfg};
use scale_hardware::{SimConfig, SimFault, SimulatedHx711};
use scale_traits::{GpioPort, MonotonicClock};

use crate::cli::Backend;

pub type CliSession = ScaleSession<Box<dyn GpioPort>, MonotonicClock>;

fn sim_fault(f: SimFaultCfg) -> SimFault {
    match f {
        SimFaultCfg::None => SimFault::None,
        SimFaultCfg::Unpowered => SimFault::Unpowered,
        SimFaultCfg::DataShorted => SimFault::DataShorted,
        SimFaultCfg::ClockDisconnected => SimFault::ClockNotReaching,
        SimFaultCfg::SwappedWiring => SimFault::SwappedWiring,
    }
}

/// The emulated chip is wired to `[pins]`; CLI pin overrides only move the host side.
fn sim_config(wiring: &Config) -> SimConfig {
    let defaults = SimConfig::default();
    let sim: &SimulatorCfg = &wiring.simulator;
    SimConfig {
        dout_pin: wiring.pins.data,
        sck_pin: wiring.pins.clock,
        fault: sim_fault(sim.fault),
        base_counts: sim.base_counts,
        noise_counts: sim.noise_counts,
        counts_per_gram: sim.counts_per_gram,
        load_grams: sim.load_grams,
        conversion: Duration::from_millis(sim.conversion_ms),
        seed: sim.seed.unwrap_or(defaults.seed),
        ..defaults
    }
}

pub fn open_port(backend: Backend, wiring: &Config) -> eyre::Result<Box<dyn GpioPort>> {
    match backend {
        Backend::Sim => {
            let sim = SimulatedHx711::new(sim_config(wiring), MonotonicClock);
            tracing::info!(fault = ?wiring.simulator.fault, "using simulated HX711");
            Ok(Box::new(sim))
        }
        Backend::Gpio => open_gpio(),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_gpio() -> eyre::Result<Box<dyn GpioPort>> {
    let port = scale_hardware::RppalPort::new().wrap_err("open gpio")?;
    tracing::info!("using Raspberry Pi GPIO");
    Ok(Box::new(port))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_gpio() -> eyre::Result<Box<dyn GpioPort>> {
    eyre::bail!("gpio backend unavailable: rebuild with `--features hardware` on Linux")
}

/// Build a session on `port` from the effective config.
pub fn build_session(cfg: &Config, port: Box<dyn GpioPort>) -> eyre::Result<CliSession> {
    let pins = PinConfig::try_from(cfg).wrap_err("invalid configuration")?;
    let mut builder = ScaleSession::builder()
        .with_port(port)
        .with_clock(MonotonicClock::new())
        .with_pins(pins)
        .with_transport(TransportCfg::from(&cfg.hx711))
        .with_sampling(SamplingCfg::from(&cfg.sampling));
    if let Some(persisted) = &cfg.calibration {
        let cal = Calibration::try_from(persisted).wrap_err("invalid configuration")?;
        tracing::debug!(offset = cal.offset, scale = cal.scale, "restoring calibration");
        builder = builder.with_calibration(cal);
    }
    Ok(builder.build()?)
}
