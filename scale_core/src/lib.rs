#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! HX711 load-cell driver core (hardware-agnostic).
//!
//! All pin access goes through `scale_traits::GpioPort` and all timing
//! through `scale_traits::Clock`, so the same code runs against a Raspberry
//! Pi, the simulator in `scale_hardware`, or a deterministic test clock.
//!
//! ## Architecture
//!
//! - **Transport** (`transport`): the bit-banged exchange and its state machine
//! - **Decoder** (`decoder`): 24-bit reassembly, two's complement, fault classes
//! - **Calibration** (`calibration`): tare offset and counts-per-gram scale
//! - **Sampling** (`sampler`): averaged reads, statistics, stability verdicts
//! - **Diagnostics** (`diagnostics`): wiring probes, line checks, format detection
//! - **Session** (`session`): builder and continuous acquisition
//!
//! ## Example
//!
//! ```
//! use scale_core::{GainSetting, PinConfig, ScaleSession};
//! use scale_hardware::{SimConfig, SimulatedHx711};
//! use scale_traits::TestClock;
//!
//! let clock = TestClock::new();
//! let sim = SimulatedHx711::new(SimConfig::default(), clock.clone());
//! let mut session = ScaleSession::builder()
//!     .with_port(sim)
//!     .with_clock(clock)
//!     .with_pins(PinConfig::new(5, 6, GainSetting::A128)?)
//!     .build()?;
//! session.tare()?;
//! let grams = session.weight()?;
//! assert!(grams.abs() < 1_000.0);
//! # Ok::<(), scale_core::ScaleError>(())
//! ```

pub mod calibration;
pub mod config;
pub mod conversions;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod sampler;
pub mod session;
pub mod transport;
pub mod types;
pub mod util;

pub use calibration::Calibration;
pub use config::{DiagnosticsCfg, SampleEdge, SamplingCfg, TransportCfg};
pub use decoder::{BitOrdering, FaultClass, Order, RawSample};
pub use diagnostics::{Diagnosis, DiagnosticReport, FormatReport, LineCheck, ToggleVerdict};
pub use error::{CalibrationError, Result, ScaleError};
pub use sampler::{RawSource, SampleStatistics, Sampler, Stability, StabilityReport};
pub use session::{Reading, ScaleSession, ScaleSessionBuilder};
pub use transport::{ExchangeState, Hx711};
pub use types::{GainSetting, PinConfig};
