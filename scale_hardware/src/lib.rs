//! GPIO backends for the HX711 driver.
//!
//! - `SimulatedHx711`: software device model, always available.
//! - `RppalPort`: Raspberry Pi GPIO through `rppal` (feature `hardware`, Linux only).
pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rppal_port;

pub use error::HwError;
pub use sim::{SimConfig, SimFault, SimulatedHx711};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use rppal_port::RppalPort;
