pub mod clock;
pub mod gpio;

pub use clock::{Clock, MonotonicClock, TestClock};
pub use gpio::{GpioPort, Level, PinId, PinMode, PortError, PortResult};
