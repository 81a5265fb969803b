//! Pin-level capability consumed by the HX711 transport.

use std::fmt;
use std::time::Duration;

/// BCM pin number.
pub type PinId = u8;

/// Errors crossing the port boundary are boxed so backends keep their own types.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;
pub type PortResult<T> = Result<T, PortError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    #[inline]
    pub fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("LOW"),
            Level::High => f.write_str("HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Digital I/O plus a short delay primitive.
///
/// Implementations must not reorder writes and reads: the bit-banged
/// protocol depends on every call taking effect in program order.
pub trait GpioPort {
    fn configure(&mut self, pin: PinId, mode: PinMode) -> PortResult<()>;
    fn write(&mut self, pin: PinId, level: Level) -> PortResult<()>;
    fn read(&mut self, pin: PinId) -> PortResult<Level>;
    /// Microsecond-scale delay between pin operations.
    fn sleep(&mut self, d: Duration);
}

impl<P: GpioPort + ?Sized> GpioPort for Box<P> {
    fn configure(&mut self, pin: PinId, mode: PinMode) -> PortResult<()> {
        (**self).configure(pin, mode)
    }
    fn write(&mut self, pin: PinId, level: Level) -> PortResult<()> {
        (**self).write(pin, level)
    }
    fn read(&mut self, pin: PinId) -> PortResult<Level> {
        (**self).read(pin)
    }
    fn sleep(&mut self, d: Duration) {
        (**self).sleep(d)
    }
}
