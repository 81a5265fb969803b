//! Raspberry Pi GPIO backend.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, IoPin, Mode};
use scale_traits::{GpioPort, Level, PinId, PinMode, PortResult};
use tracing::debug;

use crate::error::{HwError, Result};

/// Delays at or above this use the scheduler; shorter ones spin.
const SPIN_LIMIT: Duration = Duration::from_millis(1);

fn map_gpio_error(pin: PinId, e: rppal::gpio::Error) -> HwError {
    match e {
        rppal::gpio::Error::PinUsed(_) | rppal::gpio::Error::PinNotAvailable(_) => {
            HwError::PinUnavailable(pin)
        }
        other => HwError::Gpio(other.to_string()),
    }
}

pub struct RppalPort {
    gpio: Gpio,
    pins: HashMap<PinId, IoPin>,
}

impl RppalPort {
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        Ok(Self {
            gpio,
            pins: HashMap::new(),
        })
    }

    fn pin_mut(&mut self, pin: PinId) -> Result<&mut IoPin> {
        self.pins
            .get_mut(&pin)
            .ok_or(HwError::PinNotConfigured(pin))
    }
}

impl GpioPort for RppalPort {
    fn configure(&mut self, pin: PinId, mode: PinMode) -> PortResult<()> {
        let mode = match mode {
            PinMode::Input => Mode::Input,
            PinMode::Output => Mode::Output,
        };
        if let Some(io) = self.pins.get_mut(&pin) {
            io.set_mode(mode);
            return Ok(());
        }
        let io = self
            .gpio
            .get(pin)
            .map_err(|e| map_gpio_error(pin, e))?
            .into_io(mode);
        debug!(pin, ?mode, "gpio pin claimed");
        self.pins.insert(pin, io);
        Ok(())
    }

    fn write(&mut self, pin: PinId, level: Level) -> PortResult<()> {
        let io = self.pin_mut(pin)?;
        match level {
            Level::High => io.set_high(),
            Level::Low => io.set_low(),
        }
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> PortResult<Level> {
        let io = self.pin_mut(pin)?;
        Ok(Level::from(io.is_high()))
    }

    fn sleep(&mut self, d: Duration) {
        if d >= SPIN_LIMIT {
            std::thread::sleep(d);
            return;
        }
        // thread::sleep overshoots by tens of microseconds, which is enough
        // to push a clock HIGH phase past the power-down threshold
        let start = Instant::now();
        while start.elapsed() < d {
            std::hint::spin_loop();
        }
    }
}
