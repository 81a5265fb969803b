//! Pin assignment and gain selection.

use std::fmt;

use scale_traits::PinId;

use crate::error::{Result, ScaleError};

/// Channel/gain for the next conversion, selected by clock pulses after the data bits.
///
/// Variants follow the datasheet pulse table: channel B only runs at gain 32,
/// so 26 pulses select B/32 and 27 select A/64. Total pulses are always
/// `24 + extra_pulses()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GainSetting {
    /// Channel A, gain 128 (25 pulses).
    #[default]
    A128,
    /// Channel B, gain 32 (26 pulses).
    B32,
    /// Channel A, gain 64 (27 pulses).
    A64,
}

impl GainSetting {
    pub const ALL: [GainSetting; 3] = [GainSetting::A128, GainSetting::B32, GainSetting::A64];

    #[inline]
    pub fn extra_pulses(self) -> u8 {
        match self {
            GainSetting::A128 => 1,
            GainSetting::B32 => 2,
            GainSetting::A64 => 3,
        }
    }

    #[inline]
    pub fn total_pulses(self) -> u8 {
        crate::decoder::DATA_BITS + self.extra_pulses()
    }

    pub fn gain(self) -> u32 {
        match self {
            GainSetting::A128 => 128,
            GainSetting::B32 => 32,
            GainSetting::A64 => 64,
        }
    }

    pub fn from_gain(gain: u32) -> Result<Self> {
        match gain {
            128 => Ok(GainSetting::A128),
            64 => Ok(GainSetting::A64),
            32 => Ok(GainSetting::B32),
            other => Err(ScaleError::Config(format!(
                "unsupported gain {other} (expected 128, 64 or 32)"
            ))),
        }
    }
}

impl fmt::Display for GainSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GainSetting::A128 => f.write_str("A/128"),
            GainSetting::B32 => f.write_str("B/32"),
            GainSetting::A64 => f.write_str("A/64"),
        }
    }
}

/// Host pins for one HX711. `data_pin != clock_pin` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinConfig {
    data_pin: PinId,
    clock_pin: PinId,
    pub gain: GainSetting,
}

impl PinConfig {
    pub fn new(data_pin: PinId, clock_pin: PinId, gain: GainSetting) -> Result<Self> {
        if data_pin == clock_pin {
            return Err(ScaleError::Config(format!(
                "data and clock pins must differ (both are {data_pin})"
            )));
        }
        Ok(Self {
            data_pin,
            clock_pin,
            gain,
        })
    }

    #[inline]
    pub fn data_pin(&self) -> PinId {
        self.data_pin
    }

    #[inline]
    pub fn clock_pin(&self) -> PinId {
        self.clock_pin
    }

    /// Same gain, data and clock exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            data_pin: self.clock_pin,
            clock_pin: self.data_pin,
            gain: self.gain,
        }
    }

    pub fn with_pins(&self, data_pin: PinId, clock_pin: PinId) -> Result<Self> {
        Self::new(data_pin, clock_pin, self.gain)
    }
}

impl fmt::Display for PinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DOUT=GPIO{} SCK=GPIO{} gain={}",
            self.data_pin, self.clock_pin, self.gain
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_counts_follow_the_datasheet() {
        assert_eq!(GainSetting::A128.total_pulses(), 25);
        assert_eq!(GainSetting::B32.total_pulses(), 26);
        assert_eq!(GainSetting::A64.total_pulses(), 27);
        for g in GainSetting::ALL {
            assert!((1..=3).contains(&g.extra_pulses()));
            assert_eq!(GainSetting::from_gain(g.gain()).unwrap(), g);
        }
    }

    #[test]
    fn unsupported_gain_is_a_config_error() {
        assert!(matches!(
            GainSetting::from_gain(16),
            Err(ScaleError::Config(_))
        ));
    }

    #[test]
    fn equal_pins_are_rejected() {
        assert!(PinConfig::new(5, 5, GainSetting::A128).is_err());
        let p = PinConfig::new(5, 6, GainSetting::A64).unwrap();
        let s = p.swapped();
        assert_eq!((s.data_pin(), s.clock_pin(), s.gain), (6, 5, GainSetting::A64));
        assert!(p.with_pins(17, 17).is_err());
    }
}
