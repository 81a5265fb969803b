//! 24-bit sample reconstruction, two's-complement decoding and health classification.

use std::fmt;

pub const DATA_BITS: u8 = 24;
pub const MAGNITUDE_MASK: u32 = 0x00FF_FFFF;
pub const SIGN_BIT: u32 = 0x0080_0000;
/// Most negative conversion result.
pub const RAW_MIN: i32 = -0x80_0000;
/// Most positive conversion result.
pub const RAW_MAX: i32 = 0x7F_FFFF;

/// Coarse health classification of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultClass {
    Timeout,
    AllOnes,
    AllZeros,
    SaturatedMiddleByte,
    SuspiciousPowerOfTwoPattern,
    Nominal,
}

impl FaultClass {
    /// Patterns that point at wiring rather than at the load.
    pub fn is_degenerate(self) -> bool {
        matches!(
            self,
            FaultClass::AllOnes | FaultClass::AllZeros | FaultClass::SaturatedMiddleByte
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            FaultClass::Timeout => "timeout",
            FaultClass::AllOnes => "all-ones",
            FaultClass::AllZeros => "all-zeros",
            FaultClass::SaturatedMiddleByte => "saturated-middle-byte",
            FaultClass::SuspiciousPowerOfTwoPattern => "suspicious-2^n-1",
            FaultClass::Nominal => "nominal",
        }
    }
}

impl fmt::Display for FaultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    #[default]
    MsbFirst,
    LsbFirst,
}

impl Order {
    fn label(self) -> &'static str {
        match self {
            Order::MsbFirst => "MSB",
            Order::LsbFirst => "LSB",
        }
    }
}

/// How the 24 transported bits are reassembled into a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitOrdering {
    pub byte_order: Order,
    pub bit_order: Order,
}

impl BitOrdering {
    /// MSB-first bits reassembled byte-major MSB-first: the chip's native format.
    pub const REFERENCE: BitOrdering = BitOrdering {
        byte_order: Order::MsbFirst,
        bit_order: Order::MsbFirst,
    };

    pub const ALL: [BitOrdering; 4] = [
        BitOrdering::REFERENCE,
        BitOrdering {
            byte_order: Order::MsbFirst,
            bit_order: Order::LsbFirst,
        },
        BitOrdering {
            byte_order: Order::LsbFirst,
            bit_order: Order::MsbFirst,
        },
        BitOrdering {
            byte_order: Order::LsbFirst,
            bit_order: Order::LsbFirst,
        },
    ];
}

impl fmt::Display for BitOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.byte_order.label(), self.bit_order.label())
    }
}

/// One decoded exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// Bits in the order they were clocked out, first bit at bit 23.
    pub wire: u32,
    /// Wire bits reassembled under the active `BitOrdering`.
    pub magnitude: u32,
    /// Two's-complement interpretation of `magnitude`.
    pub value: i32,
}

impl RawSample {
    pub fn from_wire(wire: u32, ordering: BitOrdering) -> Self {
        let wire = wire & MAGNITUDE_MASK;
        let magnitude = assemble(wire, ordering);
        Self {
            wire,
            magnitude,
            value: to_signed(magnitude),
        }
    }

    pub fn class(&self) -> FaultClass {
        classify(self.magnitude)
    }
}

/// Interpret a 24-bit magnitude as two's complement.
#[inline]
pub fn to_signed(magnitude: u32) -> i32 {
    let m = magnitude & MAGNITUDE_MASK;
    if m & SIGN_BIT != 0 {
        m as i32 - 0x100_0000
    } else {
        m as i32
    }
}

/// Inverse of [`to_signed`]; values outside the 24-bit range are clamped first.
#[inline]
pub fn to_magnitude(value: i32) -> u32 {
    (value.clamp(RAW_MIN, RAW_MAX) as u32) & MAGNITUDE_MASK
}

/// True for 2^n - 1 values (511, 1023, 2047, ...), a symptom of clock/data slip.
#[inline]
pub fn is_power_of_two_minus_one(magnitude: u32) -> bool {
    magnitude > 0 && magnitude & (magnitude + 1) == 0
}

/// Precedence: AllOnes > AllZeros > SaturatedMiddleByte > SuspiciousPowerOfTwoPattern > Nominal.
pub fn classify(magnitude: u32) -> FaultClass {
    let m = magnitude & MAGNITUDE_MASK;
    if m == MAGNITUDE_MASK {
        FaultClass::AllOnes
    } else if m == 0 {
        FaultClass::AllZeros
    } else if (m >> 8) & 0xFF == 0xFF {
        FaultClass::SaturatedMiddleByte
    } else if is_power_of_two_minus_one(m) {
        FaultClass::SuspiciousPowerOfTwoPattern
    } else {
        FaultClass::Nominal
    }
}

/// Reassemble wire bits as three bytes under `ordering`.
///
/// With `bit_order == LsbFirst` the first bit of each byte is its bit 0; with
/// `byte_order == LsbFirst` the first byte received is the least significant.
pub fn assemble(wire: u32, ordering: BitOrdering) -> u32 {
    let mut bytes = [(wire >> 16) as u8, (wire >> 8) as u8, wire as u8];
    if ordering.bit_order == Order::LsbFirst {
        for b in &mut bytes {
            *b = b.reverse_bits();
        }
    }
    if ordering.byte_order == Order::LsbFirst {
        bytes.reverse();
    }
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x00_0000, 0)]
    #[case(0xFF_FFFF, -1)]
    #[case(0x80_0000, -8_388_608)]
    #[case(0x7F_FFFF, 8_388_607)]
    #[case(0x00_0001, 1)]
    fn decodes_boundaries(#[case] magnitude: u32, #[case] expected: i32) {
        assert_eq!(to_signed(magnitude), expected);
        assert_eq!(to_magnitude(expected), magnitude);
    }

    #[rstest]
    #[case(0xFF_FFFF, FaultClass::AllOnes)]
    #[case(0x00_0000, FaultClass::AllZeros)]
    #[case(0x00_00FF, FaultClass::SuspiciousPowerOfTwoPattern)]
    #[case(0x00_01FF, FaultClass::SuspiciousPowerOfTwoPattern)]
    #[case(0x12_FF34, FaultClass::SaturatedMiddleByte)]
    // both saturated and 2^n - 1; saturation wins
    #[case(0x00_FFFF, FaultClass::SaturatedMiddleByte)]
    #[case(0x12_34AB, FaultClass::Nominal)]
    fn classifies_with_fixed_precedence(#[case] magnitude: u32, #[case] expected: FaultClass) {
        assert_eq!(classify(magnitude), expected);
    }

    #[test]
    fn reference_ordering_is_identity() {
        assert_eq!(assemble(0x12_34AB, BitOrdering::REFERENCE), 0x12_34AB);
    }

    #[test]
    fn alternate_orderings_rearrange_bytes_and_bits() {
        let [_, msb_lsb, lsb_msb, lsb_lsb] = BitOrdering::ALL;
        // 0x01 reversed is 0x80
        assert_eq!(assemble(0x01_0203, msb_lsb), 0x80_40C0);
        assert_eq!(assemble(0x01_0203, lsb_msb), 0x03_0201);
        assert_eq!(assemble(0x01_0203, lsb_lsb), 0xC0_4080);
    }

    #[test]
    fn degenerate_classes() {
        assert!(FaultClass::AllOnes.is_degenerate());
        assert!(FaultClass::SaturatedMiddleByte.is_degenerate());
        assert!(!FaultClass::SuspiciousPowerOfTwoPattern.is_degenerate());
        assert!(!FaultClass::Nominal.is_degenerate());
    }

    #[test]
    fn sample_from_wire_applies_ordering_before_sign() {
        let s = RawSample::from_wire(0x00_0080, BitOrdering::ALL[3]);
        // LSB/LSB: bytes reversed and bit-reversed -> 0x01 << 16
        assert_eq!(s.magnitude, 0x01_0000);
        assert_eq!(s.value, 65_536);
        assert_eq!(s.wire, 0x00_0080);
    }

    #[test]
    fn display_names() {
        assert_eq!(BitOrdering::REFERENCE.to_string(), "MSB/MSB");
        assert_eq!(FaultClass::AllZeros.to_string(), "all-zeros");
    }
}
