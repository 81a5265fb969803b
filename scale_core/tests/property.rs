use proptest::prelude::*;
use scale_core::decoder::{
    BitOrdering, FaultClass, MAGNITUDE_MASK, RAW_MAX, RAW_MIN, assemble, classify, to_magnitude,
    to_signed,
};
use scale_core::sampler::statistics;

fn ordering() -> impl Strategy<Value = BitOrdering> {
    (0usize..4).prop_map(|i| BitOrdering::ALL[i])
}

proptest! {
    #[test]
    fn decode_inverts_encode(v in RAW_MIN..=RAW_MAX) {
        prop_assert_eq!(to_signed(to_magnitude(v)), v);
    }

    #[test]
    fn encode_inverts_decode(m in 0u32..=MAGNITUDE_MASK) {
        prop_assert_eq!(to_magnitude(to_signed(m)), m);
    }

    #[test]
    fn every_ordering_is_an_involution(w in 0u32..=MAGNITUDE_MASK, o in ordering()) {
        let once = assemble(w, o);
        prop_assert!(once <= MAGNITUDE_MASK);
        prop_assert_eq!(assemble(once, o), w);
    }

    #[test]
    fn sign_follows_bit_23(m in 0u32..=MAGNITUDE_MASK) {
        prop_assert_eq!(to_signed(m) < 0, m & 0x80_0000 != 0);
    }

    #[test]
    fn nominal_words_are_never_degenerate(m in 0u32..=MAGNITUDE_MASK) {
        let c = classify(m);
        if c == FaultClass::Nominal {
            prop_assert!(m != 0 && m != MAGNITUDE_MASK);
            prop_assert!((m >> 8) & 0xFF != 0xFF);
            prop_assert!(m & (m + 1) != 0);
        }
        prop_assert!(c != FaultClass::Timeout);
    }

    #[test]
    fn statistics_are_bounded(values in proptest::collection::vec(RAW_MIN..=RAW_MAX, 1..64)) {
        let s = statistics(&values).unwrap();
        prop_assert_eq!(s.count, values.len());
        prop_assert!(f64::from(s.min) <= s.mean + 1e-6);
        prop_assert!(s.mean <= f64::from(s.max) + 1e-6);
        prop_assert!(s.variance >= 0.0);
        prop_assert!(s.stddev <= s.variance + 1e-6);
    }
}
