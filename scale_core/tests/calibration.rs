use scale_core::mocks::ScriptedSource;
use scale_core::{Calibration, CalibrationError, Sampler, SamplingCfg, ScaleError};
use scale_traits::TestClock;

fn sampler(values: impl IntoIterator<Item = i32>) -> Sampler<ScriptedSource, TestClock> {
    Sampler::new(
        ScriptedSource::values(values),
        TestClock::new(),
        SamplingCfg::default(),
    )
}

#[test]
fn tare_sets_offset_to_mean() {
    let mut cal = Calibration::default();
    let mut s = sampler([100, 102, 98, 100]);
    assert_eq!(cal.tare(&mut s, 4).unwrap(), 100.0);
    assert_eq!(cal.offset, 100.0);
    assert_eq!(cal.scale, 1.0);
}

#[test]
fn calibrate_then_convert() {
    let mut cal = Calibration::default();
    cal.tare(&mut sampler([100, 100]), 2).unwrap();
    let scale = cal.calibrate(&mut sampler([600, 600, 600]), 500.0, 3).unwrap();
    assert_eq!(scale, 1.0);
    assert_eq!(cal.to_weight(350.0), 250.0);
}

#[test]
fn zero_reference_weight_is_rejected_before_reading() {
    let mut cal = Calibration::default();
    let mut s = sampler([600]);
    assert_eq!(
        cal.calibrate(&mut s, 0.0, 1).unwrap_err(),
        ScaleError::Calibration(CalibrationError::ZeroReferenceWeight)
    );
    assert_eq!(s.source().reads(), 0);
}

#[test]
fn tare_without_samples_fails() {
    let mut cal = Calibration::default();
    let mut s = sampler([]);
    assert_eq!(
        cal.tare(&mut s, 5).unwrap_err(),
        ScaleError::Calibration(CalibrationError::NoSamples)
    );
    assert_eq!(cal, Calibration::default());
}

#[test]
fn calibrate_without_samples_fails() {
    let mut cal = Calibration::default();
    let mut s = sampler([]);
    assert_eq!(
        cal.calibrate(&mut s, 100.0, 3).unwrap_err(),
        ScaleError::Calibration(CalibrationError::NoSamples)
    );
}

#[test]
fn calibration_yielding_zero_scale_is_reported() {
    let mut cal = Calibration::default();
    cal.tare(&mut sampler([500]), 1).unwrap();
    let err = cal.calibrate(&mut sampler([500]), 200.0, 1).unwrap_err();
    assert_eq!(err, ScaleError::Calibration(CalibrationError::ZeroScale));
    assert!(!err.is_recoverable());
}

#[test]
fn fields_can_be_overridden_directly() {
    let mut cal = Calibration::default();
    cal.offset = 8_000.0;
    cal.scale = 420.0;
    assert_eq!(cal.to_weight(50_000.0), 100.0);
}
