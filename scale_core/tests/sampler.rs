use std::time::Duration;

use scale_core::mocks::ScriptedSource;
use scale_core::sampler::statistics;
use scale_core::{FaultClass, Sampler, SamplingCfg, ScaleError, Stability};
use scale_traits::TestClock;

fn sampler(source: ScriptedSource) -> (Sampler<ScriptedSource, TestClock>, TestClock) {
    let clock = TestClock::new();
    (
        Sampler::new(source, clock.clone(), SamplingCfg::default()),
        clock,
    )
}

#[test]
fn average_skips_timeouts() {
    let (mut s, clock) = sampler(ScriptedSource::new([
        Ok(10),
        Err(ScaleError::Timeout),
        Ok(12),
        Err(ScaleError::Timeout),
        Ok(11),
    ]));
    assert_eq!(s.read_average(5).unwrap(), Some(11.0));
    assert_eq!(s.source().reads(), 5);
    // four pauses between five reads
    assert_eq!(clock.offset(), Duration::from_millis(40));
}

#[test]
fn average_of_only_timeouts_is_none() {
    let (mut s, _) = sampler(ScriptedSource::new([]));
    assert_eq!(s.read_average(5).unwrap(), None);
    assert_eq!(s.source().reads(), 5);
}

#[test]
fn degenerate_rejections_are_skipped_like_timeouts() {
    let (mut s, _) = sampler(ScriptedSource::new([
        Err(ScaleError::DegeneratePattern(FaultClass::AllOnes)),
        Ok(20),
    ]));
    let c = s.collect(2).unwrap();
    assert_eq!(c.values(), vec![20]);
    assert_eq!(c.failures, 1);
}

#[test]
fn backend_failure_aborts_collection() {
    let (mut s, _) = sampler(ScriptedSource::new([
        Ok(1),
        Err(ScaleError::Backend("gpio gone".into())),
        Ok(2),
    ]));
    assert_eq!(
        s.read_average(3).unwrap_err(),
        ScaleError::Backend("gpio gone".into())
    );
    assert_eq!(s.source().reads(), 2);
}

#[test]
fn statistics_of_three_values() {
    let st = statistics(&[10, 20, 30]).unwrap();
    assert_eq!(st.mean, 20.0);
    assert_eq!(st.min, 10);
    assert_eq!(st.max, 30);
    assert_eq!(st.variance, 20.0);
}

#[test]
fn assessment_reports_stability_and_failures() {
    let (mut s, _) = sampler(ScriptedSource::new([
        Ok(8_000),
        Ok(8_020),
        Err(ScaleError::Timeout),
        Ok(7_990),
    ]));
    let r = s.assess(4).unwrap();
    assert_eq!(r.verdict, Stability::Stable);
    assert_eq!(r.failures, 1);
    assert_eq!(r.stats.unwrap().count, 3);
    assert_eq!(r.suspicious_fraction, 0.0);
}

#[test]
fn threshold_is_configurable() {
    let clock = TestClock::new();
    let strict = SamplingCfg {
        stability_threshold: 0.001,
        ..SamplingCfg::default()
    };
    let mut s = Sampler::new(
        ScriptedSource::values([8_000, 8_020, 7_990]),
        clock,
        strict,
    );
    // spread 30 / mean ~8003 is above 0.1 %
    assert_eq!(s.assess(3).unwrap().verdict, Stability::Unstable);
}

#[test]
fn power_of_two_minus_one_majority_is_suspicious() {
    let (mut s, _) = sampler(ScriptedSource::values([511, 1_023, 2_047, 8_000]));
    let r = s.assess(4).unwrap();
    assert_eq!(r.verdict, Stability::SuspiciousPattern);
    assert_eq!(r.suspicious_fraction, 0.75);
}
