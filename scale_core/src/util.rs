//! Readiness polling shared by the transport and the line checks.

use std::time::Duration;

use scale_traits::Clock;

use crate::error::{Result, ScaleError};

/// Wait until `is_high` reports false (line went low) or `timeout` expires.
///
/// Sleeps `poll_interval` on `clock` between polls so tests can drive time
/// deterministically. Returns how long the wait took.
pub fn wait_until_low<C: Clock + ?Sized>(
    mut is_high: impl FnMut() -> Result<bool>,
    clock: &C,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let start = clock.now();
    let deadline = start + timeout;
    while is_high()? {
        if clock.now() >= deadline {
            return Err(ScaleError::Timeout);
        }
        clock.sleep(poll_interval);
    }
    Ok(clock.elapsed_since(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scale_traits::TestClock;

    #[test]
    fn returns_latency_once_line_drops() {
        let clock = TestClock::new();
        let mut polls = 0;
        let waited = wait_until_low(
            || {
                polls += 1;
                Ok(polls < 4)
            },
            &clock,
            Duration::from_millis(50),
            Duration::from_millis(1),
        )
        .unwrap();
        assert_eq!(waited, Duration::from_millis(3));
    }

    #[test]
    fn times_out_when_line_stays_high() {
        let clock = TestClock::new();
        let err = wait_until_low(
            || Ok(true),
            &clock,
            Duration::from_millis(5),
            Duration::from_micros(200),
        )
        .unwrap_err();
        assert_eq!(err, ScaleError::Timeout);
        assert!(clock.offset() >= Duration::from_millis(5));
    }

    #[test]
    fn poll_errors_propagate() {
        let clock = TestClock::new();
        let err = wait_until_low(
            || Err(ScaleError::Backend("gone".into())),
            &clock,
            Duration::from_millis(5),
            Duration::from_millis(1),
        )
        .unwrap_err();
        assert!(matches!(err, ScaleError::Backend(_)));
    }
}
