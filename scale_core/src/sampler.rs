//! Repeated reads and the statistics computed over them.
//!
//! `Sampler` owns a `RawSource` and paces reads on an injected `Clock`.
//! Recoverable failures (timeouts, degenerate words from a strict source) are
//! counted and skipped; backend failures abort the collection.

use scale_traits::{Clock, GpioPort};
use tracing::debug;

use crate::config::SamplingCfg;
use crate::decoder::{RawSample, is_power_of_two_minus_one};
use crate::error::Result;
use crate::transport::Hx711;

/// Anything that produces one decoded exchange per call.
pub trait RawSource {
    fn acquire(&mut self) -> Result<RawSample>;
}

impl<P: GpioPort, C: Clock> RawSource for Hx711<P, C> {
    fn acquire(&mut self) -> Result<RawSample> {
        let retries = self.config().read_retries;
        self.read_with_retries(retries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStatistics {
    pub count: usize,
    pub mean: f64,
    pub min: i32,
    pub max: i32,
    /// Peak-to-peak spread, `max - min`.
    pub variance: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

impl SampleStatistics {
    /// `variance / |mean|`; undefined for a zero mean.
    pub fn relative_spread(&self) -> Option<f64> {
        (self.mean != 0.0).then(|| self.variance / self.mean.abs())
    }

    pub fn is_stable(&self, threshold: f64) -> bool {
        self.relative_spread().is_some_and(|r| r < threshold)
    }
}

/// Mean, extremes and spread of a finite window. `None` for an empty slice.
pub fn statistics(samples: &[i32]) -> Option<SampleStatistics> {
    let (&first, rest) = samples.split_first()?;
    let (mut min, mut max, mut sum) = (first, first, f64::from(first));
    for &v in rest {
        min = min.min(v);
        max = max.max(v);
        sum += f64::from(v);
    }
    let count = samples.len();
    let mean = sum / count as f64;
    let sq: f64 = samples
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum();
    Some(SampleStatistics {
        count,
        mean,
        min,
        max,
        variance: f64::from(max) - f64::from(min),
        stddev: (sq / count as f64).sqrt(),
    })
}

/// Share of samples that are positive 2^n - 1 values.
pub fn suspicious_fraction(samples: &[i32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples
        .iter()
        .filter(|&&v| v > 0 && is_power_of_two_minus_one(v as u32))
        .count();
    n as f64 / samples.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Stable,
    Unstable,
    /// Most readings look like clock/data slip rather than load.
    SuspiciousPattern,
}

pub fn judge(samples: &[i32], threshold: f64) -> Stability {
    if suspicious_fraction(samples) > 0.5 {
        return Stability::SuspiciousPattern;
    }
    match statistics(samples) {
        Some(s) if s.is_stable(threshold) => Stability::Stable,
        _ => Stability::Unstable,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub samples: Vec<RawSample>,
    /// Reads that failed recoverably and were skipped.
    pub failures: usize,
}

impl Collection {
    pub fn values(&self) -> Vec<i32> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|s| f64::from(s.value)).sum();
        Some(sum / self.samples.len() as f64)
    }
}

#[derive(Debug, Clone)]
pub struct StabilityReport {
    pub stats: Option<SampleStatistics>,
    pub verdict: Stability,
    pub suspicious_fraction: f64,
    pub failures: usize,
}

pub struct Sampler<S, C> {
    source: S,
    clock: C,
    cfg: SamplingCfg,
}

impl<S: RawSource, C: Clock> Sampler<S, C> {
    pub fn new(source: S, clock: C, cfg: SamplingCfg) -> Self {
        Self { source, clock, cfg }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &SamplingCfg {
        &self.cfg
    }

    /// Issue `n` reads, pausing `inter_read_delay` between them.
    pub fn collect(&mut self, n: usize) -> Result<Collection> {
        let mut out = Collection {
            samples: Vec::with_capacity(n),
            failures: 0,
        };
        for i in 0..n {
            if i > 0 {
                self.clock.sleep(self.cfg.inter_read_delay);
            }
            match self.source.acquire() {
                Ok(s) => out.samples.push(s),
                Err(e) if e.is_recoverable() => {
                    debug!(read = i, error = %e, "skipping sample");
                    out.failures += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Mean of the successful reads out of `n`; `None` when every read failed.
    pub fn read_average(&mut self, n: usize) -> Result<Option<f64>> {
        Ok(self.collect(n)?.mean())
    }

    pub fn assess(&mut self, n: usize) -> Result<StabilityReport> {
        let c = self.collect(n)?;
        let values = c.values();
        Ok(StabilityReport {
            stats: statistics(&values),
            verdict: judge(&values, self.cfg.stability_threshold),
            suspicious_fraction: suspicious_fraction(&values),
            failures: c.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_over_three_samples() {
        let s = statistics(&[10, 20, 30]).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 20.0);
        assert_eq!((s.min, s.max), (10, 30));
        assert_eq!(s.variance, 20.0);
        assert!((s.stddev - 8.164_965_8).abs() < 1e-6);
    }

    #[test]
    fn empty_window_has_no_statistics() {
        assert!(statistics(&[]).is_none());
        assert_eq!(suspicious_fraction(&[]), 0.0);
    }

    #[test]
    fn zero_mean_is_never_stable() {
        let s = statistics(&[-1, 1]).unwrap();
        assert_eq!(s.relative_spread(), None);
        assert!(!s.is_stable(1.0));
    }

    #[test]
    fn verdicts() {
        assert_eq!(judge(&[8000, 8010, 7995], 0.05), Stability::Stable);
        assert_eq!(judge(&[100, 900, 400], 0.05), Stability::Unstable);
        assert_eq!(judge(&[511, 1023, 2047, 8000], 0.05), Stability::SuspiciousPattern);
        // exactly half is not "more than half"
        assert_eq!(judge(&[511, 1023, 8000, 8001], 0.05), Stability::Unstable);
    }
}
