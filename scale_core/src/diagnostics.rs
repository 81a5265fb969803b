//! Wiring and format diagnostics.
//!
//! Everything here returns plain data (`Diagnosis`, `ProbeReport`,
//! `LineCheck`, `FormatReport`); rendering is left to the caller.
//!
//! The decision table works on the fault classes seen over repeated reads:
//!
//! | Observation                              | Diagnosis       |
//! |------------------------------------------|-----------------|
//! | every attempt times out                  | `NoResponse`    |
//! | mostly `0xFFFFFF`                        | `LinesStuckHigh`|
//! | mostly `0x000000`                        | `DataStuckLow`  |
//! | mostly a saturated middle byte           | `Saturated`     |
//! | mostly `2^n - 1` words                   | `TimingSlip`    |
//! | more than half nominal                   | `Communicating` |

use std::fmt;
use std::time::Duration;

use scale_traits::{Clock, GpioPort, Level, PinId};
use tracing::{debug, info};

use crate::config::DiagnosticsCfg;
use crate::decoder::{
    BitOrdering, FaultClass, assemble, classify, is_power_of_two_minus_one, to_signed,
};
use crate::error::{Result, ScaleError};
use crate::sampler::{RawSource, SampleStatistics, Sampler, statistics};
use crate::transport::Hx711;
use crate::types::PinConfig;

/// Human-facing verdict for one wiring candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    NoResponse,
    LinesStuckHigh,
    DataStuckLow,
    Saturated,
    TimingSlip,
    Communicating,
}

impl Diagnosis {
    pub fn summary(self) -> &'static str {
        match self {
            Diagnosis::NoResponse => "device unpowered or data line disconnected",
            Diagnosis::LinesStuckHigh => {
                "clock/data lines likely swapped, or clock not reaching the device"
            }
            Diagnosis::DataStuckLow => {
                "data line shorted to ground, or sensor-to-amplifier wiring fault"
            }
            Diagnosis::Saturated => "readings saturate; check load cell excitation and gain",
            Diagnosis::TimingSlip => "2^n-1 patterns; clock timing slip or wrong bit order",
            Diagnosis::Communicating => "channel communicating correctly",
        }
    }

    pub fn is_working(self) -> bool {
        self == Diagnosis::Communicating
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())
    }
}

fn diagnosis_for(class: FaultClass) -> Diagnosis {
    match class {
        FaultClass::Timeout => Diagnosis::NoResponse,
        FaultClass::AllOnes => Diagnosis::LinesStuckHigh,
        FaultClass::AllZeros => Diagnosis::DataStuckLow,
        FaultClass::SaturatedMiddleByte => Diagnosis::Saturated,
        FaultClass::SuspiciousPowerOfTwoPattern => Diagnosis::TimingSlip,
        FaultClass::Nominal => Diagnosis::Communicating,
    }
}

/// Apply the decision table to the classes observed for one configuration.
pub fn diagnose(classes: &[FaultClass]) -> Diagnosis {
    let clean: Vec<FaultClass> = classes
        .iter()
        .copied()
        .filter(|c| *c != FaultClass::Timeout)
        .collect();
    if clean.is_empty() {
        return Diagnosis::NoResponse;
    }
    let nominal = clean.iter().filter(|c| **c == FaultClass::Nominal).count();
    if nominal * 2 > clean.len() {
        return Diagnosis::Communicating;
    }
    // most frequent fault; ties go to the earlier, more specific class
    let mut best: Option<(FaultClass, usize)> = None;
    for class in [
        FaultClass::AllOnes,
        FaultClass::AllZeros,
        FaultClass::SaturatedMiddleByte,
        FaultClass::SuspiciousPowerOfTwoPattern,
    ] {
        let n = clean.iter().filter(|c| **c == class).count();
        if n > 0 && best.is_none_or(|(_, m)| n > m) {
            best = Some((class, n));
        }
    }
    best.map_or(Diagnosis::Communicating, |(c, _)| diagnosis_for(c))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub class: FaultClass,
    /// Signed value for reads that completed.
    pub value: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub pins: PinConfig,
    pub attempts: Vec<Attempt>,
    pub diagnosis: Diagnosis,
    /// Over the nominal reads only.
    pub stats: Option<SampleStatistics>,
}

impl ProbeReport {
    pub fn classes(&self) -> Vec<FaultClass> {
        self.attempts.iter().map(|a| a.class).collect()
    }

    pub fn timeouts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.class == FaultClass::Timeout)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub probes: Vec<ProbeReport>,
    /// First candidate diagnosed `Communicating`, if any.
    pub working: Option<PinConfig>,
}

/// Nominal pins, then swapped, then each alternate pair; duplicates and
/// pairs with equal pins are dropped.
pub fn candidates(nominal: PinConfig, alternates: &[(PinId, PinId)]) -> Vec<PinConfig> {
    let mut out = vec![nominal, nominal.swapped()];
    for &(data, clock) in alternates {
        if let Ok(p) = nominal.with_pins(data, clock)
            && !out.contains(&p)
        {
            out.push(p);
        }
    }
    out
}

/// Rebind to `pins` and classify `attempts` reads. Timeouts are recorded,
/// backend failures abort.
pub fn probe<P: GpioPort, C: Clock>(
    hx: &mut Hx711<P, C>,
    pins: PinConfig,
    attempts: usize,
    settle: Duration,
) -> Result<ProbeReport> {
    hx.rebind(pins)?;
    let mut out = Vec::with_capacity(attempts);
    for i in 0..attempts {
        if i > 0 {
            hx.clock().sleep(settle);
        }
        let attempt = match hx.read_raw() {
            Ok(s) => Attempt {
                class: s.class(),
                value: Some(s.value),
            },
            Err(ScaleError::Timeout) => Attempt {
                class: FaultClass::Timeout,
                value: None,
            },
            Err(e) => return Err(e),
        };
        out.push(attempt);
    }
    let classes: Vec<FaultClass> = out.iter().map(|a| a.class).collect();
    let nominal: Vec<i32> = out
        .iter()
        .filter(|a| a.class == FaultClass::Nominal)
        .filter_map(|a| a.value)
        .collect();
    let report = ProbeReport {
        pins,
        diagnosis: diagnose(&classes),
        stats: statistics(&nominal),
        attempts: out,
    };
    debug!(pins = %report.pins, diagnosis = ?report.diagnosis, "probe finished");
    Ok(report)
}

/// Try each candidate wiring until one communicates.
///
/// The transport is left bound to the working pins, or to `nominal` when
/// nothing worked.
pub fn run<P: GpioPort, C: Clock>(
    hx: &mut Hx711<P, C>,
    cfg: &DiagnosticsCfg,
) -> Result<DiagnosticReport> {
    let nominal = hx.pins();
    let mut probes = Vec::new();
    let mut working = None;
    for pins in candidates(nominal, &cfg.alternate_pins) {
        let report = probe(hx, pins, cfg.attempts, cfg.settle)?;
        let ok = report.diagnosis.is_working();
        probes.push(report);
        if ok {
            working = Some(pins);
            break;
        }
    }
    match working {
        Some(p) => info!(pins = %p, "found working wiring"),
        None => {
            info!(tried = probes.len(), "no candidate wiring communicates");
            hx.rebind(nominal)?;
        }
    }
    Ok(DiagnosticReport { probes, working })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleVerdict {
    AllHigh,
    AllLow,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleResult {
    pub bits: Vec<bool>,
    pub verdict: ToggleVerdict,
}

impl ToggleResult {
    pub fn from_bits(bits: Vec<bool>) -> Self {
        let highs = bits.iter().filter(|b| **b).count();
        let verdict = if highs == bits.len() {
            ToggleVerdict::AllHigh
        } else if highs == 0 {
            ToggleVerdict::AllLow
        } else {
            ToggleVerdict::Mixed
        };
        Self { bits, verdict }
    }

    pub fn highs(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }
}

/// Low-level line observations taken without decoding anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCheck {
    /// DOUT with the clock parked LOW.
    pub idle_level: Level,
    /// `None` when DOUT never went LOW within the ready timeout.
    pub ready_latency: Option<Duration>,
    pub toggle: ToggleResult,
}

pub const TOGGLE_PULSES: usize = 25;

pub fn line_check<P: GpioPort, C: Clock>(hx: &mut Hx711<P, C>) -> Result<LineCheck> {
    let idle_level = hx.idle_level()?;
    let ready_latency = match hx.wait_ready() {
        Ok(d) => Some(d),
        Err(ScaleError::Timeout) => None,
        Err(e) => return Err(e),
    };
    let toggle = ToggleResult::from_bits(hx.toggle_probe(TOGGLE_PULSES)?);
    debug!(%idle_level, ?ready_latency, verdict = ?toggle.verdict, "line check");
    Ok(LineCheck {
        idle_level,
        ready_latency,
        toggle,
    })
}

#[derive(Debug, Clone)]
pub struct OrderingScore {
    pub ordering: BitOrdering,
    pub values: Vec<i32>,
    pub stats: Option<SampleStatistics>,
    /// Every positive value is 2^n - 1.
    pub suspicious: bool,
    /// Every word is all-ones, all-zeros or has a saturated middle byte.
    pub degenerate: bool,
}

impl OrderingScore {
    /// Only plausible orderings can be selected.
    pub fn is_plausible(&self) -> bool {
        !self.suspicious && !self.degenerate
    }
}

#[derive(Debug, Clone)]
pub struct FormatReport {
    pub scores: Vec<OrderingScore>,
    /// Lowest-spread plausible ordering.
    pub best: Option<BitOrdering>,
}

impl FormatReport {
    /// `best`, or the reference ordering when no candidate was plausible.
    pub fn chosen(&self) -> BitOrdering {
        self.best.unwrap_or(BitOrdering::REFERENCE)
    }
}

/// Re-decode the same wire words under every ordering and rank the results.
pub fn rank_orderings(wires: &[u32]) -> FormatReport {
    let scores: Vec<OrderingScore> = BitOrdering::ALL
        .iter()
        .map(|&ordering| {
            let magnitudes: Vec<u32> = wires.iter().map(|&w| assemble(w, ordering)).collect();
            let values: Vec<i32> = magnitudes.iter().map(|&m| to_signed(m)).collect();
            let mut positives = values.iter().filter(|v| **v > 0).peekable();
            let suspicious = positives.peek().is_some()
                && positives.all(|&v| is_power_of_two_minus_one(v as u32));
            let degenerate =
                !magnitudes.is_empty() && magnitudes.iter().all(|&m| classify(m).is_degenerate());
            OrderingScore {
                ordering,
                stats: statistics(&values),
                values,
                suspicious,
                degenerate,
            }
        })
        .collect();
    let best = scores
        .iter()
        .filter(|s| s.is_plausible())
        .filter_map(|s| s.stats.map(|st| (s.ordering, st.variance)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(o, _)| o);
    FormatReport { scores, best }
}

/// Collect `n` reads and rank all four orderings over their wire words.
pub fn detect_ordering<S: RawSource, C: Clock>(
    sampler: &mut Sampler<S, C>,
    n: usize,
) -> Result<FormatReport> {
    let collected = sampler.collect(n)?;
    let wires: Vec<u32> = collected.samples.iter().map(|s| s.wire).collect();
    let report = rank_orderings(&wires);
    info!(
        samples = wires.len(),
        best = ?report.best.map(|o| o.to_string()),
        "reading format detection"
    );
    Ok(report)
}
