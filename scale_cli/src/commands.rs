//! Subcommand implementations. Results go to stdout; logs go to stderr.

use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use scale_core::decoder::{FaultClass, Order};
use scale_core::diagnostics::{DiagnosticReport, FormatReport, LineCheck, ProbeReport};
use scale_core::sampler::{judge, statistics, suspicious_fraction};
use scale_core::{Diagnosis, DiagnosticsCfg, RawSample, ScaleError, Stability, ToggleVerdict};
use serde_json::{Value, json};

use crate::backend::CliSession;

/// `1234.5` -> `"1.234 kg"`, `12.3` -> `"12.3 g"`.
pub fn format_grams(grams: f64) -> String {
    if grams.abs() >= 1000.0 {
        format!("{:.3} kg", grams / 1000.0)
    } else {
        format!("{grams:.1} g")
    }
}

/// 24-bit word as three space-separated bytes, MSB first.
pub fn binary_grouped(magnitude: u32) -> String {
    format!(
        "{:08b} {:08b} {:08b}",
        (magnitude >> 16) & 0xFF,
        (magnitude >> 8) & 0xFF,
        magnitude & 0xFF
    )
}

fn status(class: FaultClass) -> &'static str {
    match class {
        FaultClass::Nominal => "ok",
        other => other.name(),
    }
}

fn error_status(err: &ScaleError) -> &'static str {
    match err {
        ScaleError::Timeout => "timeout",
        ScaleError::DegeneratePattern(class) => class.name(),
        _ => "error",
    }
}

fn print_raw_header() {
    println!(
        "{:>5}  {:>9}  {:>8}  {:<26}  status",
        "#", "value", "hex", "binary"
    );
}

fn print_raw_row(index: usize, sample: &RawSample, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "index": index,
                "value": sample.value,
                "hex": format!("0x{:06X}", sample.magnitude),
                "binary": binary_grouped(sample.magnitude),
                "status": status(sample.class()),
            })
        );
    } else {
        println!(
            "{index:>5}  {:>9}  0x{:06X}  {:<26}  {}",
            sample.value,
            sample.magnitude,
            binary_grouped(sample.magnitude),
            status(sample.class())
        );
    }
}

fn print_failed_row(index: usize, err: &ScaleError, json: bool) {
    if json {
        println!(
            "{}",
            json!({ "index": index, "value": Value::Null, "status": error_status(err) })
        );
    } else {
        println!(
            "{index:>5}  {:>9}  {:>8}  {:<26}  {}",
            "-",
            "-",
            "-",
            error_status(err)
        );
    }
}

fn stability_name(s: Stability) -> &'static str {
    match s {
        Stability::Stable => "stable",
        Stability::Unstable => "unstable",
        Stability::SuspiciousPattern => "suspicious-pattern",
    }
}

fn print_read_summary(values: &[i32], failures: usize, threshold: f64, json: bool) {
    let stats = statistics(values);
    let verdict = stability_name(judge(values, threshold));
    let suspicious = suspicious_fraction(values);
    if json {
        println!(
            "{}",
            json!({
                "summary": {
                    "valid": values.len(),
                    "failed": failures,
                    "mean": stats.map(|s| s.mean),
                    "min": stats.map(|s| s.min),
                    "max": stats.map(|s| s.max),
                    "spread": stats.map(|s| s.variance),
                    "stddev": stats.map(|s| s.stddev),
                    "stability": verdict,
                    "suspicious_fraction": suspicious,
                }
            })
        );
        return;
    }
    println!();
    match stats {
        Some(s) => println!(
            "{} valid, {failures} failed; mean {:.1}, range [{}, {}], spread {:.0}, stddev {:.1}; {verdict}",
            s.count, s.mean, s.min, s.max, s.variance, s.stddev
        ),
        None => println!("no valid readings ({failures} failed)"),
    }
    if suspicious > 0.0 {
        println!(
            "{:.0}% of readings are 2^n-1 patterns; try `scale formats`",
            suspicious * 100.0
        );
    }
}

/// `count` exchanges printed as a debug table, then a summary.
pub fn read(session: &mut CliSession, count: usize, strict: bool, json: bool) -> eyre::Result<()> {
    if !json {
        print_raw_header();
    }
    let mut values = Vec::with_capacity(count);
    let mut last_err = None;
    let mut failures = 0;
    for index in 0..count {
        let outcome = if strict {
            session.transport_mut().read_checked()
        } else {
            session.read_raw()
        };
        match outcome {
            Ok(sample) => {
                values.push(sample.value);
                print_raw_row(index, &sample, json);
            }
            Err(e) if e.is_recoverable() => {
                failures += 1;
                print_failed_row(index, &e, json);
                last_err = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    let threshold = session.sampler_config().stability_threshold;
    print_read_summary(&values, failures, threshold, json);
    match last_err {
        Some(e) if values.is_empty() => {
            Err(eyre::Report::new(e).wrap_err(format!("all {count} reads failed")))
        }
        _ => Ok(()),
    }
}

/// Raw rows every `read_interval` until `stop` is raised.
pub fn read_follow(session: &mut CliSession, stop: &AtomicBool, json: bool) -> eyre::Result<()> {
    if !json {
        print_raw_header();
    }
    let interval = session.sampler_config().read_interval;
    let mut index = 0;
    session.run_continuous(interval, stop, |outcome| {
        match outcome {
            Ok(reading) => print_raw_row(index, &reading.raw, json),
            Err(e) => print_failed_row(index, &e, json),
        }
        index += 1;
        ControlFlow::Continue(())
    })?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct WeighArgs {
    pub skip_tare: bool,
    pub known_grams: Option<f64>,
    pub place_delay: Duration,
    pub window: Option<usize>,
    pub follow: bool,
}

fn print_weight(grams: f64, samples: Option<usize>, json: bool) {
    if json {
        println!("{}", json!({ "grams": grams, "samples": samples }));
    } else {
        println!("Weight: {}", format_grams(grams));
    }
}

pub fn weigh(
    session: &mut CliSession,
    args: &WeighArgs,
    stop: &AtomicBool,
    json: bool,
) -> eyre::Result<()> {
    if !args.skip_tare {
        if !json {
            println!("Taring, keep the platform empty...");
        }
        let offset = session.tare().wrap_err("tare failed")?;
        if !json {
            println!("Tare offset: {offset:.1} counts");
        }
    }

    if let Some(known) = args.known_grams {
        if !json {
            println!(
                "Place {} on the scale (waiting {} ms)...",
                format_grams(known),
                args.place_delay.as_millis()
            );
        }
        std::thread::sleep(args.place_delay);
        let scale = session.calibrate(known).wrap_err("calibration failed")?;
        let cal = session.calibration();
        if json {
            println!(
                "{}",
                json!({ "calibration": { "offset": cal.offset, "scale": cal.scale } })
            );
        } else {
            println!("Scale: {scale:.4} counts/g");
            println!(
                "To reuse it, add to the config:\n[calibration]\noffset = {}\nscale = {}",
                cal.offset, cal.scale
            );
        }
    }

    if session.calibration().is_identity() {
        tracing::warn!("no calibration loaded; weights are raw counts");
    }

    if args.follow {
        let interval = session.sampler_config().read_interval;
        session.run_continuous(interval, stop, |outcome| {
            match outcome {
                Ok(reading) => print_weight(reading.grams, Some(1), json),
                Err(e) => tracing::warn!(error = %e, "reading skipped"),
            }
            ControlFlow::Continue(())
        })?;
        return Ok(());
    }

    let window = args
        .window
        .unwrap_or(session.sampler_config().average_window);
    match session.weight_average(window)? {
        Some(grams) => {
            print_weight(grams, Some(window), json);
            Ok(())
        }
        None => Err(eyre::Report::new(ScaleError::Timeout)
            .wrap_err(format!("no valid reading in {window} attempts"))),
    }
}

fn toggle_name(v: ToggleVerdict) -> &'static str {
    match v {
        ToggleVerdict::AllHigh => "all high",
        ToggleVerdict::AllLow => "all low",
        ToggleVerdict::Mixed => "mixed",
    }
}

fn line_check_json(lc: &LineCheck) -> Value {
    json!({
        "idle_level": lc.idle_level.to_string(),
        "ready_latency_ms": lc.ready_latency.map(|d| d.as_secs_f64() * 1000.0),
        "toggle_bits": lc.toggle.bits.iter().map(|b| if *b { '1' } else { '0' }).collect::<String>(),
        "toggle_verdict": toggle_name(lc.toggle.verdict),
    })
}

fn print_line_check(lc: &LineCheck) {
    let bits: String = lc
        .toggle
        .bits
        .iter()
        .map(|b| if *b { '1' } else { '0' })
        .collect();
    println!("Line checks");
    println!("  idle DOUT level: {}", lc.idle_level);
    match lc.ready_latency {
        Some(d) => println!("  data ready:      after {:.1} ms", d.as_secs_f64() * 1000.0),
        None => println!("  data ready:      never (timed out)"),
    }
    println!(
        "  toggle x{}:     {bits} ({} high, {})",
        lc.toggle.bits.len(),
        lc.toggle.highs(),
        toggle_name(lc.toggle.verdict)
    );
}

fn attempt_label(class: FaultClass, value: Option<i32>) -> String {
    match (class, value) {
        (FaultClass::Nominal, Some(v)) => v.to_string(),
        (_, Some(v)) => format!("{v}({})", class.name()),
        (_, None) => class.name().to_string(),
    }
}

fn probe_json(p: &ProbeReport) -> Value {
    json!({
        "pins": p.pins.to_string(),
        "diagnosis": format!("{:?}", p.diagnosis),
        "summary": p.diagnosis.summary(),
        "attempts": p.attempts.iter().map(|a| json!({
            "class": a.class.name(),
            "value": a.value,
        })).collect::<Vec<_>>(),
        "mean": p.stats.map(|s| s.mean),
        "spread": p.stats.map(|s| s.variance),
    })
}

fn print_probe(p: &ProbeReport) {
    println!("Candidate {}", p.pins);
    let reads: Vec<String> = p
        .attempts
        .iter()
        .map(|a| attempt_label(a.class, a.value))
        .collect();
    println!("  reads:  {}", reads.join(" "));
    println!("  result: {}", p.diagnosis);
    if let Some(s) = p.stats {
        println!("  mean {:.1}, spread {:.0}", s.mean, s.variance);
    }
}

fn print_diagnosis(line: Option<&LineCheck>, report: &DiagnosticReport, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "line_check": line.map(line_check_json),
                "probes": report.probes.iter().map(probe_json).collect::<Vec<_>>(),
                "working": report.working.map(|p| p.to_string()),
            })
        );
        return;
    }
    if let Some(lc) = line {
        print_line_check(lc);
    }
    for p in &report.probes {
        print_probe(p);
    }
    match report.working {
        Some(pins) => println!("Working wiring: {pins}"),
        None => {
            let stuck = report
                .probes
                .iter()
                .all(|p| p.diagnosis == Diagnosis::NoResponse);
            if stuck {
                println!("No candidate ever signalled data-ready; check VCC/GND first.");
            }
        }
    }
}

/// Line checks on the configured pins, then every candidate wiring.
pub fn diagnose(
    session: &mut CliSession,
    cfg: &DiagnosticsCfg,
    skip_line_checks: bool,
    json: bool,
) -> eyre::Result<()> {
    let line = if skip_line_checks {
        None
    } else {
        Some(session.line_check()?)
    };
    let report = session.diagnose(cfg)?;
    print_diagnosis(line.as_ref(), &report, json);
    if report.working.is_none() {
        eyre::bail!(
            "no working wiring found among {} candidates",
            report.probes.len()
        );
    }
    Ok(())
}

fn config_word(o: Order) -> &'static str {
    match o {
        Order::MsbFirst => "msb",
        Order::LsbFirst => "lsb",
    }
}

fn print_formats(report: &FormatReport, json: bool) {
    let chosen = report.chosen();
    if json {
        let scores: Vec<Value> = report
            .scores
            .iter()
            .map(|s| {
                json!({
                    "ordering": s.ordering.to_string(),
                    "values": s.values,
                    "mean": s.stats.map(|st| st.mean),
                    "spread": s.stats.map(|st| st.variance),
                    "suspicious": s.suspicious,
                    "degenerate": s.degenerate,
                })
            })
            .collect();
        println!(
            "{}",
            json!({
                "scores": scores,
                "best": report.best.map(|b| b.to_string()),
                "byte_order": config_word(chosen.byte_order),
                "bit_order": config_word(chosen.bit_order),
            })
        );
        return;
    }
    println!(
        "{:<9}  {:>12}  {:>10}  {:<10}",
        "ordering", "mean", "spread", "verdict"
    );
    for s in &report.scores {
        let (mean, spread) = match s.stats {
            Some(st) => (format!("{:.1}", st.mean), format!("{:.0}", st.variance)),
            None => ("-".to_string(), "-".to_string()),
        };
        let verdict = if s.degenerate {
            "degenerate"
        } else if s.suspicious {
            "suspicious"
        } else {
            "plausible"
        };
        let marker = if report.best == Some(s.ordering) { "  <- selected" } else { "" };
        println!(
            "{:<9}  {mean:>12}  {spread:>10}  {verdict:<10}{marker}",
            s.ordering.to_string()
        );
    }
    match report.best {
        Some(_) => println!(
            "Use in [hx711]: byte_order = \"{}\", bit_order = \"{}\"",
            config_word(chosen.byte_order),
            config_word(chosen.bit_order)
        ),
        None => println!("No ordering gave plausible readings; check wiring. Keeping {chosen}"),
    }
}

pub fn formats(session: &mut CliSession, samples: usize, json: bool) -> eyre::Result<()> {
    let report = session.detect_ordering(samples)?;
    print_formats(&report, json);
    Ok(())
}

/// One strict read on the configured pins.
pub fn self_check(session: &mut CliSession, json: bool) -> eyre::Result<()> {
    let pins = session.pins();
    let sample = session
        .transport_mut()
        .read_checked()
        .wrap_err_with(|| format!("self-check read on {pins} failed"))?;
    if json {
        println!(
            "{}",
            json!({ "ok": true, "pins": pins.to_string(), "raw": sample.value })
        );
    } else {
        println!("self-check ok: {pins} raw={}", sample.value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "0.0 g")]
    #[case(12.34, "12.3 g")]
    #[case(999.9, "999.9 g")]
    #[case(1000.0, "1.000 kg")]
    #[case(2500.0, "2.500 kg")]
    #[case(-1500.0, "-1.500 kg")]
    fn grams_switch_to_kilograms(#[case] g: f64, #[case] expected: &str) {
        assert_eq!(format_grams(g), expected);
    }

    #[test]
    fn binary_is_grouped_by_byte() {
        assert_eq!(
            binary_grouped(0x00_1F40),
            "00000000 00011111 01000000"
        );
        assert_eq!(binary_grouped(0xFF_FFFF), "11111111 11111111 11111111");
    }

    #[test]
    fn statuses_use_class_names() {
        assert_eq!(status(FaultClass::Nominal), "ok");
        assert_eq!(status(FaultClass::AllOnes), "all-ones");
        assert_eq!(error_status(&ScaleError::Timeout), "timeout");
        assert_eq!(
            error_status(&ScaleError::DegeneratePattern(FaultClass::AllZeros)),
            "all-zeros"
        );
    }

    #[test]
    fn attempt_labels() {
        assert_eq!(attempt_label(FaultClass::Nominal, Some(8000)), "8000");
        assert_eq!(attempt_label(FaultClass::Timeout, None), "timeout");
        assert_eq!(
            attempt_label(FaultClass::AllOnes, Some(-1)),
            "-1(all-ones)"
        );
    }
}
