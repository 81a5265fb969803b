//! Human-readable error descriptions and structured JSON error formatting.

use scale_core::{CalibrationError, FaultClass, ScaleError};
use scale_hardware::HwError;

fn scale_error_text(e: &ScaleError) -> String {
    match e {
        ScaleError::Timeout => "What happened: The HX711 never signalled data-ready (DOUT stayed HIGH).\nLikely causes: No power to the module, DOUT/SCK on other pins or swapped, or hx711.ready_timeout_ms too low.\nHow to fix: Check VCC/GND, verify [pins] in the config, and run `scale diagnose` to probe the wiring.".to_string(),
        ScaleError::DegeneratePattern(class) => match class {
            FaultClass::AllOnes => "What happened: Every bit read back HIGH.\nLikely causes: DOUT/SCK swapped, or the clock line not reaching the chip.\nHow to fix: Run `scale diagnose`; it also tries the swapped assignment.".to_string(),
            FaultClass::AllZeros => "What happened: Every bit read back LOW.\nLikely causes: DOUT shorted to ground, or the load cell not connected to the amplifier.\nHow to fix: Check the DOUT wire and the E+/E-/A+/A- load cell connections.".to_string(),
            FaultClass::SaturatedMiddleByte => "What happened: The reading saturates (middle byte 0xFF).\nLikely causes: Load cell excitation problem, overload, or a gain too high for the signal.\nHow to fix: Check the load cell wiring and try `--gain 64`.".to_string(),
            other => format!(
                "What happened: Suspicious sample pattern ({other}).\nLikely causes: Clock timing slip or a wrong bit order.\nHow to fix: Run `scale formats` and consider `--rt`."
            ),
        },
        ScaleError::Calibration(c) => match c {
            CalibrationError::NoSamples => "What happened: Calibration got no valid readings.\nLikely causes: Every read in the window timed out or looked like a wiring fault.\nHow to fix: Run `scale read` to check the raw values first.".to_string(),
            CalibrationError::ZeroReferenceWeight => "What happened: The reference weight was zero.\nLikely causes: --known-grams 0 was passed.\nHow to fix: Pass the mass of the reference weight in grams.".to_string(),
            CalibrationError::ZeroScale => "What happened: The reading did not change after placing the reference weight, so no scale factor could be derived.\nLikely causes: The weight was not on the platform in time, or the load cell is not connected.\nHow to fix: Increase --place-delay-ms and check the load cell wiring.".to_string(),
            CalibrationError::NonFinite => "What happened: Calibration produced a non-finite value.\nLikely causes: Corrupt readings or an invalid [calibration] section.\nHow to fix: Remove [calibration] from the config and calibrate again.".to_string(),
        },
        ScaleError::Backend(msg) => format!(
            "What happened: GPIO access failed ({msg}).\nLikely causes: Pins in use by another process, missing permissions, or a non-Raspberry Pi host.\nHow to fix: Free the pins, add the user to the gpio group, or use `--backend sim`."
        ),
        ScaleError::Config(msg) => format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or the overrides, then rerun."
        ),
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return scale_error_text(se);
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::PinUnavailable(pin) => format!(
                "What happened: GPIO{pin} is unavailable.\nLikely causes: Another process owns the pin, or it does not exist on this board.\nHow to fix: Stop the other process or pick different [pins]."
            ),
            other => format!(
                "What happened: GPIO initialisation failed ({other}).\nLikely causes: Not running on a Raspberry Pi, or no access to /dev/gpiomem.\nHow to fix: Add the user to the gpio group, or use `--backend sim`."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
    let msg = chain.join(": ");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reading config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Check the path; without --config the built-in defaults are used. Details: {msg}"
        );
    }

    if lower.contains("parsing config") || lower.contains("validating config") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: A typo, an unknown value, or an out-of-range setting.\nHow to fix: Edit the TOML and try again. Details: {msg}"
        );
    }

    if lower.contains("no working wiring") {
        return format!(
            "What happened: No candidate pin assignment produced valid data ({msg}).\nLikely causes: Module unpowered, broken wires, or pins outside the candidate list.\nHow to fix: Check VCC/GND, then add the actual pins to diagnostics.alternate_pins."
        );
    }

    if lower.contains("gpio backend unavailable") {
        return format!(
            "What happened: The gpio backend is not compiled in.\nLikely causes: Binary built without the `hardware` feature.\nHow to fix: {msg}"
        );
    }

    // Generic fallback
    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::Timeout) => 3,
        Some(ScaleError::DegeneratePattern(_)) => 4,
        Some(ScaleError::Calibration(_)) => 5,
        Some(ScaleError::Backend(_)) => 6,
        Some(ScaleError::Config(_)) => 7,
        None if err.downcast_ref::<HwError>().is_some() => 6,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::Timeout) => "Timeout",
        Some(ScaleError::DegeneratePattern(_)) => "DegeneratePattern",
        Some(ScaleError::Calibration(_)) => "Calibration",
        Some(ScaleError::Backend(_)) => "Backend",
        Some(ScaleError::Config(_)) => "Config",
        None if err.downcast_ref::<HwError>().is_some() => "Backend",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(ScaleError::DegeneratePattern(class)) = err.downcast_ref::<ScaleError>() {
        obj["details"] = json!({ "pattern": class.name() });
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(ScaleError::Timeout, 3, "data-ready")]
    #[case(ScaleError::DegeneratePattern(FaultClass::AllOnes), 4, "HIGH")]
    #[case(ScaleError::Calibration(CalibrationError::ZeroScale), 5, "did not change")]
    #[case(ScaleError::Backend("chip gone".into()), 6, "chip gone")]
    #[case(ScaleError::Config("missing clock".into()), 7, "missing clock")]
    fn typed_errors_map_to_text_and_codes(
        #[case] e: ScaleError,
        #[case] code: i32,
        #[case] needle: &str,
    ) {
        let report = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&report), code);
        assert!(humanize(&report).contains(needle));
    }

    #[test]
    fn wrapped_scale_errors_are_still_recognised() {
        let r: Result<(), ScaleError> = Err(ScaleError::Timeout);
        let report = r.wrap_err("tare failed").unwrap_err();
        assert_eq!(exit_code_for_error(&report), 3);
        assert!(humanize(&report).starts_with("What happened: The HX711"));
    }

    #[test]
    fn config_errors_use_heuristics() {
        let report = eyre::eyre!("pins.data and pins.clock must differ")
            .wrap_err("validating config etc/scale.toml");
        let text = humanize(&report);
        assert!(text.contains("Configuration is invalid"));
        assert!(text.contains("must differ"));
        assert_eq!(exit_code_for_error(&report), 1);
    }

    #[test]
    fn json_errors_carry_reason_and_code() {
        let report = eyre::Report::new(ScaleError::DegeneratePattern(FaultClass::AllZeros));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "DegeneratePattern");
        assert_eq!(v["exit_code"], 4);
        assert_eq!(v["details"]["pattern"], "all-zeros");
    }
}
