#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = scale_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // a validated config must always yield distinct pins
            assert_ne!(cfg.pins.data, cfg.pins.clock);
        }
    }
});
