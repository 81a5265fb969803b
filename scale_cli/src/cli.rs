//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file used when `--config` is not given; missing means built-in defaults.
pub const DEFAULT_CONFIG: &str = "etc/scale.toml";

#[derive(Parser, Debug)]
#[command(name = "scale", version, about = "HX711 load-cell reader and wiring diagnostics")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and logs as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// GPIO backend to drive the HX711 through
    #[arg(long, value_enum, default_value_t = Backend::Sim)]
    pub backend: Backend,

    /// Override [pins] data
    #[arg(long, value_name = "BCM")]
    pub data_pin: Option<u8>,

    /// Override [pins] clock
    #[arg(long, value_name = "BCM")]
    pub clock_pin: Option<u8>,

    /// Override [hx711] gain (128, 64 or 32)
    #[arg(long, value_name = "GAIN")]
    pub gain: Option<u32>,

    /// Enable real-time mode (SCHED_FIFO, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority and mlockall to keep the bit-banged clock pulses short and evenly spaced. Needs CAP_SYS_NICE / CAP_IPC_LOCK (or root); failures are logged and the run continues without them."
    )]
    pub rt: bool,

    /// SCHED_FIFO priority when --rt is enabled (default: max)
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,

    /// Memory locking mode for --rt: none, current, or all
    #[arg(long, value_enum, value_name = "MODE")]
    pub rt_lock: Option<RtLock>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Backend {
    /// Built-in device emulator configured by [simulator]
    Sim,
    /// Raspberry Pi GPIO (needs the `hardware` feature)
    Gpio,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print raw conversions as a debug table (value, hex, binary, status)
    Read {
        /// Number of exchanges
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Treat all-ones / all-zeros / saturated words as errors
        #[arg(long, action = ArgAction::SetTrue)]
        strict: bool,
        /// Keep reading every [sampling] read_interval_ms until Ctrl-C
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "strict")]
        follow: bool,
    },
    /// Tare, optionally calibrate against a known weight, then weigh
    Weigh {
        /// Keep the offset from [calibration] instead of taring now
        #[arg(long, action = ArgAction::SetTrue)]
        skip_tare: bool,
        /// Calibrate with a reference weight of this many grams
        #[arg(long, value_name = "GRAMS")]
        known_grams: Option<f64>,
        /// Time to place the reference weight after taring
        #[arg(long, value_name = "MS", default_value_t = 5000)]
        place_delay_ms: u64,
        /// Reads averaged per weight (default: [sampling] average_window)
        #[arg(long, value_name = "N")]
        window: Option<usize>,
        /// Keep weighing until Ctrl-C
        #[arg(long, action = ArgAction::SetTrue)]
        follow: bool,
    },
    /// Probe the wiring: line checks, then every candidate pin assignment
    Diagnose {
        /// Skip the idle-level / ready-latency / toggle checks
        #[arg(long, action = ArgAction::SetTrue)]
        skip_line_checks: bool,
    },
    /// Compare byte/bit orderings and report the most plausible one
    Formats {
        /// Reads per ordering (default: [diagnostics] format_samples)
        #[arg(long, value_name = "N")]
        samples: Option<usize>,
    },
    /// Quick health check: one strict read on the configured pins
    SelfCheck,
}
