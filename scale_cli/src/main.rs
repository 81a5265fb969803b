mod backend;
mod cli;
mod commands;
mod error_fmt;
mod rt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use scale_config::Config;
use scale_core::DiagnosticsCfg;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, JSON_MODE, RtLock};
use crate::commands::WeighArgs;
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(err) = run(cli) {
        tracing::debug!(error = ?err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

/// An explicit `--config` must exist; the default path may be absent.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    match path {
        Some(p) => scale_config::load_file(p),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() {
                scale_config::load_file(p)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn apply_overrides(file_cfg: &Config, cli: &Cli) -> eyre::Result<Config> {
    let mut cfg = file_cfg.clone();
    if let Some(pin) = cli.data_pin {
        cfg.pins.data = pin;
    }
    if let Some(pin) = cli.clock_pin {
        cfg.pins.clock = pin;
    }
    if let Some(gain) = cli.gain {
        cfg.hx711.gain = gain;
    }
    cfg.validate()
        .wrap_err("validating config with command-line overrides")?;
    Ok(cfg)
}

/// Install console (and optional file) logging. The returned guard flushes the
/// file sink when dropped, so it must outlive the command.
fn init_tracing(
    level: &str,
    json: bool,
    logging: &scale_config::Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let console_text = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let mut guard = None;
    let file_layer = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let Some(name) = path.file_name() else {
                eyre::bail!("logging.file {file:?} has no file name");
            };
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_text)
        .with(file_layer)
        .try_init()
        .wrap_err("installing log subscriber")?;
    Ok(guard)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let file_cfg = load_config(cli.config.as_deref())?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| file_cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let _log_guard = init_tracing(&level, cli.json, &file_cfg.logging)?;

    let cfg = apply_overrides(&file_cfg, &cli)?;

    if cli.rt {
        rt::setup_rt_once(cli.rt_prio, cli.rt_lock.unwrap_or_else(RtLock::os_default));
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "Ctrl-C handler not installed");
        }
    }

    let port = backend::open_port(cli.backend, &file_cfg)?;
    let mut session = backend::build_session(&cfg, port)?;
    tracing::info!(pins = %session.pins(), backend = ?cli.backend, "session ready");

    let json = cli.json;
    match cli.cmd {
        Commands::Read {
            count,
            strict,
            follow,
        } => {
            if follow {
                commands::read_follow(&mut session, &stop, json)
            } else {
                commands::read(&mut session, count, strict, json)
            }
        }
        Commands::Weigh {
            skip_tare,
            known_grams,
            place_delay_ms,
            window,
            follow,
        } => {
            let args = WeighArgs {
                skip_tare,
                known_grams,
                place_delay: Duration::from_millis(place_delay_ms),
                window,
                follow,
            };
            commands::weigh(&mut session, &args, &stop, json)
        }
        Commands::Diagnose { skip_line_checks } => {
            let diag = DiagnosticsCfg::from(&cfg.diagnostics);
            commands::diagnose(&mut session, &diag, skip_line_checks, json)
        }
        Commands::Formats { samples } => {
            let n = samples.unwrap_or(cfg.diagnostics.format_samples);
            commands::formats(&mut session, n, json)
        }
        Commands::SelfCheck => commands::self_check(&mut session, json),
    }
}
