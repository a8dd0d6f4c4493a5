//! Simulated H7RS board.
//!
//! Brings up the extended time base on a real-time simulated timer, maps the
//! PSRAM, then walks a light across the user LEDs using busy-wait delays and
//! prints periodic time base status on the debug console.

mod signals;

use anyhow::{Context, Result};
use bsp_common::config::BoardConfig;
use bsp_common::time::{ticks_to_ms, Timestamp};
use bsp_drivers::psram::{READ_REG_CMD, WRITE_REG_CMD};
use bsp_drivers::{
    Board, ByteSink, OutputPin, SimulatedPin, SimulatedXspi, StdoutSink, UserLed, XspiBus,
};
use bsp_timebase::{SimulatedTimer, TickSource, TimeBase, TimerPeripheral};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::signals::SignalHandler;

/// Board daemon command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "bsp-daemon",
    about = "Simulated H7RS board - extended time base with LED and console output",
    version,
    long_about = None
)]
struct Args {
    /// Path to a board configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this long (e.g. "10s", "2m"). Runs until signalled if unset.
    #[arg(long, short = 'd', value_name = "DURATION")]
    run_for: Option<humantime::Duration>,

    /// Skip PSRAM bring-up.
    #[arg(long)]
    no_psram: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

/// Counters reported when the run loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunSummary {
    blinks: u64,
    reports: u64,
    uptime_ticks: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting board daemon");

    let mut config = load_config(&args)?;
    if args.no_psram {
        config.psram.enabled = false;
    }

    info!(
        blink_period = %humantime::format_duration(config.daemon.blink_period),
        status_interval = %humantime::format_duration(config.daemon.status_interval),
        psram = config.psram.enabled,
        "Configuration loaded"
    );

    let signals = SignalHandler::new().context("Failed to set up signal handlers")?;

    let time_base = TimeBase::init(
        SimulatedTimer::realtime(config.clock.clone()),
        &config.timebase,
    )
    .context("Failed to start time base")?;

    let pins: [SimulatedPin; 4] = Default::default();
    let mut board = Board::new(
        SimulatedXspi::new(WRITE_REG_CMD, READ_REG_CMD),
        pins,
        StdoutSink,
    );
    board
        .init(&config.psram)
        .context("Failed to bring up board peripherals")?;

    let summary = run_board(
        &config,
        &time_base,
        &mut board,
        &signals,
        args.run_for.map(Into::into),
    )?;

    board.leds.all_off();
    time_base.teardown().context("Failed to stop time base")?;

    info!(
        blinks = summary.blinks,
        reports = summary.reports,
        uptime_ms = summary.uptime_ticks / 1_000,
        signals = signals.state().signal_count(),
        "Daemon shutdown complete"
    );
    Ok(())
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!(
        "bsp_daemon={level},bsp_timebase={level},bsp_drivers={level},bsp_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `BSP_CONFIG_PATH` environment variable
/// 3. `/etc/bsp/config.toml` (system path)
/// 4. `config/default.toml` (local development)
/// 5. Built-in defaults
fn load_config(args: &Args) -> Result<BoardConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return BoardConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("BSP_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from BSP_CONFIG_PATH");
            return BoardConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from BSP_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "BSP_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    for candidate in ["/etc/bsp/config.toml", "config/default.toml"] {
        let config_path = PathBuf::from(candidate);
        if config_path.exists() {
            info!(?config_path, "Loading config file");
            return BoardConfig::from_file(&config_path)
                .with_context(|| format!("Failed to load config from {config_path:?}"));
        }
    }

    info!("No config file found, using built-in defaults");
    Ok(BoardConfig::default())
}

/// Whole microsecond ticks in `duration`, saturating at the 32-bit range.
fn duration_to_ticks(duration: Duration) -> u32 {
    u32::try_from(duration.as_micros()).unwrap_or(u32::MAX)
}

/// Blink and report until shutdown is requested or `run_for` has elapsed.
fn run_board<T, B, P, S>(
    config: &BoardConfig,
    time_base: &TimeBase<T>,
    board: &mut Board<B, P, S>,
    signals: &SignalHandler,
    run_for: Option<Duration>,
) -> Result<RunSummary>
where
    T: TimerPeripheral,
    B: XspiBus,
    P: OutputPin,
    S: ByteSink,
{
    // A zero period would spin without ever blinking
    let blink_ticks = duration_to_ticks(config.daemon.blink_period).max(1);
    let status_ticks = duration_to_ticks(config.daemon.status_interval).max(1);
    let limit = run_for.map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX));

    let mut summary = RunSummary::default();
    let mut last = time_base.raw_ticks();
    let mut since_status = 0u64;
    let mut lit: Option<UserLed> = None;

    info!(blink_ticks, status_ticks, "Entering blink loop");

    loop {
        signals.poll();
        if signals.shutdown_requested() {
            info!("Shutdown signal received, leaving blink loop");
            break;
        }

        let next = UserLed::ALL[usize::try_from(summary.blinks % 4).unwrap_or(0)];
        if let Some(prev) = lit {
            board.leds.set(prev, false);
        }
        board.leds.set(next, true);
        lit = Some(next);
        summary.blinks += 1;

        time_base.delay_ticks(blink_ticks);

        // Accumulate in 64 bits so uptime survives the 32-bit rollover
        let now = time_base.raw_ticks();
        let step = u64::from(now.ticks_since(last));
        last = now;
        summary.uptime_ticks += step;
        since_status += step;

        if since_status >= u64::from(status_ticks) || signals.take_status_request() {
            since_status = 0;
            report_status(time_base, board, now, summary.uptime_ticks)?;
            summary.reports += 1;
        }

        if limit.is_some_and(|limit| summary.uptime_ticks >= limit) {
            info!(uptime_ticks = summary.uptime_ticks, "Run duration reached");
            break;
        }
    }

    Ok(summary)
}

/// Print one status line on the debug console.
fn report_status<T, B, P, S>(
    time_base: &TimeBase<T>,
    board: &mut Board<B, P, S>,
    now: Timestamp,
    uptime_ticks: u64,
) -> Result<()>
where
    T: TimerPeripheral,
    B: XspiBus,
    P: OutputPin,
    S: ByteSink,
{
    let sample = time_base.sample();
    board
        .console
        .writeln_crlf(format_args!(
            "[{}ms] fine={} coarse={} wraps={} uptime={}ms psram={}",
            ticks_to_ms(now.ticks()),
            sample.fine(),
            sample.coarse(),
            sample.upper,
            uptime_ticks / 1_000,
            if board.psram_ready() { "mapped" } else { "off" },
        ))
        .context("Failed to write status line")
}
