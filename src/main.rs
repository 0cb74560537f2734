//! # RC Transmitter
//!
//! Host bench for the transmitter core: pin levels come from the
//! configuration file, status codes and session hooks are logged, and the
//! pulse frames are re-emitted by a background task.

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use rc_transmitter::config::Config;
use rc_transmitter::hal::bench::{BenchInputs, LogDisplay, LogSession, MonotonicClock};
use rc_transmitter::hal::Clock;
use rc_transmitter::output::{run_emitter, PulseBuffer};
use rc_transmitter::settings::storage::TomlStorage;
use rc_transmitter::transmitter::{Peripherals, Transmitter};

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of ticks between status log messages
const LOG_INTERVAL_TICKS: u64 = 250;

/// Main entry point for the transmitter bench
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load the configuration (first argument or `config/default.toml`)
///    - Check and load the settings file, start the transmitter
///    - Spawn the frame re-emitter
///
/// 2. **Main Loop**
///    - Run one transmitter tick per scheduler period
///    - SIGHUP commits edited settings (reloaded in command mode)
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or a signal handler
/// cannot be installed.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("RC Transmitter v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    info!("Configuration loaded from {}", config_path);

    let storage = TomlStorage::new(&config.storage.settings_path);
    info!("Settings file: {}", storage.path().display());

    let pulses = PulseBuffer::new();
    let frames = pulses.subscribe();

    let peripherals = Peripherals {
        inputs: Box::new(BenchInputs::from_config(&config.bench)),
        storage: Box::new(storage),
        session: Box::new(LogSession),
        displays: vec![
            Box::new(LogDisplay::new("led")),
            Box::new(LogDisplay::new("buzzer")),
        ],
        output: Box::new(pulses),
    };

    let clock = MonotonicClock::new();
    let mut tx = Transmitter::start(&config, peripherals);

    let frame_period = Duration::from_millis(config.scheduler.frame_period_ms);
    let emitter = tokio::spawn(run_emitter(frames, frame_period, |frame| {
        debug!("Pulse frame {:?}", frame);
    }));

    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    let mut ticker = interval(Duration::from_millis(config.scheduler.tick_period_ms));
    let mut tick_count: u64 = 0;

    info!(
        "Starting transmitter loop ({}ms ticks, {}ms frames)",
        config.scheduler.tick_period_ms, config.scheduler.frame_period_ms
    );
    info!("Send SIGHUP to reload settings, Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = tx.tick(clock.millis());
                tick_count += 1;

                if tick_count % LOG_INTERVAL_TICKS == 0 {
                    info!(
                        "{} ticks, mode {:?}, alarm {:?}, armed {}, frame {:?}",
                        tick_count,
                        tx.run_mode(),
                        tx.alarm(),
                        tx.engine_armed(),
                        frame
                    );
                }
            }

            _ = hangup.recv() => {
                info!("Received SIGHUP, committing settings");
                tx.commit_changes();
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total ticks: {}", tick_count);
                break;
            }
        }
    }

    // Dropping the transmitter closes the pulse buffer and stops the emitter
    drop(tx);
    let emitted = emitter.await.context("frame emitter task failed")?;
    info!("Total frames emitted: {}", emitted);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_interval_constant() {
        assert_eq!(LOG_INTERVAL_TICKS, 250);

        // At the default 20ms tick, 250 ticks = 5 seconds
        let config = Config::default();
        let seconds = LOG_INTERVAL_TICKS * config.scheduler.tick_period_ms / 1000;
        assert_eq!(seconds, 5);
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = Config::load(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config.scheduler.tick_period_ms, 20);
    }

    #[test]
    fn test_shipped_settings_pass_integrity_check() {
        use rc_transmitter::settings::storage::SettingsStorage;

        let config = Config::load(DEFAULT_CONFIG_PATH).unwrap();
        let mut storage = TomlStorage::new(&config.storage.settings_path);
        assert!(storage.check_valid());
    }
}
