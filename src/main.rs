//! # MMDVM Host Link
//!
//! Runs the modem side of the MMDVM host link on a serial port, backed by
//! simulated D-Star, DMR and System Fusion engines.
//!
//! Useful for exercising host software (MMDVMHost and friends) without a
//! radio attached: the host sees a modem that answers every command, reports
//! buffer space and keying state, and drains its transmit queues in real time.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, defaults otherwise)
//!    - Set up logging with tracing subscriber
//!    - Open the serial port (configured path, then the usual USB devices)
//!
//! 2. **Main Loop**
//!    - Feed received bytes to the host link
//!    - Write queued replies to the port
//!    - Advance the simulated transmitters once per frame airtime
//!    - Drop partial frames that stall longer than `frame_timeout_ms`
//!
//! 3. **Graceful Shutdown** on Ctrl+C or when the device goes away
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/hostlink.toml
//! ```

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use mmdvm_hostlink::config::{Config, LoggingConfig};
use mmdvm_hostlink::modem::sim::SimModem;
use mmdvm_hostlink::modem::{Diagnostics, HostLink, OutboundQueue};
use mmdvm_hostlink::serial::HostSerial;

/// File name prefix for the daily log file
const LOG_FILE_PREFIX: &str = "mmdvm-hostlink.log";

/// Install the global subscriber
///
/// `RUST_LOG` overrides the configured level. The returned guard must stay
/// alive for the file writer to flush.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Write every queued reply to the port
async fn drain_outbound(link: &mut HostLink, serial: &mut HostSerial) -> Result<()> {
    while let Some(frame) = link.sink_mut().pop() {
        serial.send_frame(&frame.bytes, frame.flush).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);

    info!("MMDVM host link v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut serial = HostSerial::open_or_detect(&config.serial.port, config.serial.baud_rate)?;
    info!("Serial port opened at: {}", serial.device_path());

    let sim = SimModem::new(&config.engines);
    let mut link = HostLink::new(sim.engines(), OutboundQueue::new());
    if config.link.diagnostics {
        info!("Diagnostic frames enabled");
        link = link.with_diagnostics(Diagnostics::new());
    }

    let frame_timeout = match config.link.frame_timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };

    let mut poll = interval(Duration::from_millis(config.link.poll_interval_ms));
    let mut airtime = interval(Duration::from_millis(config.engines.airtime_ms));
    airtime.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buf = vec![0u8; config.serial.read_buffer_size];
    let mut last_byte = Instant::now();

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            read = serial.read_available(&mut buf) => {
                let n = read?;
                if n == 0 {
                    warn!("Serial device closed");
                    break;
                }
                link.process(&buf[..n]);
                last_byte = Instant::now();
            }

            _ = poll.tick() => {
                link.expire_stalled(last_byte.elapsed(), frame_timeout);
            }

            _ = airtime.tick() => {
                sim.tick();
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }

        drain_outbound(&mut link, &mut serial).await?;
    }

    if let Some(diagnostics) = link.diagnostics() {
        debug!("Diagnostic frames sent: {}", diagnostics.frames_sent());
    }
    info!("Final mode: {}", link.mode());

    Ok(())
}
