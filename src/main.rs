//! linkmux — serial link host entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SerialTransport ×2     LogEventSink       JsonConfigFile      │
//! │  (reader / writer)      (EventSink)        (ConfigPort)        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           Gateway (registry · dispatcher)              │    │
//! │  │  link-reader thread ─▶ profile state ─▶ drivers        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Registers every configured profile, reports the controller's firmware
//! version and RAM, then cycles: toggle each digital output, send the
//! next queued command of each UART bridge.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use linkmux::Gateway;
use linkmux::adapters::config_file::JsonConfigFile;
use linkmux::adapters::log_sink::LogEventSink;
use linkmux::adapters::serial::SerialTransport;
use linkmux::app::ports::{ConfigError, ConfigPort, EventSink};
use linkmux::config::LinkConfig;
use linkmux::profile::ProfileState;
use linkmux::rpc::schema::{PinMode, ProfileConfig, UartCommand};

/// Drive peripheral profiles on a microcontroller over one serial link
#[derive(Parser, Debug)]
#[command(name = "linkmux", version, long_about = None)]
struct Args {
    /// Path to the JSON link configuration
    #[arg(short, long, default_value = "linkmux.json")]
    config: PathBuf,

    /// Serial device, overrides the configured port
    #[arg(short, long)]
    port: Option<String>,

    /// Delay between demo cycles in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Number of demo cycles (0 = run forever)
    #[arg(long, default_value_t = 0)]
    cycles: u64,

    /// Command sent to every UART bridge each cycle
    #[arg(long)]
    uart_command: Vec<String>,

    /// Write the effective configuration back to --config and exit
    #[arg(long, default_value_t = false)]
    save_config: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let store = JsonConfigFile::new(&args.config);
    let mut config = match store.load() {
        Ok(config) => config,
        Err(ConfigError::NotFound) => {
            warn!("{} not found, using defaults", args.config.display());
            LinkConfig::default()
        }
        Err(e) => return Err(e).context("loading link configuration"),
    };
    if let Some(port) = args.port.clone() {
        config.port = port;
    }
    for id in config.duplicate_ids() {
        warn!("profile {} declared more than once; the last declaration wins", id);
    }

    if args.save_config {
        store.save(&config).context("saving link configuration")?;
        return Ok(());
    }

    let writer = SerialTransport::open(&config)
        .with_context(|| format!("opening serial port {}", config.port))?;
    let reader = writer.try_clone().context("cloning serial handle")?;

    // The controller resets when the port opens.
    info!("waiting {} ms for the controller to boot", config.startup_delay_ms);
    thread::sleep(config.startup_delay());

    let sink: Arc<dyn EventSink> = Arc::new(LogEventSink::new());
    let gateway = Gateway::start(reader, writer, &config, sink)?;

    gateway.add_configured_profiles(&config.profiles);
    if let Err(e) = gateway.register_all() {
        warn!("not every profile registered: {}", e);
    }

    report_controller(&gateway, &config);

    let uart_commands: Vec<UartCommand> = args
        .uart_command
        .iter()
        .map(|text| UartCommand {
            command: text.clone(),
            event_triggered: false,
        })
        .collect();

    let interval = Duration::from_millis(args.interval_ms);
    let mut cycle = 0u64;
    while args.cycles == 0 || cycle < args.cycles {
        run_cycle(&gateway, &config, &uart_commands);
        cycle += 1;
        thread::sleep(interval);
    }

    gateway.shutdown();
    Ok(())
}

fn report_controller(gateway: &Gateway<SerialTransport>, config: &LinkConfig) {
    for spec in &config.profiles {
        if spec.driver != ProfileConfig::McuDriver {
            continue;
        }
        match gateway.mcu_version(spec.id) {
            Ok(version) => info!("controller firmware: {}", version),
            Err(e) => warn!("firmware version query failed: {}", e),
        }
        match gateway.mcu_ram(spec.id) {
            Ok(ram) => info!(
                "controller RAM: {} / {} bytes used ({:.1}%)",
                ram.used(),
                ram.total,
                ram.used_percent()
            ),
            Err(e) => warn!("RAM query failed: {}", e),
        }
    }
}

fn run_cycle(gateway: &Gateway<SerialTransport>, config: &LinkConfig, uart: &[UartCommand]) {
    for spec in &config.profiles {
        if gateway.state(spec.id) != Some(ProfileState::Idle) {
            continue;
        }
        let outcome = match &spec.driver {
            ProfileConfig::DigitalGeneric {
                mode: PinMode::Output,
                ..
            } => gateway.toggle_digital(spec.id).map(|level| {
                info!("profile {}: output now {:?}", spec.id, level);
            }),
            ProfileConfig::UartTtlGeneric { .. } if !uart.is_empty() => gateway
                .queue_uart_commands(spec.id, uart.iter().cloned())
                .and_then(|()| while_sent(gateway, spec.id)),
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            warn!("profile {}: {}", spec.id, e);
        }
    }
}

/// Drain the UART queue, waiting for each reply.
fn while_sent(gateway: &Gateway<SerialTransport>, id: u8) -> linkmux::Result<()> {
    while gateway.send_next_uart(id)? {
        gateway.await_idle(id)?;
        if let Some(reply) = gateway.uart_response(id)? {
            info!("profile {}: uart reply {:?}", id, reply);
        }
    }
    Ok(())
}
