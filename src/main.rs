//! relayd: two-relay wall controller supervisor.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SysfsDevices      MqttBridge / LogEventSink   MonotonicClock│
//! │  (DevicePort)      (EventSink, via binding)    (TimePort)    │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │             RelayService (domain core)                 │  │
//! │  │  gestures · shadows · screen idle timer                │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Reactor (poll, 50 ms) · TaskScheduler · mqtt thread         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::{Identity, Layered};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, reload};

use relayd::adapters::binding::ButtonBinding;
use relayd::adapters::log_sink::LogEventSink;
use relayd::adapters::mqtt::{self, MqttBridge, RumqttBus, Topics};
use relayd::adapters::time::MonotonicClock;
use relayd::app::commands::AppCommand;
use relayd::app::ports::{CommandPort, EventSink};
use relayd::app::service::{RELAY_COUNT, RelayService, ServiceSettings};
use relayd::config::{DEFAULT_CONFIG_PATH, RelayConfig};
use relayd::drivers::sysfs::{self, InputSources, SysfsDevices};
use relayd::pins::DevicePaths;
use relayd::reactor::Reactor;
use relayd::scheduler::TaskScheduler;

type Service<E> = RelayService<SysfsDevices, E>;
type BusSink = ButtonBinding<MqttBridge<RumqttBus>>;
type LocalSink = ButtonBinding<LogEventSink>;

type FileLayer = Box<dyn Layer<Registry> + Send + Sync>;
type FileSlot = reload::Layer<FileLayer, Registry>;

/// Rotated log files kept next to the live one.
const LOG_FILES_KEPT: usize = 2;

#[derive(Debug, Parser)]
#[command(name = "relayd", version, about = "Two-relay wall controller supervisor")]
struct Args {
    /// Configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Debug logging (RUST_LOG still wins).
    #[arg(long)]
    debug: bool,

    /// Ignore `mqtt_address` and run local-only.
    #[arg(long)]
    no_bus: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut logging = Logging::init(args.debug)?;
    info!("relayd v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if config.debug && !args.debug {
        logging
            .filter
            .reload(log_filter(true))
            .context("raising log level")?;
    }
    if let Some(path) = &config.log_file {
        logging.open_file(path)?;
        info!("logging to {}", path.display());
    }

    // ── Devices ───────────────────────────────────────────────
    let paths = DevicePaths::default();
    if let Err(e) = sysfs::configure_button_edges(&paths) {
        warn!("button edge setup failed: {}", e);
    }
    let (devices, mut inputs) =
        sysfs::open_all(&paths, config.ambient_light).context("opening devices")?;
    inputs.discard_initial_button_values();

    // ── Sink: MQTT bridge or local-only ───────────────────────
    let flags = [config.button_flags(0), config.button_flags(1)];
    let broker = if args.no_bus { None } else { config.broker() };

    match broker {
        Some(broker) => {
            let sched: TaskScheduler<Service<BusSink>> = TaskScheduler::new(MonotonicClock);
            let commands: Arc<dyn CommandPort> = Arc::new(sched.async_handle());
            let (bus, _connection) = mqtt::connect(&config, &broker, Arc::clone(&commands))
                .context("starting MQTT client")?;
            let bridge = MqttBridge::new(bus, Topics::new(&config.mqtt_topic_prefix), flags);
            let sink = ButtonBinding::new(flags, commands, bridge);
            serve(&config, devices, inputs, sink, sched)
        }
        None => {
            info!("no broker configured; running local-only");
            let sched: TaskScheduler<Service<LocalSink>> = TaskScheduler::new(MonotonicClock);
            let commands: Arc<dyn CommandPort> = Arc::new(sched.async_handle());
            let sink = ButtonBinding::new(flags, commands, LogEventSink::new());
            serve(&config, devices, inputs, sink, sched)
        }
    }
}

/// Build the core, queue the startup commands and run the reactor until
/// `poll` fails.
fn serve<E: EventSink + 'static>(
    config: &RelayConfig,
    devices: SysfsDevices,
    inputs: InputSources,
    sink: E,
    mut sched: TaskScheduler<Service<E>>,
) -> Result<()> {
    let mut service = RelayService::new(devices, sink, ServiceSettings::from(config));

    // Executed on the first scheduler tick.
    let startup = sched.async_handle();
    for relay in 0..RELAY_COUNT {
        if let Some(on) = config.initial_relay_state(relay) {
            startup.send(AppCommand::SetRelay { relay, on });
        }
    }
    startup.send(AppCommand::SetScreen(true));

    service.start(&mut sched);
    let mut reactor = Reactor::new(inputs);
    reactor
        .run(&mut service, &mut sched)
        .context("reactor stopped")
}

fn log_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }))
}

/// Console subscriber (which also captures `log` records), plus the
/// handles the config file uses to raise the level and add a log file.
struct Logging {
    filter: reload::Handle<EnvFilter, Layered<FileSlot, Registry>>,
    file: reload::Handle<FileLayer, Registry>,
    _flush: Option<WorkerGuard>,
}

impl Logging {
    fn init(debug: bool) -> Result<Self> {
        let empty: FileLayer = Identity::new().boxed();
        let (file, file_handle) = reload::Layer::new(empty);
        let (filter, filter_handle) = reload::Layer::new(log_filter(debug));
        tracing_subscriber::registry()
            .with(file)
            .with(filter)
            .with(fmt::layer())
            .try_init()
            .context("installing log subscriber")?;
        Ok(Self {
            filter: filter_handle,
            file: file_handle,
            _flush: None,
        })
    }

    /// Also write to `path`, rotated daily.
    fn open_file(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .with_context(|| format!("log_file {} names no file", path.display()))?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(name.to_string_lossy().into_owned())
            .max_log_files(LOG_FILES_KEPT)
            .build(dir)
            .with_context(|| format!("opening log file {}", path.display()))?;

        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer: FileLayer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
        self.file
            .reload(layer)
            .context("installing log file")?;
        self._flush = Some(guard);
        Ok(())
    }
}
