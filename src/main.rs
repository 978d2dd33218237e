use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use svcrunner::{
    ControlCode, ControlSender, LocalServiceManager, Service, ServiceConfig, ServiceError,
    ServiceHooks, WorkerContext,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "svcrunner")]
#[command(about = "Host a background worker under a service lifecycle state machine")]
#[command(version)]
#[command(long_about = "Runs a heartbeat worker as a managed service. Control codes are read \
from stdin (stop, pause, continue, shutdown, interrogate or a raw number); Ctrl+C requests a \
stop and SIGTERM a shutdown.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "svcrunner.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the service")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Print the reported status history as JSON on exit
    #[arg(long, help = "Print every status report as JSON when the service stops")]
    status_json: bool,

    /// Arguments handed to the worker
    #[arg(trailing_var_arg = true)]
    worker_args: Vec<String>,
}

/// Worker that logs a heartbeat every tick until stopped
struct HeartbeatWorker {
    tick: Duration,
    beats: AtomicU64,
}

impl HeartbeatWorker {
    fn new(tick: Duration) -> Self {
        Self {
            tick,
            beats: AtomicU64::new(0),
        }
    }
}

impl ServiceHooks for HeartbeatWorker {
    fn on_startup(&self) {
        info!("Heartbeat service starting");
    }

    fn worker(&self, context: WorkerContext, args: &[String]) -> u32 {
        info!("Heartbeat worker running with args {:?}", args);
        while context.idle(self.tick) {
            let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(beat, "heartbeat");
        }
        info!(
            "Heartbeat worker finished after {} beats",
            self.beats.load(Ordering::Relaxed)
        );
        0
    }

    fn on_stop(&self) {
        info!("Stop requested");
    }

    fn on_pause(&self) {
        info!("Pause requested");
    }

    fn on_continue(&self) {
        info!("Continue requested");
    }

    fn on_exit(&self) {
        info!("Heartbeat service exiting");
    }

    fn on_error(&self, error: &ServiceError) {
        error!("Heartbeat service failed to start: {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let config = match ServiceConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let log_guard = init_logging(&args, &config)?;

    info!("Starting svcrunner v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    let manager = Arc::new(LocalServiceManager::new(args.worker_args.clone()));
    let cancel = CancellationToken::new();
    let controls = tokio::spawn(forward_controls(manager.control_sender(), cancel.clone()));
    setup_terminate_handler(manager.control_sender(), cancel.clone());

    let service = Service::from_config(&config, HeartbeatWorker::new(config.tick_interval()));
    let run_manager = Arc::clone(&manager);
    let outcome = tokio::task::spawn_blocking(move || service.run(run_manager.as_ref())).await?;

    cancel.cancel();
    if let Err(e) = controls.await {
        warn!("Control forwarding task failed: {}", e);
    }

    if args.status_json {
        println!("{}", serde_json::to_string_pretty(&manager.history())?);
    }

    let exit_code = match outcome {
        Ok(exit_code) => exit_code,
        Err(e) => {
            error!("Service failed: {}", e);
            e.code()
        }
    };

    info!("svcrunner exited with code: {}", exit_code);
    // process::exit skips destructors; flush the file writer first
    drop(log_guard);
    std::process::exit(exit_code as i32);
}

/// Translate stdin lines and Ctrl+C into control codes until cancelled
async fn forward_controls(sender: ControlSender, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    sender.send(ControlCode::Stop);
                }
                Err(e) => {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    break;
                }
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match line.parse::<ControlCode>() {
                        Ok(code) => {
                            info!("Sending control '{}'", code);
                            sender.send(code);
                        }
                        Err(e) => warn!("{}", e),
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, only signals will control the service");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }
}

/// SIGTERM maps to a shutdown control - Unix only
fn setup_terminate_handler(sender: ControlSender, cancel: CancellationToken) {
    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {}
            Some(()) = terminate.recv() => {
                info!("Received SIGTERM signal");
                sender.send(ControlCode::Shutdown);
            }
        }
    });

    #[cfg(not(unix))]
    {
        let _ = (sender, cancel);
    }
}

fn init_logging(args: &Args, config: &ServiceConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("svcrunner={}", log_level)));

    let format = args
        .log_format
        .as_deref()
        .unwrap_or(config.logging.format.as_str());

    let fmt_layer = match format {
        "json" => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_names(true)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        other => {
            eprintln!("Warning: Unknown log format '{}', using default", other);
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .boxed()
        }
    };

    let (file_layer, guard) = match &config.logging.file {
        Some(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# svcrunner configuration file");
    println!("# Every key can be overridden with SVCRUNNER__<SECTION>__<KEY>");
    println!();
    println!("{}", ServiceConfig::default().to_toml_string()?);
    Ok(())
}
