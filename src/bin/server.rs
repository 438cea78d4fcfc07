//! ConsoleRelay Server Binary
//!
//! Launches the game server and exposes its console over TCP.

use std::path::PathBuf;

use clap::Parser;
use consolerelay::process::{required_java_version, workspace};
use consolerelay::{Config, ConsoleSession, LaunchSpec};
use tracing_subscriber::{fmt, EnvFilter};

/// ConsoleRelay Server
#[derive(Parser, Debug)]
#[command(name = "consolerelay-server")]
#[command(about = "Expose a game server console to TCP clients")]
#[command(version)]
struct Args {
    /// Path to the server jar
    #[arg(short, long)]
    jar: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:25575")]
    listen: String,

    /// Java binary used to run the jar
    #[arg(long, default_value = "java")]
    java: String,

    /// Minecraft revision, used to report the Java version it needs
    #[arg(short, long)]
    revision: Option<String>,

    /// Skip EULA acceptance and world lock cleanup
    #[arg(long)]
    no_prepare: bool,

    /// Console command sent to the server on Ctrl+C
    #[arg(long, default_value = "stop")]
    stop_command: String,

    /// Seconds the server gets to exit after the stop command
    #[arg(long, default_value = "30")]
    stop_grace_secs: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,consolerelay=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .init();

    let args = Args::parse();

    tracing::info!("ConsoleRelay Server v{}", consolerelay::VERSION);
    tracing::info!("Server jar: {}", args.jar.display());
    tracing::info!("Listen address: {}", args.listen);

    if let Some(revision) = &args.revision {
        match required_java_version(revision) {
            Ok(version) => tracing::info!("Revision {} requires Java {}", revision, version),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    let spec = match LaunchSpec::spigot(&args.jar) {
        Ok(spec) => spec.with_java(&args.java),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if !args.no_prepare {
        let server_dir = spec.working_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        if let Err(e) = workspace::prepare(&server_dir) {
            tracing::error!("Failed to prepare {}: {}", server_dir.display(), e);
            std::process::exit(1);
        }
    }

    // Build config from args
    let stop_command = Some(args.stop_command).filter(|c| !c.is_empty());
    let config = Config::builder()
        .listen_addr(&args.listen)
        .stop_command(stop_command)
        .stop_grace_ms(args.stop_grace_secs.saturating_mul(1000))
        .build();

    let session = match ConsoleSession::start(config, &spec) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = session.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.request();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    match session.run() {
        Ok(status) => {
            tracing::info!("Server stopped ({})", status);
            std::process::exit(status.code().unwrap_or(1));
        }
        Err(e) => {
            tracing::error!("Session error: {}", e);
            std::process::exit(1);
        }
    }
}
