//! MJPEG-over-HTTP streaming CLI application

// Use jemalloc for better memory management (optional feature)
#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rust_mjpeg_http::capture::{PatternCamera, PatternConfig};
use rust_mjpeg_http::config::Config;
use rust_mjpeg_http::server::Server;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mjpeg-http")]
#[command(about = "Single-client MJPEG-over-HTTP streaming for camera frame buffers")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    info!("MJPEG-HTTP streamer starting");

    let config = load_config(&cli.config)?;

    info!(
        port = config.mjpeg_http.server.port,
        max_frame_len = config.mjpeg_http.stream.max_frame_len,
        "Configuration loaded"
    );

    let mut camera = PatternCamera::spawn(PatternConfig::from(&config));

    let server = Server::bind(&config).context("failed to bind listener")?;
    info!(addr = %server.local_addr()?, "Waiting for a connection");

    server.run(&mut camera)?;
    Ok(())
}

/// Loads the configuration file, falling back to defaults when the default
/// path is simply absent
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        return Config::load(path).with_context(|| format!("failed to load {}", path));
    }

    if path == "config.toml" {
        info!("No config.toml found, using defaults");
        Ok(Config::default())
    } else {
        bail!("config file not found: {}", path);
    }
}
