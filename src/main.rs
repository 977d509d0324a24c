//! framewm
//!
//! A minimal reparenting X11 window manager: every top-level window is
//! wrapped in a flat bordered frame for as long as it stays mapped.

mod config;
mod shared;
mod wm;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use wm::display::X11Display;
use wm::WindowManager;

fn main() -> Result<()> {
    // Configuration is read before logging exists; report problems after
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.filter.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(e) = config_error {
        warn!("Failed to load configuration, using defaults: {:#}", e);
    }

    info!("Starting framewm");

    let display = X11Display::connect(config.display.name.as_deref())
        .context("Failed to establish connection with X server")
        .inspect_err(|e| error!("{:#}", e))?;

    let mut wm = WindowManager::new(display);
    wm.run().inspect_err(|e| error!("{:#}", e))
}
