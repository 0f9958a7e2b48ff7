//! `deckhand`: runs the surface registry against the host HID bus.
//!
//! Environment:
//!
//! - `DECKHAND_DB`: settings database path (default `deckhand.db`)
//! - `DECKHAND_SCAN_INTERVAL_SECS`: periodic rescan interval, 0 or unset to
//!   scan only at start and on request
//! - `RUST_LOG`: log filter (default `info`)

mod settings;

use anyhow::{Context, Result};
use deckhand_hardware::{ConflictGuard, HidAccess, SurfaceFactory};
use deckhand_registry::{Coordinator, LoggingHandlerFactory, SystemEvent};
use deckhand_storage::{Database, DatabaseConfig, SqlitePersistence};
use settings::Settings;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    info!(version = deckhand_core::VERSION, database = %settings.database_path, "Starting deckhand");

    let db = Database::new(DatabaseConfig::new(&settings.database_path))
        .await
        .with_context(|| format!("opening settings database {}", settings.database_path))?;

    let coordinator = Coordinator::builder(SurfaceFactory::new(hid_backend()?))
        .config(settings.coordinator_config())
        .guard(ConflictGuard::system())
        .handlers(Arc::new(LoggingHandlerFactory))
        .persistence(SqlitePersistence::new(db.clone()))
        .build();

    let events = coordinator.subscribe();
    let handle = coordinator.start().await;
    let reporter = tokio::spawn(report_events(events));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutting down");

    let released = handle.shutdown().await;
    reporter.abort();
    db.close().await;

    info!(released, "Stopped");
    Ok(())
}

#[cfg(feature = "hardware-usb")]
fn hid_backend() -> Result<Arc<dyn HidAccess>> {
    let hid = deckhand_hardware::HidApiAccess::new().context("initialising hidapi")?;
    Ok(Arc::new(hid))
}

#[cfg(not(feature = "hardware-usb"))]
fn hid_backend() -> Result<Arc<dyn HidAccess>> {
    warn!("Built without hardware-usb, no physical surfaces will be found");
    Ok(Arc::new(deckhand_hardware::NoHidAccess))
}

async fn report_events(mut events: broadcast::Receiver<SystemEvent>) {
    loop {
        match events.recv().await {
            Ok(SystemEvent::DevicesChanged(list)) => {
                info!(devices = list.len(), "Device list changed");
                match serde_json::to_string(&*list) {
                    Ok(json) => debug!(devices = %json, "Current devices"),
                    Err(e) => warn!(error = %e, "Failed to serialise device list"),
                }
            }
            Ok(SystemEvent::Log { source, level, message, .. }) => {
                warn!(source = %source, level = ?level, "{message}");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event reporter lagging");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
