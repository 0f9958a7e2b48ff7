//! Per-device handlers.
//!
//! Every registered device gets a handler that binds it to the rest of the
//! application (key mapping, page rendering). The registry only owns the
//! handler's lifetime: it is attached right after the driver is constructed
//! and unloaded exactly once, after the driver has quit.

use deckhand_core::DriverInfo;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Binds one live driver to the application.
pub trait DeviceHandler: Send + Sync {
    /// Release everything the handler holds. Called at most once.
    fn unload(&mut self);
}

/// Creates a handler for each newly registered device.
pub trait HandlerFactory: Send + Sync {
    fn attach(&self, info: &DriverInfo) -> Box<dyn DeviceHandler>;
}

/// Handler factory that only logs attachment and unloading.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandlerFactory;

impl HandlerFactory for LoggingHandlerFactory {
    fn attach(&self, info: &DriverInfo) -> Box<dyn DeviceHandler> {
        info!(id = %info.id, family = %info.family, path = %info.path, "Surface attached");
        Box::new(LoggingHandler { id: info.id.clone() })
    }
}

struct LoggingHandler {
    id: String,
}

impl DeviceHandler for LoggingHandler {
    fn unload(&mut self) {
        debug!(id = %self.id, "Surface handler unloaded");
    }
}

#[derive(Debug, Default)]
struct Tally {
    attached: HashMap<String, usize>,
    unloaded: HashMap<String, usize>,
}

/// Handler factory that counts attach and unload calls per device id.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandlerFactory {
    tally: Arc<Mutex<Tally>>,
}

impl RecordingHandlerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_count(&self, id: &str) -> usize {
        let tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally.attached.get(id).copied().unwrap_or(0)
    }

    pub fn unload_count(&self, id: &str) -> usize {
        let tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        tally.unloaded.get(id).copied().unwrap_or(0)
    }

    /// Handlers attached and not yet unloaded.
    pub fn live_count(&self) -> usize {
        let tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        let attached: usize = tally.attached.values().sum();
        let unloaded: usize = tally.unloaded.values().sum();
        attached.saturating_sub(unloaded)
    }
}

impl HandlerFactory for RecordingHandlerFactory {
    fn attach(&self, info: &DriverInfo) -> Box<dyn DeviceHandler> {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        *tally.attached.entry(info.id.clone()).or_default() += 1;

        Box::new(RecordingHandler {
            id: info.id.clone(),
            tally: Arc::clone(&self.tally),
        })
    }
}

struct RecordingHandler {
    id: String,
    tally: Arc<Mutex<Tally>>,
}

impl DeviceHandler for RecordingHandler {
    fn unload(&mut self) {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        *tally.unloaded.entry(self.id.clone()).or_default() += 1;
    }
}
