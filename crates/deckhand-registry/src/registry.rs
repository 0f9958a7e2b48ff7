//! The device registry: live driver instances keyed by bus path.
//!
//! [`Registry`] is a plain data structure with no locking of its own. The
//! [`Coordinator`](crate::coordinator::Coordinator) owns it behind a mutex
//! and implements the add/remove contract on top of it. Entries removed from
//! the registry are torn down with [`RegistryEntry::teardown`] after the lock
//! is released.

use crate::handler::DeviceHandler;
use deckhand_core::DriverInfo;
use deckhand_hardware::devices::AnySurfaceDriver;
use deckhand_hardware::traits::SurfaceDriver;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// One registered device: its driver and the handler attached to it.
pub struct RegistryEntry {
    driver: AnySurfaceDriver,
    handler: Box<dyn DeviceHandler>,
}

impl RegistryEntry {
    pub fn new(driver: AnySurfaceDriver, handler: Box<dyn DeviceHandler>) -> Self {
        Self { driver, handler }
    }

    pub fn info(&self) -> &DriverInfo {
        self.driver.info()
    }

    pub fn driver(&self) -> &AnySurfaceDriver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut AnySurfaceDriver {
        &mut self.driver
    }

    /// Shut the device down: quit the driver, then unload the handler.
    ///
    /// A failing `quit` does not prevent the unload. Consuming the entry
    /// guarantees both happen at most once.
    pub async fn teardown(mut self) -> TeardownReport {
        let info = self.driver.info().clone();

        let quit = self.driver.quit().await;
        if let Err(e) = &quit {
            warn!(id = %info.id, path = %info.path, error = %e, "Driver quit failed during teardown");
        }

        self.handler.unload();
        debug!(id = %info.id, path = %info.path, "Device torn down");

        TeardownReport { info, quit }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

/// Outcome of tearing down one entry.
#[derive(Debug)]
pub struct TeardownReport {
    pub info: DriverInfo,
    /// Result of the driver's `quit`. The handler is unloaded regardless.
    pub quit: deckhand_hardware::Result<()>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.quit.is_ok()
    }
}

/// Live devices keyed by bus path. At most one entry per path.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&RegistryEntry> {
        self.entries.get(path)
    }

    /// Insert `entry` under its driver's path, returning the entry it displaced.
    pub fn insert(&mut self, entry: RegistryEntry) -> Option<RegistryEntry> {
        let path = entry.info().path.clone();
        self.entries.insert(path, entry)
    }

    /// Remove and return the entry at `path`.
    pub fn take(&mut self, path: &str) -> Option<RegistryEntry> {
        self.entries.remove(path)
    }

    /// Remove and return every entry.
    pub fn drain(&mut self) -> Vec<RegistryEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.values().find(|entry| entry.info().id == id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut RegistryEntry> {
        self.entries.values_mut().find(|entry| entry.info().id == id)
    }

    /// The first live entry reporting `serial`. Empty serials never match.
    pub fn find_by_serial(&self, serial: &str) -> Option<&RegistryEntry> {
        if serial.is_empty() {
            return None;
        }
        self.entries
            .values()
            .find(|entry| entry.info().serial_number == serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerFactory, RecordingHandlerFactory};
    use deckhand_core::DeviceFamily;
    use deckhand_hardware::mock::{MockSurface, MockSurfaceHandle};

    fn entry(
        handlers: &RecordingHandlerFactory,
        family: DeviceFamily,
        path: &str,
        serial: &str,
    ) -> (RegistryEntry, MockSurfaceHandle) {
        let info = DriverInfo::new(family, path, Some(serial));
        let handler = handlers.attach(&info);
        let (surface, handle) = MockSurface::new(info);
        (RegistryEntry::new(AnySurfaceDriver::Mock(surface), handler), handle)
    }

    #[test]
    fn test_insert_keeps_one_entry_per_path() {
        let handlers = RecordingHandlerFactory::new();
        let mut registry = Registry::new();

        let (first, _) = entry(&handlers, DeviceFamily::StreamDeck, "/dev/hidraw0", "A");
        let (second, _) = entry(&handlers, DeviceFamily::StreamDeck, "/dev/hidraw0", "B");

        assert!(registry.insert(first).is_none());
        let displaced = registry.insert(second).unwrap();

        assert_eq!(displaced.info().serial_number, "A");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("/dev/hidraw0").unwrap().info().serial_number, "B");
    }

    #[test]
    fn test_lookup_by_id_and_serial() {
        let handlers = RecordingHandlerFactory::new();
        let mut registry = Registry::new();
        let (xkeys, _) = entry(&handlers, DeviceFamily::XKeys, "/dev/hidraw2", "XK1");
        registry.insert(xkeys);

        assert!(registry.find_by_id("xkeys:XK1").is_some());
        assert!(registry.find_by_id("xkeys:XK2").is_none());
        assert!(registry.find_by_serial("XK1").is_some());
        assert!(registry.find_by_serial("").is_none());
        assert_eq!(registry.paths(), vec!["/dev/hidraw2".to_string()]);
    }

    #[tokio::test]
    async fn test_teardown_quits_then_unloads_once() {
        let handlers = RecordingHandlerFactory::new();
        let (entry, surface) = entry(&handlers, DeviceFamily::StreamDeckXl, "/dev/hidraw1", "XL1");

        let report = entry.teardown().await;

        assert!(report.is_clean());
        assert_eq!(surface.quit_count(), 1);
        assert_eq!(handlers.unload_count("elgato-xl:XL1"), 1);
    }

    #[tokio::test]
    async fn test_teardown_unloads_even_when_quit_fails() {
        let handlers = RecordingHandlerFactory::new();
        let info = DriverInfo::new(DeviceFamily::Infinitton, "/dev/hidraw3", Some("INF"));
        let handler = handlers.attach(&info);
        let (surface, handle) = MockSurface::new(info);
        let entry = RegistryEntry::new(AnySurfaceDriver::Mock(surface.failing_quit()), handler);

        let report = entry.teardown().await;

        assert!(!report.is_clean());
        assert_eq!(handle.quit_count(), 1);
        assert_eq!(handlers.unload_count("infinitton:INF"), 1);
    }

    #[test]
    fn test_drain_empties_registry() {
        let handlers = RecordingHandlerFactory::new();
        let mut registry = Registry::new();
        for (path, serial) in [("/dev/hidraw0", "A"), ("/dev/hidraw1", "B")] {
            let (e, _) = entry(&handlers, DeviceFamily::StreamDeck, path, serial);
            registry.insert(e);
        }

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }
}
