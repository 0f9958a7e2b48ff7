//! In-memory HID bus.
//!
//! [`MockHidBus`] is cheaply cloneable; every clone shares the same state, so
//! a test can hand one clone to the coordinator and keep another to plug and
//! unplug devices or inject failures.

use crate::error::{HardwareError, Result};
use crate::hid::{HidAccess, HidChannel};
use deckhand_core::BusDescriptor;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct BusState {
    devices: Vec<BusDescriptor>,
    device_serials: HashMap<String, String>,
    busy: HashSet<String>,
    open_failures: HashSet<String>,
    close_failures: HashSet<String>,
    enumeration_failure: bool,
    enumerate_calls: usize,
    probes: HashMap<String, usize>,
    opens: HashMap<String, usize>,
    closes: HashMap<String, usize>,
    live_channels: HashMap<String, usize>,
}

/// Simulated HID bus.
///
/// # Examples
///
/// ```
/// use deckhand_core::BusDescriptor;
/// use deckhand_hardware::hid::HidAccess;
/// use deckhand_hardware::mock::MockHidBus;
///
/// let bus = MockHidBus::new();
/// bus.plug(BusDescriptor::new("/dev/hidraw0", 0x0fd9, 0x0060, 0));
///
/// assert_eq!(bus.enumerate().unwrap().len(), 1);
/// assert!(bus.probe("/dev/hidraw0").is_ok());
///
/// bus.set_busy("/dev/hidraw0", true);
/// assert!(bus.probe("/dev/hidraw0").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHidBus {
    state: Arc<Mutex<BusState>>,
}

impl MockHidBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a device. A device already on the same path is replaced.
    pub fn plug(&self, descriptor: BusDescriptor) {
        let mut state = self.state();
        state.devices.retain(|d| d.path != descriptor.path);
        state.devices.push(descriptor);
    }

    /// Detach the device on `path`.
    pub fn unplug(&self, path: &str) {
        self.state().devices.retain(|d| d.path != path);
    }

    /// Serial number the device reports once opened.
    pub fn set_device_serial(&self, path: &str, serial: impl Into<String>) {
        self.state().device_serials.insert(path.to_string(), serial.into());
    }

    /// Mark `path` as held by another process.
    pub fn set_busy(&self, path: &str, busy: bool) {
        toggle(&mut self.state().busy, path, busy);
    }

    /// Make opening `path` for a driver fail.
    pub fn set_open_failure(&self, path: &str, fail: bool) {
        toggle(&mut self.state().open_failures, path, fail);
    }

    /// Make closing channels on `path` fail.
    pub fn set_close_failure(&self, path: &str, fail: bool) {
        toggle(&mut self.state().close_failures, path, fail);
    }

    /// Make enumeration fail.
    pub fn set_enumeration_failure(&self, fail: bool) {
        self.state().enumeration_failure = fail;
    }

    pub fn enumerate_count(&self) -> usize {
        self.state().enumerate_calls
    }

    pub fn probe_count(&self, path: &str) -> usize {
        self.state().probes.get(path).copied().unwrap_or(0)
    }

    pub fn open_count(&self, path: &str) -> usize {
        self.state().opens.get(path).copied().unwrap_or(0)
    }

    pub fn close_count(&self, path: &str) -> usize {
        self.state().closes.get(path).copied().unwrap_or(0)
    }

    /// Channels on `path` opened and not yet closed.
    pub fn live_channels(&self, path: &str) -> usize {
        self.state().live_channels.get(path).copied().unwrap_or(0)
    }
}

fn toggle(set: &mut HashSet<String>, path: &str, on: bool) {
    if on {
        set.insert(path.to_string());
    } else {
        set.remove(path);
    }
}

impl HidAccess for MockHidBus {
    fn enumerate(&self) -> Result<Vec<BusDescriptor>> {
        let mut state = self.state();
        state.enumerate_calls += 1;

        if state.enumeration_failure {
            return Err(HardwareError::enumeration("simulated enumeration failure"));
        }
        Ok(state.devices.clone())
    }

    fn probe(&self, path: &str) -> Result<()> {
        let mut state = self.state();
        *state.probes.entry(path.to_string()).or_default() += 1;

        if !state.devices.iter().any(|d| d.path == path) {
            return Err(HardwareError::disconnected(path));
        }
        if state.busy.contains(path) || state.live_channels.get(path).is_some_and(|n| *n > 0) {
            return Err(HardwareError::busy(path));
        }
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn HidChannel>> {
        let mut state = self.state();
        *state.opens.entry(path.to_string()).or_default() += 1;

        if !state.devices.iter().any(|d| d.path == path) {
            return Err(HardwareError::disconnected(path));
        }
        if state.open_failures.contains(path) {
            return Err(HardwareError::communication("simulated open failure"));
        }

        *state.live_channels.entry(path.to_string()).or_default() += 1;
        Ok(Box::new(MockChannel {
            path: path.to_string(),
            serial: state.device_serials.get(path).cloned(),
            closed: false,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockChannel {
    path: String,
    serial: Option<String>,
    closed: bool,
    state: Arc<Mutex<BusState>>,
}

impl HidChannel for MockChannel {
    fn serial_number(&self) -> Option<String> {
        self.serial.clone()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state.closes.entry(self.path.clone()).or_default() += 1;
        if let Some(live) = state.live_channels.get_mut(&self.path) {
            *live = live.saturating_sub(1);
        }

        if state.close_failures.contains(&self.path) {
            return Err(HardwareError::communication("simulated close failure"));
        }
        Ok(())
    }
}
