//! Mock surface driver with failure injection.

use crate::error::{HardwareError, Result};
use crate::traits::SurfaceDriver;
use deckhand_core::{DeviceConfig, DriverInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct SurfaceState {
    quit_calls: AtomicUsize,
    set_config_calls: AtomicUsize,
    stopped: AtomicBool,
}

/// Mock surface driver.
///
/// # Examples
///
/// ```
/// use deckhand_core::{DeviceFamily, DriverInfo};
/// use deckhand_hardware::mock::MockSurface;
/// use deckhand_hardware::traits::SurfaceDriver;
///
/// # #[tokio::main]
/// # async fn main() {
/// let info = DriverInfo::new(DeviceFamily::StreamDeck, "/dev/hidraw0", Some("A"));
/// let (mut surface, handle) = MockSurface::new(info);
///
/// surface.quit().await.unwrap();
/// assert_eq!(handle.quit_count(), 1);
/// assert!(handle.is_stopped());
/// # }
/// ```
#[derive(Debug)]
pub struct MockSurface {
    info: DriverInfo,
    config: DeviceConfig,
    fail_quit: bool,
    state: Arc<SurfaceState>,
}

impl MockSurface {
    /// Create a new mock surface and a handle observing it.
    pub fn new(info: DriverInfo) -> (Self, MockSurfaceHandle) {
        let state = Arc::new(SurfaceState::default());

        let surface = Self {
            info,
            config: DeviceConfig::new(),
            fail_quit: false,
            state: Arc::clone(&state),
        };

        (surface, MockSurfaceHandle { state })
    }

    /// Make every `quit` call fail.
    pub fn failing_quit(mut self) -> Self {
        self.fail_quit = true;
        self
    }

    /// Start with the given settings.
    pub fn with_config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }
}

impl SurfaceDriver for MockSurface {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    async fn set_config(&mut self, config: DeviceConfig) -> Result<()> {
        self.state.set_config_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.stopped.load(Ordering::SeqCst) {
            return Err(HardwareError::disconnected(&self.info.id));
        }
        self.config.extend(config);
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.state.quit_calls.fetch_add(1, Ordering::SeqCst);
        self.state.stopped.store(true, Ordering::SeqCst);

        if self.fail_quit {
            return Err(HardwareError::communication("simulated quit failure"));
        }
        Ok(())
    }
}

/// Observes a [`MockSurface`] after it has been moved into a registry.
#[derive(Debug, Clone)]
pub struct MockSurfaceHandle {
    state: Arc<SurfaceState>,
}

impl MockSurfaceHandle {
    pub fn quit_count(&self) -> usize {
        self.state.quit_calls.load(Ordering::SeqCst)
    }

    pub fn set_config_count(&self) -> usize {
        self.state.set_config_calls.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }
}
