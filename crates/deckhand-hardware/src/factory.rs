//! Driver construction.
//!
//! The factory turns a classified descriptor into a ready-to-use driver.
//! Synthetic families are built directly. Physical families go through two
//! blocking steps, each run on a blocking worker thread:
//!
//! 1. **Probe**: open and immediately close the device to check that no
//!    other process holds it. Failure yields [`HardwareError::DeviceBusy`].
//! 2. **Open**: open the device for the driver. Failure yields
//!    [`HardwareError::InitializationFailed`].
//!
//! The returned future resolves only once the driver is fully usable, so the
//! caller can insert it into the registry without further coordination.

use crate::devices::AnySurfaceDriver;
use crate::error::{HardwareError, Result};
use crate::hid::HidAccess;
use crate::synthetic::SyntheticSurface;
use crate::usb::UsbSurface;
use deckhand_core::{BusDescriptor, DeviceFamily};
use std::sync::Arc;
use tracing::debug;

/// Builds drivers for classified descriptors.
#[derive(Clone)]
pub struct SurfaceFactory {
    hid: Arc<dyn HidAccess>,
}

impl std::fmt::Debug for SurfaceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceFactory").finish_non_exhaustive()
    }
}

impl SurfaceFactory {
    pub fn new(hid: Arc<dyn HidAccess>) -> Self {
        Self { hid }
    }

    /// The HID backend shared with bus enumeration.
    pub fn hid(&self) -> &Arc<dyn HidAccess> {
        &self.hid
    }

    /// Construct the driver for `descriptor`.
    ///
    /// # Errors
    ///
    /// - `InvalidData` if the descriptor has no path
    /// - `DeviceBusy` if another process holds the device
    /// - `InitializationFailed` if opening the device failed
    pub async fn create(&self, descriptor: &BusDescriptor, family: DeviceFamily) -> Result<AnySurfaceDriver> {
        descriptor
            .validate()
            .map_err(|e| HardwareError::invalid_data(e.to_string()))?;

        if family.is_synthetic() {
            return Ok(AnySurfaceDriver::Synthetic(SyntheticSurface::new(family, descriptor)));
        }

        let hid = Arc::clone(&self.hid);
        let path = descriptor.path.clone();
        tokio::task::spawn_blocking(move || hid.probe(&path))
            .await
            .map_err(|e| HardwareError::other(format!("probe worker failed: {e}")))?
            .map_err(|e| {
                debug!(path = %descriptor.path, error = %e, "Exclusive access probe failed");
                HardwareError::busy(&descriptor.path)
            })?;

        let hid = Arc::clone(&self.hid);
        let path = descriptor.path.clone();
        let channel = tokio::task::spawn_blocking(move || hid.open(&path))
            .await
            .map_err(|e| HardwareError::other(format!("open worker failed: {e}")))?
            .map_err(|e| HardwareError::initialization_failed(format!("{}: {e}", descriptor.path)))?;

        debug!(path = %descriptor.path, family = %family, "Surface opened");
        Ok(AnySurfaceDriver::Usb(UsbSurface::new(family, descriptor, channel)))
    }
}
