//! HID bus access.
//!
//! [`HidAccess`] is the seam between the coordinator and the host HID stack:
//! enumeration, the exclusive-access probe and opening a device for a driver.
//! All methods may block and are only ever called from blocking worker
//! threads.
//!
//! Two backends are provided:
//!
//! - [`HidApiAccess`] (feature `hardware-usb`): the host stack through `hidapi`.
//! - [`crate::mock::MockHidBus`]: an in-memory bus for tests and demos.
//!
//! [`NoHidAccess`] stands in when the crate is built without a real backend;
//! it enumerates nothing.

use crate::error::{HardwareError, Result};
use deckhand_core::BusDescriptor;

/// Host HID stack.
pub trait HidAccess: Send + Sync {
    /// List every HID interface currently attached.
    fn enumerate(&self) -> Result<Vec<BusDescriptor>>;

    /// Check exclusive access by opening and immediately closing `path`.
    fn probe(&self, path: &str) -> Result<()>;

    /// Open `path` for a driver.
    fn open(&self, path: &str) -> Result<Box<dyn HidChannel>>;
}

/// An opened HID device owned by a driver.
pub trait HidChannel: Send + Sync {
    /// Serial number read from the device, if it reports one.
    fn serial_number(&self) -> Option<String>;

    /// Release the device. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Backend used when no HID stack is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHidAccess;

impl HidAccess for NoHidAccess {
    fn enumerate(&self) -> Result<Vec<BusDescriptor>> {
        Ok(Vec::new())
    }

    fn probe(&self, path: &str) -> Result<()> {
        Err(HardwareError::unsupported(format!("probe {path}: no HID backend")))
    }

    fn open(&self, path: &str) -> Result<Box<dyn HidChannel>> {
        Err(HardwareError::unsupported(format!("open {path}: no HID backend")))
    }
}

#[cfg(feature = "hardware-usb")]
pub use self::hidapi_backend::HidApiAccess;

#[cfg(feature = "hardware-usb")]
mod hidapi_backend {
    use super::{HidAccess, HidChannel};
    use crate::error::{HardwareError, Result};
    use deckhand_core::BusDescriptor;
    use hidapi::{HidApi, HidDevice};
    use std::ffi::CString;
    use std::sync::{Mutex, PoisonError};
    use tracing::trace;

    /// HID access through the `hidapi` crate.
    pub struct HidApiAccess {
        api: Mutex<HidApi>,
    }

    impl HidApiAccess {
        /// Initialise the host HID library.
        ///
        /// # Errors
        ///
        /// Returns `InitializationFailed` if the platform HID stack is unavailable.
        pub fn new() -> Result<Self> {
            let api = HidApi::new().map_err(|e| HardwareError::initialization_failed(e.to_string()))?;
            Ok(Self {
                api: Mutex::new(api),
            })
        }

        fn open_device(&self, path: &str) -> Result<HidDevice> {
            let c_path = CString::new(path)
                .map_err(|_| HardwareError::invalid_data(format!("HID path contains NUL: {path}")))?;
            let api = self.api.lock().unwrap_or_else(PoisonError::into_inner);
            api.open_path(&c_path)
                .map_err(|e| HardwareError::communication(e.to_string()))
        }
    }

    impl std::fmt::Debug for HidApiAccess {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HidApiAccess").finish_non_exhaustive()
        }
    }

    impl HidAccess for HidApiAccess {
        fn enumerate(&self) -> Result<Vec<BusDescriptor>> {
            let mut api = self.api.lock().unwrap_or_else(PoisonError::into_inner);
            api.refresh_devices()
                .map_err(|e| HardwareError::enumeration(e.to_string()))?;

            let devices: Vec<BusDescriptor> = api
                .device_list()
                .map(|info| BusDescriptor {
                    path: info.path().to_string_lossy().into_owned(),
                    vendor_id: info.vendor_id(),
                    product_id: info.product_id(),
                    interface_number: info.interface_number(),
                    serial_number: info.serial_number().map(str::to_string),
                    product_name: info.product_string().map(str::to_string),
                })
                .collect();

            trace!(count = devices.len(), "HID enumeration complete");
            Ok(devices)
        }

        fn probe(&self, path: &str) -> Result<()> {
            let device = self.open_device(path).map_err(|_| HardwareError::busy(path))?;
            drop(device);
            Ok(())
        }

        fn open(&self, path: &str) -> Result<Box<dyn HidChannel>> {
            let device = self.open_device(path)?;
            Ok(Box::new(HidApiChannel {
                device: Mutex::new(Some(device)),
            }))
        }
    }

    struct HidApiChannel {
        device: Mutex<Option<HidDevice>>,
    }

    impl HidChannel for HidApiChannel {
        fn serial_number(&self) -> Option<String> {
            let device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
            device
                .as_ref()
                .and_then(|device| device.get_serial_number_string().ok().flatten())
        }

        fn close(&mut self) -> Result<()> {
            let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
            // hidapi closes the handle on drop
            device.take();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hid_access_is_empty() {
        let access = NoHidAccess;
        assert!(access.enumerate().unwrap().is_empty());
        assert!(access.probe("/dev/hidraw0").is_err());
        assert!(access.open("/dev/hidraw0").is_err());
    }
}
