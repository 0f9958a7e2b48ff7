//! Enum wrapper for surface driver dispatch.
//!
//! Native `async fn` in traits (RPITIT) is not object-safe, so the registry
//! cannot hold `Box<dyn SurfaceDriver>`. [`AnySurfaceDriver`] gives the
//! registry one concrete type while every variant keeps its own driver.
//!
//! # Examples
//!
//! ```
//! use deckhand_core::{BusDescriptor, DeviceFamily};
//! use deckhand_hardware::devices::AnySurfaceDriver;
//! use deckhand_hardware::synthetic::SyntheticSurface;
//! use deckhand_hardware::traits::SurfaceDriver;
//!
//! let emulator = SyntheticSurface::new(DeviceFamily::Emulator, &BusDescriptor::synthetic("emulator"));
//! let driver = AnySurfaceDriver::Synthetic(emulator);
//! assert_eq!(driver.info().id, "emulator");
//! ```

use crate::mock::MockSurface;
use crate::synthetic::SyntheticSurface;
use crate::traits::SurfaceDriver;
use crate::usb::UsbSurface;
use crate::Result;
use deckhand_core::{DeviceConfig, DriverInfo};

/// Enum wrapper for surface driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySurfaceDriver {
    /// Emulator, plugin or satellite surface.
    Synthetic(SyntheticSurface),

    /// Surface opened over the HID bus.
    Usb(UsbSurface),

    /// Mock surface for testing.
    Mock(MockSurface),
}

impl SurfaceDriver for AnySurfaceDriver {
    fn info(&self) -> &DriverInfo {
        match self {
            Self::Synthetic(device) => device.info(),
            Self::Usb(device) => device.info(),
            Self::Mock(device) => device.info(),
        }
    }

    fn config(&self) -> &DeviceConfig {
        match self {
            Self::Synthetic(device) => device.config(),
            Self::Usb(device) => device.config(),
            Self::Mock(device) => device.config(),
        }
    }

    async fn set_config(&mut self, config: DeviceConfig) -> Result<()> {
        match self {
            Self::Synthetic(device) => device.set_config(config).await,
            Self::Usb(device) => device.set_config(config).await,
            Self::Mock(device) => device.set_config(config).await,
        }
    }

    async fn quit(&mut self) -> Result<()> {
        match self {
            Self::Synthetic(device) => device.quit().await,
            Self::Usb(device) => device.quit().await,
            Self::Mock(device) => device.quit().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_core::{BusDescriptor, DeviceFamily};
    use serde_json::json;

    #[tokio::test]
    async fn test_any_surface_synthetic() {
        let surface = SyntheticSurface::new(DeviceFamily::Plugin, &BusDescriptor::synthetic("plugin-7"));
        let mut driver = AnySurfaceDriver::Synthetic(surface);

        assert_eq!(driver.info().family, DeviceFamily::Plugin);
        assert!(driver.config().is_empty());
        driver.quit().await.unwrap();
        assert!(driver.set_config(DeviceConfig::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_any_surface_mock() {
        let info = DriverInfo::new(DeviceFamily::XKeys, "/dev/hidraw9", Some("XK9"));
        let mut initial = DeviceConfig::new();
        initial.insert("brightness".to_string(), json!(50));
        let (surface, handle) = MockSurface::new(info);
        let mut driver = AnySurfaceDriver::Mock(surface.with_config(initial));

        assert_eq!(driver.info().id, "xkeys:XK9");
        assert_eq!(driver.config()["brightness"], 50);

        let mut update = DeviceConfig::new();
        update.insert("rotation".to_string(), json!(90));
        driver.set_config(update).await.unwrap();
        assert_eq!(driver.config()["brightness"], 50);
        assert_eq!(driver.config()["rotation"], 90);

        driver.quit().await.unwrap();
        assert_eq!(handle.quit_count(), 1);
        assert!(driver.set_config(DeviceConfig::new()).await.is_err());
        assert_eq!(handle.set_config_count(), 2);
    }
}
