//! Driver for surfaces attached to the HID bus.
//!
//! The driver keeps the opened [`HidChannel`] for as long as the device is
//! registered. Per-family key and image protocols live outside this crate;
//! here the driver only tracks identity, settings and the device handle.

use crate::error::{HardwareError, Result};
use crate::hid::HidChannel;
use crate::traits::SurfaceDriver;
use deckhand_core::{BusDescriptor, DeviceConfig, DeviceFamily, DriverInfo};
use serde_json::json;
use std::fmt;
use tracing::debug;

/// Settings every physical surface starts with.
pub fn default_config() -> DeviceConfig {
    let mut config = DeviceConfig::new();
    config.insert("brightness".to_string(), json!(100));
    config.insert("rotation".to_string(), json!(0));
    config
}

/// A physical surface opened over HID.
pub struct UsbSurface {
    info: DriverInfo,
    config: DeviceConfig,
    channel: Option<Box<dyn HidChannel>>,
}

impl UsbSurface {
    /// Wrap an opened channel.
    ///
    /// The serial number reported by enumeration wins; the device itself is
    /// asked only when enumeration did not provide one.
    pub fn new(family: DeviceFamily, descriptor: &BusDescriptor, channel: Box<dyn HidChannel>) -> Self {
        let serial_number = descriptor
            .serial_number
            .clone()
            .filter(|serial| !serial.trim().is_empty())
            .or_else(|| channel.serial_number());

        Self {
            info: DriverInfo::new(family, &descriptor.path, serial_number.as_deref()),
            config: default_config(),
            channel: Some(channel),
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.channel.is_some() {
            Ok(())
        } else {
            Err(HardwareError::disconnected(&self.info.id))
        }
    }
}

impl fmt::Debug for UsbSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbSurface")
            .field("info", &self.info)
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

impl SurfaceDriver for UsbSurface {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    async fn set_config(&mut self, config: DeviceConfig) -> Result<()> {
        self.ensure_open()?;

        if let Some(brightness) = config.get("brightness")
            && !brightness.as_u64().is_some_and(|value| value <= 100)
        {
            return Err(HardwareError::configuration(format!(
                "brightness must be 0-100, got {brightness}"
            )));
        }

        self.config.extend(config);
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        let Some(mut channel) = self.channel.take() else {
            return Ok(());
        };

        debug!(id = %self.info.id, path = %self.info.path, "Closing HID surface");
        channel.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::HidAccess;
    use crate::mock::MockHidBus;

    fn open(bus: &MockHidBus, descriptor: &BusDescriptor) -> UsbSurface {
        let channel = bus.open(&descriptor.path).unwrap();
        UsbSurface::new(DeviceFamily::StreamDeckXl, descriptor, channel)
    }

    #[tokio::test]
    async fn test_identity_prefers_enumerated_serial() {
        let bus = MockHidBus::new();
        let descriptor = BusDescriptor::new("/dev/hidraw4", 0x0fd9, 0x006c, 0).with_serial_number("CL44");
        bus.plug(descriptor.clone());

        let surface = open(&bus, &descriptor);
        assert_eq!(surface.info().id, "elgato-xl:CL44");
        assert_eq!(surface.info().serial_number, "CL44");
    }

    #[tokio::test]
    async fn test_identity_falls_back_to_device_serial() {
        let bus = MockHidBus::new();
        let descriptor = BusDescriptor::new("/dev/hidraw4", 0x0fd9, 0x006c, 0);
        bus.plug(descriptor.clone());
        bus.set_device_serial("/dev/hidraw4", "FROMDEV");

        let surface = open(&bus, &descriptor);
        assert_eq!(surface.info().serial_number, "FROMDEV");
    }

    #[tokio::test]
    async fn test_quit_closes_once() {
        let bus = MockHidBus::new();
        let descriptor = BusDescriptor::new("/dev/hidraw4", 0x0fd9, 0x006c, 0);
        bus.plug(descriptor.clone());

        let mut surface = open(&bus, &descriptor);
        surface.quit().await.unwrap();
        surface.quit().await.unwrap();

        assert!(!surface.is_open());
        assert_eq!(bus.close_count("/dev/hidraw4"), 1);
        assert!(surface.set_config(DeviceConfig::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_quit_reports_close_failure() {
        let bus = MockHidBus::new();
        let descriptor = BusDescriptor::new("/dev/hidraw4", 0x0fd9, 0x006c, 0);
        bus.plug(descriptor.clone());
        bus.set_close_failure("/dev/hidraw4", true);

        let mut surface = open(&bus, &descriptor);
        assert!(surface.quit().await.is_err());
        assert!(!surface.is_open());
        assert!(surface.quit().await.is_ok());
    }

    #[tokio::test]
    async fn test_brightness_validation() {
        let bus = MockHidBus::new();
        let descriptor = BusDescriptor::new("/dev/hidraw4", 0x0fd9, 0x006c, 0);
        bus.plug(descriptor.clone());
        let mut surface = open(&bus, &descriptor);

        let mut update = DeviceConfig::new();
        update.insert("brightness".to_string(), json!(150));
        assert!(surface.set_config(update).await.is_err());

        let mut update = DeviceConfig::new();
        update.insert("brightness".to_string(), json!(35));
        surface.set_config(update).await.unwrap();

        let config = surface.config();
        assert_eq!(config["brightness"], 35);
        assert_eq!(config["rotation"], 0);
    }
}
