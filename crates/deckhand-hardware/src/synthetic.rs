//! Surfaces that do not live on the HID bus.
//!
//! The emulator, plugin-bridged decks and remote satellites are created
//! directly by the factory; construction cannot fail for a valid descriptor.

use crate::error::{HardwareError, Result};
use crate::traits::SurfaceDriver;
use deckhand_core::{BusDescriptor, DeviceConfig, DeviceFamily, DriverInfo};
use tracing::debug;

/// Driver for the emulator, plugin and satellite families.
#[derive(Debug, Clone)]
pub struct SyntheticSurface {
    info: DriverInfo,
    config: DeviceConfig,
    running: bool,
}

impl SyntheticSurface {
    /// Create a synthetic surface for `descriptor`.
    ///
    /// Satellites report the descriptor serial (their remote device id).
    pub fn new(family: DeviceFamily, descriptor: &BusDescriptor) -> Self {
        debug_assert!(family.is_synthetic(), "{family} is not a synthetic family");

        Self {
            info: DriverInfo::new(family, &descriptor.path, descriptor.serial_number.as_deref()),
            config: DeviceConfig::new(),
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn ensure_running(&self) -> Result<()> {
        if self.running {
            Ok(())
        } else {
            Err(HardwareError::disconnected(&self.info.id))
        }
    }
}

impl SurfaceDriver for SyntheticSurface {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    async fn set_config(&mut self, config: DeviceConfig) -> Result<()> {
        self.ensure_running()?;
        self.config.extend(config);
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        if self.running {
            debug!(id = %self.info.id, "Synthetic surface stopped");
            self.running = false;
        }
        Ok(())
    }
}
