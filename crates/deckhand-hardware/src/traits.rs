//! Surface driver trait definition.
//!
//! A surface driver owns one connected device for its whole lifetime: it is
//! created by the [`SurfaceFactory`](crate::factory::SurfaceFactory) once the
//! device is usable and is shut down with [`SurfaceDriver::quit`] when the
//! registry removes or replaces it.
//!
//! All async methods use native `async fn` in traits (Edition 2024 RPITIT),
//! so the trait is used through the [`AnySurfaceDriver`](crate::devices::AnySurfaceDriver)
//! enum rather than `Box<dyn SurfaceDriver>`.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use deckhand_core::{DeviceConfig, DriverInfo};

/// A live surface driver.
///
/// # Examples
///
/// ```no_run
/// use deckhand_hardware::traits::SurfaceDriver;
/// use deckhand_hardware::Result;
///
/// async fn dim<D: SurfaceDriver>(driver: &mut D) -> Result<()> {
///     let mut config = driver.config().clone();
///     config.insert("brightness".to_string(), 20.into());
///     driver.set_config(config).await
/// }
/// ```
pub trait SurfaceDriver: Send + Sync {
    /// Identity of the device.
    fn info(&self) -> &DriverInfo;

    /// Current device settings.
    fn config(&self) -> &DeviceConfig;

    /// Merge `config` into the device settings.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` once the driver has quit.
    async fn set_config(&mut self, config: DeviceConfig) -> Result<()>;

    /// Release the device. Idempotent: later calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the underlying device failed. The driver
    /// counts as shut down either way.
    async fn quit(&mut self) -> Result<()>;
}
