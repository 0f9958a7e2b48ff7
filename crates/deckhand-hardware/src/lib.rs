//! Surface discovery and driver layer for Deckhand.
//!
//! This crate provides everything between the host HID bus and the device
//! registry: identity classification, the conflict guard for the vendor
//! Stream Deck application, driver construction and the drivers themselves.
//!
//! # Overview
//!
//! ```text
//! HidAccess::enumerate ──► classify_with ──► SurfaceFactory::create ──► AnySurfaceDriver
//!                               ▲                    │
//!                      ConflictGuard::check     probe, then open
//! ```
//!
//! - [`classifier`]: pure `(vendor, product, interface)` → [`DeviceFamily`] table.
//! - [`guard`]: per-scan suppression of the protected families.
//! - [`hid`]: the HID bus seam, with a `hidapi` backend behind `hardware-usb`.
//! - [`factory`]: builds drivers, probing exclusive access first.
//! - [`devices`]: [`AnySurfaceDriver`], the enum the registry stores.
//! - [`mock`]: in-memory bus, process list and driver for tests.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deckhand_core::{BusDescriptor, DeviceFamily};
//! use deckhand_hardware::{SurfaceFactory, classify};
//! use deckhand_hardware::mock::MockHidBus;
//! use deckhand_hardware::traits::SurfaceDriver;
//!
//! # #[tokio::main]
//! # async fn main() -> deckhand_hardware::Result<()> {
//! let bus = MockHidBus::new();
//! let descriptor = BusDescriptor::new("/dev/hidraw0", 0x0fd9, 0x006d, 0).with_serial_number("AL12");
//! bus.plug(descriptor.clone());
//!
//! let family = classify(&descriptor).expect("known surface");
//! assert_eq!(family, DeviceFamily::StreamDeckV2);
//!
//! let factory = SurfaceFactory::new(Arc::new(bus));
//! let driver = factory.create(&descriptor, family).await?;
//! assert_eq!(driver.info().id, "elgato-v2:AL12");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`][error::Result] with
//! [`HardwareError`]. A busy device is reported as
//! [`HardwareError::DeviceBusy`] so callers can skip it without aborting a
//! scan.
//!
//! [`DeviceFamily`]: deckhand_core::DeviceFamily

pub mod classifier;
pub mod devices;
pub mod error;
pub mod factory;
pub mod guard;
pub mod hid;
pub mod mock;
pub mod synthetic;
pub mod traits;
pub mod usb;

// Re-export commonly used types for convenience
pub use classifier::{ClassifyOptions, classify, classify_with};
pub use devices::AnySurfaceDriver;
pub use error::{HardwareError, Result};
pub use factory::SurfaceFactory;
pub use guard::{ConflictGuard, GuardConfig, ProcessInfo, ProcessLister, Suppression, TasklistLister};
pub use hid::{HidAccess, HidChannel, NoHidAccess};
pub use traits::SurfaceDriver;

#[cfg(feature = "hardware-usb")]
pub use hid::HidApiAccess;
