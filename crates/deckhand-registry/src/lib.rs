//! Device registry and hot-plug coordinator for Deckhand.
//!
//! This crate keeps the set of live control surfaces, keyed by bus path, and
//! keeps everyone interested in it informed.
//!
//! # Overview
//!
//! - [`registry`]: the path → driver map and entry teardown.
//! - [`coordinator`]: scans, add/remove/rename, request workers.
//! - [`projector`]: the sorted, externally visible device list.
//! - [`fanout`]: pushes to the internal bus and to observers.
//! - [`names`]: persisted display names keyed by serial number.
//! - [`client`]: request clients for the internal bus and observers.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use deckhand_core::BusDescriptor;
//! use deckhand_hardware::SurfaceFactory;
//! use deckhand_hardware::mock::MockHidBus;
//! use deckhand_registry::{Coordinator, CoordinatorConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> deckhand_registry::Result<()> {
//! let bus = MockHidBus::new();
//! let coordinator = Coordinator::builder(SurfaceFactory::new(Arc::new(bus.clone())))
//!     .config(CoordinatorConfig::default().add_emulator(false))
//!     .build();
//! let handle = coordinator.start().await;
//!
//! let mut observer = handle.connect_observer();
//! bus.plug(BusDescriptor::new("/dev/hidraw3", 0xffff, 0x1f40, 0).with_serial_number("INF1"));
//! assert_eq!(observer.rescan().await?, None);
//!
//! let list = observer.next_list().await.expect("list pushed after add");
//! assert_eq!(list[0].device_type, "infinitton");
//!
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fanout;
pub mod handler;
pub mod messages;
pub mod names;
pub mod projector;
pub mod registry;

// Re-export commonly used types for convenience
pub use client::{ObserverConnection, SystemClient};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder, CoordinatorHandle, ScanReport};
pub use error::{RegistryError, Result};
pub use fanout::{Audience, DeviceList, Fanout, LogLevel, ObserverEvent, ObserverId, SystemEvent};
pub use handler::{DeviceHandler, HandlerFactory, LoggingHandlerFactory, RecordingHandlerFactory};
pub use messages::{ObserverMessage, ObserverRequest, SystemRequest};
pub use names::NameStore;
pub use projector::project;
pub use registry::{Registry, RegistryEntry, TeardownReport};
