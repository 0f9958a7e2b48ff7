//! Mock collaborators for testing and development.
//!
//! This module provides an in-memory HID bus, a scriptable process list and a
//! mock surface driver with failure injection, all controllable
//! programmatically without physical hardware.

pub mod bus;
pub mod process;
pub mod surface;

// Re-export commonly used types
pub use bus::MockHidBus;
pub use process::MockProcessLister;
pub use surface::{MockSurface, MockSurfaceHandle};
