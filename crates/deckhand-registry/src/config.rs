//! Coordinator configuration.

use std::time::Duration;

/// Configuration for the [`Coordinator`](crate::coordinator::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Interval between periodic scans. `None` scans only on request.
    pub scan_interval: Option<Duration>,

    /// Push buffer per observer.
    pub observer_buffer: usize,

    /// Capacity of the internal event bus.
    pub event_buffer: usize,

    /// Capacity of each request channel.
    pub request_buffer: usize,

    /// Register the emulator surface on start.
    pub add_emulator: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            scan_interval: None,
            observer_buffer: 32,
            event_buffer: 64,
            request_buffer: 32,
            add_emulator: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = Some(interval);
        self
    }

    pub fn observer_buffer(mut self, size: usize) -> Self {
        self.observer_buffer = size;
        self
    }

    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }

    pub fn request_buffer(mut self, size: usize) -> Self {
        self.request_buffer = size;
        self
    }

    pub fn add_emulator(mut self, add: bool) -> Self {
        self.add_emulator = add;
        self
    }
}
