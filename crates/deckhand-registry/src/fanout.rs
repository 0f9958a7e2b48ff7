//! Notification fan-out.
//!
//! Every list update goes to the internal bus as a [`SystemEvent`] and is
//! pushed to observers as an [`ObserverEvent`]. Delivery is fire-and-forget:
//! a slow observer whose buffer is full misses that push, and an observer
//! whose receiver was dropped is forgotten.
//!
//! ```text
//!                    ┌──► broadcast ──► SystemEvent::DevicesChanged
//! publish(list) ─────┤
//!                    └──► mpsc (per observer) ──► ObserverEvent::DevicesList
//! ```

use chrono::{DateTime, Utc};
use deckhand_core::DeviceSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace, warn};

/// A shared, immutable snapshot of the device list.
pub type DeviceList = Arc<[DeviceSummary]>;

/// Identifies one connected observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Who receives a pushed list besides the internal bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Observer(ObserverId),
}

/// Push sent to observers.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ObserverEvent {
    DevicesList(DeviceList),
}

/// Severity of a [`SystemEvent::Log`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Event published on the internal bus.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SystemEvent {
    /// The device list changed or was explicitly requested.
    DevicesChanged(DeviceList),

    /// User-visible log line.
    Log {
        source: String,
        level: LogLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Fans list updates out to the internal bus and observers.
#[derive(Debug)]
pub struct Fanout {
    system_tx: broadcast::Sender<SystemEvent>,
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<ObserverEvent>>>,
    next_id: AtomicU64,
    observer_buffer: usize,
}

impl Fanout {
    /// Create a fan-out with the given internal bus capacity and per-observer
    /// buffer size. Both are clamped to at least 1.
    pub fn new(event_buffer: usize, observer_buffer: usize) -> Self {
        let (system_tx, _) = broadcast::channel(event_buffer.max(1));
        Self {
            system_tx,
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            observer_buffer: observer_buffer.max(1),
        }
    }

    /// Subscribe to the internal bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_tx.subscribe()
    }

    /// Register a new observer and return its push channel.
    pub fn register_observer(&self) -> (ObserverId, mpsc::Receiver<ObserverEvent>) {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.observer_buffer);

        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        debug!(observer = %id, "Observer registered");
        (id, rx)
    }

    /// Forget an observer. Returns `false` if it was not registered.
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        let removed = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();

        if removed {
            debug!(observer = %id, "Observer unregistered");
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Publish `list` to the internal bus and to `audience`.
    ///
    /// Returns the number of observers the list was handed to.
    pub fn publish(&self, list: DeviceList, audience: Audience) -> usize {
        // No internal subscribers is not an error.
        let _ = self.system_tx.send(SystemEvent::DevicesChanged(Arc::clone(&list)));

        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;

        match audience {
            Audience::All => {
                observers.retain(|id, tx| match deliver(*id, tx, &list) {
                    Delivery::Sent => {
                        delivered += 1;
                        true
                    }
                    Delivery::Dropped => true,
                    Delivery::Closed => false,
                });
            }
            Audience::Observer(id) => {
                let closed = match observers.get(&id) {
                    Some(tx) => match deliver(id, tx, &list) {
                        Delivery::Sent => {
                            delivered += 1;
                            false
                        }
                        Delivery::Dropped => false,
                        Delivery::Closed => true,
                    },
                    None => {
                        debug!(observer = %id, "List requested by unknown observer");
                        false
                    }
                };
                if closed {
                    observers.remove(&id);
                }
            }
        }

        trace!(devices = list.len(), delivered, "Device list published");
        delivered
    }

    /// Publish a user-visible log line on the internal bus.
    pub fn log(&self, source: impl Into<String>, level: LogLevel, message: impl Into<String>) {
        let _ = self.system_tx.send(SystemEvent::Log {
            source: source.into(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }
}

enum Delivery {
    Sent,
    Dropped,
    Closed,
}

fn deliver(id: ObserverId, tx: &mpsc::Sender<ObserverEvent>, list: &DeviceList) -> Delivery {
    match tx.try_send(ObserverEvent::DevicesList(Arc::clone(list))) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => {
            warn!(observer = %id, "Observer is not keeping up, dropping device list");
            Delivery::Dropped
        }
        Err(TrySendError::Closed(_)) => {
            debug!(observer = %id, "Observer disconnected");
            Delivery::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_core::DeviceConfig;

    fn list(ids: &[&str]) -> DeviceList {
        ids.iter()
            .map(|id| DeviceSummary {
                id: id.to_string(),
                serial_number: String::new(),
                device_type: "elgato".to_string(),
                name: String::new(),
                config: DeviceConfig::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_publish_all_reaches_bus_and_observers() {
        let fanout = Fanout::new(8, 4);
        let mut bus = fanout.subscribe();
        let (_a, mut rx_a) = fanout.register_observer();
        let (_b, mut rx_b) = fanout.register_observer();

        assert_eq!(fanout.publish(list(&["emulator"]), Audience::All), 2);

        assert!(matches!(bus.recv().await.unwrap(), SystemEvent::DevicesChanged(l) if l.len() == 1));
        assert!(matches!(rx_a.recv().await, Some(ObserverEvent::DevicesList(_))));
        assert!(matches!(rx_b.recv().await, Some(ObserverEvent::DevicesList(_))));
    }

    #[tokio::test]
    async fn test_publish_to_one_observer() {
        let fanout = Fanout::new(8, 4);
        let mut bus = fanout.subscribe();
        let (a, mut rx_a) = fanout.register_observer();
        let (_b, mut rx_b) = fanout.register_observer();

        assert_eq!(fanout.publish(list(&[]), Audience::Observer(a)), 1);

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
        assert!(bus.try_recv().is_ok());
    }

    #[test]
    fn test_closed_observer_is_pruned() {
        let fanout = Fanout::new(8, 4);
        let (_a, rx_a) = fanout.register_observer();
        let (_b, _rx_b) = fanout.register_observer();
        drop(rx_a);

        assert_eq!(fanout.publish(list(&[]), Audience::All), 1);
        assert_eq!(fanout.observer_count(), 1);
    }

    #[test]
    fn test_full_observer_misses_push_but_stays() {
        let fanout = Fanout::new(8, 1);
        let (_a, mut rx_a) = fanout.register_observer();

        assert_eq!(fanout.publish(list(&["one"]), Audience::All), 1);
        assert_eq!(fanout.publish(list(&["two"]), Audience::All), 0);
        assert_eq!(fanout.observer_count(), 1);

        let Ok(ObserverEvent::DevicesList(first)) = rx_a.try_recv() else {
            panic!("expected the first list");
        };
        assert_eq!(first[0].id, "one");
    }

    #[test]
    fn test_unregister() {
        let fanout = Fanout::new(8, 4);
        let (a, _rx) = fanout.register_observer();
        assert!(fanout.unregister_observer(a));
        assert!(!fanout.unregister_observer(a));
        assert_eq!(fanout.publish(list(&[]), Audience::Observer(a)), 0);
    }

    #[tokio::test]
    async fn test_log_event() {
        let fanout = Fanout::new(8, 4);
        let mut bus = fanout.subscribe();
        fanout.log("USB(elgato)", LogLevel::Error, "busy");

        match bus.recv().await.unwrap() {
            SystemEvent::Log { source, level, message, .. } => {
                assert_eq!(source, "USB(elgato)");
                assert_eq!(level, LogLevel::Error);
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
