//! Hot-plug coordinator.
//!
//! The coordinator owns the device registry and the name store. It decides
//! which devices are added during a scan, serialises scans, and publishes the
//! device list after every change.
//!
//! # Architecture
//!
//! ```text
//!  SystemRequest ──► system worker ───┬──────────┐
//!                                     │  rescans ▼
//!                                     │    scan worker ──┐
//!                                     │          ▲       │   ┌──────────────┐
//!  ObserverMessage ─► observer worker ┴──────────┘       ├──►│ Coordinator  │──► Fanout
//!                                                        │   │  registry    │
//!  interval ────────► scan ticker ───────────────────────┘   │  names       │
//!                                                            └──────────────┘
//! ```
//!
//! Rescan requests from either channel are handed to the scan worker, so a
//! slow scan never holds up list, config or rename requests.
//!
//! # Locking
//!
//! The registry and name store each sit behind a `tokio::sync::Mutex`,
//! always acquired registry first. No lock is held while a driver is
//! constructed or torn down, or while the bus is enumerated. Scans are
//! serialised by a separate `scan_lock`: explicit rescans queue behind a
//! running scan, periodic ticks are skipped while one runs. Renames hold
//! `names_save` from the update until the mapping is written, so saves land
//! in the order the names changed.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use deckhand_core::BusDescriptor;
//! use deckhand_hardware::SurfaceFactory;
//! use deckhand_hardware::mock::MockHidBus;
//! use deckhand_registry::Coordinator;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = MockHidBus::new();
//! bus.plug(BusDescriptor::new("/dev/hidraw0", 0x0fd9, 0x0060, 0).with_serial_number("CL01"));
//!
//! let coordinator = Coordinator::builder(SurfaceFactory::new(Arc::new(bus))).build();
//! let handle = coordinator.start().await;
//!
//! let ids: Vec<String> = coordinator.list().await.iter().map(|d| d.id.clone()).collect();
//! assert_eq!(ids, vec!["emulator", "elgato:CL01"]);
//!
//! handle.shutdown().await;
//! # }
//! ```

use crate::client::{ObserverConnection, SystemClient};
use crate::config::CoordinatorConfig;
use crate::error::{RegistryError, Result};
use crate::fanout::{Audience, DeviceList, Fanout, LogLevel, SystemEvent};
use crate::handler::{HandlerFactory, LoggingHandlerFactory};
use crate::messages::{ObserverMessage, ObserverRequest, RescanReply, SystemRequest};
use crate::names::NameStore;
use crate::projector::project;
use crate::registry::{Registry, RegistryEntry};
use deckhand_core::constants::{DEVICE_IN_USE_MESSAGE, EMULATOR_PATH, SCAN_FAILED_MESSAGE};
use deckhand_core::{BusDescriptor, DeviceConfig, DeviceFamily, DeviceSummary, DriverInfo};
use deckhand_hardware::traits::SurfaceDriver;
use deckhand_hardware::{
    ClassifyOptions, ConflictGuard, SurfaceFactory, Suppression, classify_with,
};
use deckhand_storage::{AnyPersistence, MemoryPersistence};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

/// Outcome of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Guard decision for this scan.
    pub suppression: Suppression,

    /// Interfaces reported by the bus.
    pub enumerated: usize,

    /// Ids of devices added by this scan.
    pub added: Vec<String>,

    /// Paths of recognised devices that could not be added, with the reason.
    pub skipped: Vec<(String, String)>,

    /// Set when enumeration itself failed.
    pub error: Option<String>,
}

impl ScanReport {
    fn new(suppression: Suppression) -> Self {
        Self {
            suppression,
            enumerated: 0,
            added: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }

    /// Message returned to whoever requested the scan.
    ///
    /// `Scan failed` when enumeration failed, otherwise the suppression
    /// reason, otherwise nothing.
    pub fn message(&self) -> Option<String> {
        if self.error.is_some() {
            return Some(SCAN_FAILED_MESSAGE.to_string());
        }
        self.suppression.reason().map(str::to_string)
    }
}

struct Inner {
    config: CoordinatorConfig,
    factory: SurfaceFactory,
    guard: ConflictGuard,
    handlers: Arc<dyn HandlerFactory>,
    persistence: AnyPersistence,
    registry: Mutex<Registry>,
    names: Mutex<NameStore>,
    names_save: Mutex<()>,
    fanout: Fanout,
    scan_lock: Mutex<()>,
}

/// Queued rescan. `None` when nobody waits for the outcome.
type ScanRequest = Option<RescanReply>;

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    factory: SurfaceFactory,
    config: CoordinatorConfig,
    guard: Option<ConflictGuard>,
    handlers: Option<Arc<dyn HandlerFactory>>,
    persistence: Option<AnyPersistence>,
}

impl CoordinatorBuilder {
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`ConflictGuard::system`].
    pub fn guard(mut self, guard: ConflictGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Defaults to [`LoggingHandlerFactory`].
    pub fn handlers(mut self, handlers: Arc<dyn HandlerFactory>) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Defaults to an empty in-memory store.
    pub fn persistence(mut self, persistence: impl Into<AnyPersistence>) -> Self {
        self.persistence = Some(persistence.into());
        self
    }

    pub fn build(self) -> Coordinator {
        let fanout = Fanout::new(self.config.event_buffer, self.config.observer_buffer);

        Coordinator {
            inner: Arc::new(Inner {
                factory: self.factory,
                guard: self.guard.unwrap_or_else(ConflictGuard::system),
                handlers: self
                    .handlers
                    .unwrap_or_else(|| Arc::new(LoggingHandlerFactory) as Arc<dyn HandlerFactory>),
                persistence: self
                    .persistence
                    .unwrap_or_else(|| MemoryPersistence::new().into()),
                registry: Mutex::new(Registry::new()),
                names: Mutex::new(NameStore::new()),
                names_save: Mutex::new(()),
                fanout,
                scan_lock: Mutex::new(()),
                config: self.config,
            }),
        }
    }
}

/// Owns the registry and coordinates hot-plug.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn builder(factory: SurfaceFactory) -> CoordinatorBuilder {
        CoordinatorBuilder {
            factory,
            config: CoordinatorConfig::default(),
            guard: None,
            handlers: None,
            persistence: None,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Subscribe to the internal event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.inner.fanout.subscribe()
    }

    pub fn fanout(&self) -> &Fanout {
        &self.inner.fanout
    }

    /// Load names, register the emulator, run the first scan and spawn the
    /// request workers.
    pub async fn start(&self) -> CoordinatorHandle {
        self.load_names().await;

        if self.inner.config.add_emulator
            && let Err(e) = self
                .add(BusDescriptor::synthetic(EMULATOR_PATH), DeviceFamily::Emulator)
                .await
        {
            error!(error = %e, "Failed to register emulator surface");
        }

        let report = self.scan().await;
        info!(
            devices = self.inner.registry.lock().await.len(),
            added = report.added.len(),
            "Coordinator started"
        );

        let buffer = self.inner.config.request_buffer.max(1);
        let (system_tx, mut system_rx) = mpsc::channel(buffer);
        let (observer_tx, mut observer_rx) = mpsc::channel(buffer);
        let (scan_tx, mut scan_rx) = mpsc::channel::<ScanRequest>(buffer);
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut tasks = JoinSet::new();

        let coordinator = self.clone();
        let scans = scan_tx.clone();
        let mut stop = stop_rx.clone();
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    request = system_rx.recv() => match request {
                        Some(request) => coordinator.handle_system(request, &scans).await,
                        None => break,
                    },
                }
            }
            debug!("System worker stopped");
        });

        let coordinator = self.clone();
        let scans = scan_tx;
        let mut stop = stop_rx.clone();
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    message = observer_rx.recv() => match message {
                        Some(message) => coordinator.handle_observer(message, &scans).await,
                        None => break,
                    },
                }
            }
            debug!("Observer worker stopped");
        });

        let coordinator = self.clone();
        let mut stop = stop_rx.clone();
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    request = scan_rx.recv() => match request {
                        Some(reply) => {
                            let message = coordinator.scan().await.message();
                            if let Some(reply) = reply {
                                let _ = reply.send(message);
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!("Scan worker stopped");
        });

        if let Some(interval) = self.inner.config.scan_interval {
            let coordinator = self.clone();
            let mut stop = stop_rx;
            tasks.spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // The first tick completes immediately; the initial scan already ran.
                ticker.tick().await;

                loop {
                    tokio::select! {
                        biased;
                        _ = stop.changed() => break,
                        _ = ticker.tick() => {
                            if coordinator.try_scan().await.is_none() {
                                trace!("Scan already running, periodic tick skipped");
                            }
                        }
                    }
                }
            });
        }

        CoordinatorHandle {
            coordinator: self.clone(),
            system_tx,
            observer_tx,
            stop: stop_tx,
            tasks,
        }
    }

    /// Replace the in-memory names with the persisted mapping.
    ///
    /// A storage failure leaves the current names in place.
    pub async fn load_names(&self) {
        match NameStore::load(&self.inner.persistence).await {
            Ok(loaded) => *self.inner.names.lock().await = loaded,
            Err(e) => warn!(error = %e, "Failed to load surface names, starting without them"),
        }
    }

    /// Run a scan, waiting for any scan in progress to finish first.
    pub async fn scan(&self) -> ScanReport {
        let _scan = self.inner.scan_lock.lock().await;
        self.scan_locked().await
    }

    /// Run a scan unless one is already in progress.
    pub async fn try_scan(&self) -> Option<ScanReport> {
        let _scan = self.inner.scan_lock.try_lock().ok()?;
        Some(self.scan_locked().await)
    }

    async fn scan_locked(&self) -> ScanReport {
        let suppression = self.inner.guard.check().await;
        let options = ClassifyOptions::suppress_protected(suppression.is_active());
        let mut report = ScanReport::new(suppression);

        let descriptors = match self.enumerate().await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                error!(error = %e, "Bus enumeration failed");
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.enumerated = descriptors.len();

        let candidates: Vec<(BusDescriptor, DeviceFamily)> = {
            let registry = self.inner.registry.lock().await;
            descriptors
                .into_iter()
                .filter(|descriptor| !registry.contains(&descriptor.path))
                .filter_map(|descriptor| {
                    classify_with(&descriptor, options).map(|family| (descriptor, family))
                })
                .collect()
        };

        for (descriptor, family) in candidates {
            let path = descriptor.path.clone();
            match self.add(descriptor, family).await {
                Ok(info) => report.added.push(info.id),
                Err(e) => report.skipped.push((path, e.to_string())),
            }
        }

        debug!(
            enumerated = report.enumerated,
            added = report.added.len(),
            skipped = report.skipped.len(),
            suppressed = report.suppression.is_active(),
            "Scan complete"
        );
        report
    }

    async fn enumerate(&self) -> Result<Vec<BusDescriptor>> {
        let hid = Arc::clone(self.inner.factory.hid());
        match tokio::task::spawn_blocking(move || hid.enumerate()).await {
            Ok(Ok(descriptors)) => Ok(descriptors),
            Ok(Err(e)) => Err(RegistryError::ScanFailed(e.to_string())),
            Err(e) => Err(RegistryError::ScanFailed(format!("enumeration worker failed: {e}"))),
        }
    }

    /// Register a device at `descriptor.path`, replacing any existing entry.
    ///
    /// The existing entry is torn down before the new driver is constructed.
    /// A busy device is reported on the internal bus and returned as an
    /// error; the registry is left without an entry for that path.
    pub async fn add(&self, descriptor: BusDescriptor, family: DeviceFamily) -> Result<DriverInfo> {
        let path = descriptor.path.clone();
        debug!(
            path = %path,
            family = %family,
            product = descriptor.product_name.as_deref().unwrap_or_default(),
            "Adding device"
        );

        let previous = self.inner.registry.lock().await.take(&path);
        let replaced = previous.is_some();
        if let Some(entry) = previous {
            debug!(path = %path, id = %entry.info().id, "Replacing existing device");
            // Best-effort: quit failures are logged by teardown.
            let _ = entry.teardown().await;
        }

        let driver = match self.inner.factory.create(&descriptor, family).await {
            Ok(driver) => driver,
            Err(e) => {
                if e.is_busy() {
                    error!(path = %path, family = %family, "Device is in use by another application");
                    self.inner
                        .fanout
                        .log(format!("USB({family})"), LogLevel::Error, DEVICE_IN_USE_MESSAGE);
                } else {
                    warn!(path = %path, family = %family, error = %e, "Failed to initialise device");
                }
                if replaced {
                    self.publish(Audience::All).await;
                }
                return Err(e.into());
            }
        };

        let info = driver.info().clone();
        let handler = self.inner.handlers.attach(&info);

        let (racer, list) = {
            let mut registry = self.inner.registry.lock().await;
            let racer = registry.insert(RegistryEntry::new(driver, handler));
            let names = self.inner.names.lock().await;
            (racer, DeviceList::from(project(&registry, &names)))
        };

        if let Some(entry) = racer {
            warn!(path = %path, id = %entry.info().id, "Concurrent add on the same path, discarding the older device");
            // Best-effort: quit failures are logged by teardown.
            let _ = entry.teardown().await;
        }

        self.inner.fanout.publish(list, Audience::All);
        info!(id = %info.id, path = %path, family = %family, "Device added");
        Ok(info)
    }

    /// Remove and tear down the device at `path`.
    ///
    /// Returns `false` without publishing anything when no device is
    /// registered there.
    pub async fn remove(&self, path: &str) -> bool {
        let Some(entry) = self.inner.registry.lock().await.take(path) else {
            debug!(path = %path, "Remove requested for unknown path");
            return false;
        };

        let id = entry.info().id.clone();
        // Best-effort: quit failures are logged by teardown.
        let _ = entry.teardown().await;

        self.publish(Audience::All).await;
        info!(id = %id, path = %path, "Device removed");
        true
    }

    /// Remove and tear down every device.
    ///
    /// Each entry is torn down independently; a failing one does not stop
    /// the rest. Returns the number of entries removed.
    pub async fn quit_all(&self) -> usize {
        let entries = self.inner.registry.lock().await.drain();
        let count = entries.len();

        let mut failures = 0;
        for entry in entries {
            if !entry.teardown().await.is_clean() {
                failures += 1;
            }
        }

        if count > 0 {
            self.publish(Audience::All).await;
        }
        info!(removed = count, failures, "All devices released");
        count
    }

    /// Summary of the device at `path`.
    pub async fn get(&self, path: &str) -> Option<DeviceSummary> {
        let registry = self.inner.registry.lock().await;
        let id = registry.get(path)?.info().id.clone();
        let names = self.inner.names.lock().await;
        project(&registry, &names).into_iter().find(|summary| summary.id == id)
    }

    /// The current sorted device list.
    pub async fn list(&self) -> DeviceList {
        let registry = self.inner.registry.lock().await;
        let names = self.inner.names.lock().await;
        project(&registry, &names).into()
    }

    pub async fn device_count(&self) -> usize {
        self.inner.registry.lock().await.len()
    }

    /// Settings of the device with `id`.
    pub async fn config_get(&self, id: &str) -> Result<DeviceConfig> {
        let registry = self.inner.registry.lock().await;
        registry
            .find_by_id(id)
            .map(|entry| entry.driver().config().clone())
            .ok_or_else(|| RegistryError::device_not_found(id))
    }

    /// Merge `config` into the settings of the device with `id`.
    pub async fn config_set(&self, id: &str, config: DeviceConfig) -> Result<()> {
        let list = {
            let mut registry = self.inner.registry.lock().await;
            let entry = registry
                .find_by_id_mut(id)
                .ok_or_else(|| RegistryError::device_not_found(id))?;
            entry.driver_mut().set_config(config).await?;

            let names = self.inner.names.lock().await;
            DeviceList::from(project(&registry, &names))
        };

        self.inner.fanout.publish(list, Audience::All);
        Ok(())
    }

    /// Set the display name for `serial` and persist the full mapping.
    ///
    /// Rejected unless a live device reports `serial`. The updated list is
    /// published before the names are written. Concurrent renames are
    /// written one at a time, each with every name set before it.
    pub async fn set_name(&self, serial: &str, name: &str) -> Result<()> {
        let _save = self.inner.names_save.lock().await;

        let (list, snapshot) = {
            let registry = self.inner.registry.lock().await;
            if registry.find_by_serial(serial).is_none() {
                return Err(RegistryError::rename_rejected(serial));
            }

            let mut names = self.inner.names.lock().await;
            names.set(serial, name);
            (DeviceList::from(project(&registry, &names)), names.clone())
        };

        self.inner.fanout.publish(list, Audience::All);
        info!(serial = %serial, name = %name, "Surface renamed");

        snapshot.save(&self.inner.persistence).await?;
        Ok(())
    }

    /// Publish the current list to `audience`.
    pub async fn publish(&self, audience: Audience) {
        let list = self.list().await;
        self.inner.fanout.publish(list, audience);
    }

    async fn handle_system(&self, request: SystemRequest, scans: &mpsc::Sender<ScanRequest>) {
        match request {
            SystemRequest::Rescan { reply } => {
                if scans.send(reply).await.is_err() {
                    debug!("Scan worker stopped, rescan dropped");
                }
            }
            SystemRequest::RemoveDevice { path } => {
                self.remove(&path).await;
            }
            SystemRequest::ListDevices { reply } => {
                let _ = reply.send(self.list().await);
            }
            SystemRequest::ConfigGet { id, reply } => {
                let _ = reply.send(self.config_get(&id).await);
            }
            SystemRequest::ConfigSet { id, config, reply } => {
                let result = self.config_set(&id, config).await;
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            SystemRequest::AddSatellite { descriptor } => {
                if let Err(e) = self.add(descriptor, DeviceFamily::Satellite).await {
                    warn!(error = %e, "Failed to add satellite surface");
                }
            }
            SystemRequest::AddPlugin { path } => {
                if let Err(e) = self.add(BusDescriptor::synthetic(path), DeviceFamily::Plugin).await {
                    warn!(error = %e, "Failed to add plugin surface");
                }
            }
        }
    }

    async fn handle_observer(&self, message: ObserverMessage, scans: &mpsc::Sender<ScanRequest>) {
        let ObserverMessage { observer, request } = message;

        match request {
            ObserverRequest::ListDevices => self.publish(Audience::Observer(observer)).await,
            ObserverRequest::Rescan { reply } => {
                if scans.send(Some(reply)).await.is_err() {
                    debug!(observer = %observer, "Scan worker stopped, rescan dropped");
                }
            }
            ObserverRequest::ConfigGet { id, reply } => {
                let _ = reply.send(self.config_get(&id).await);
            }
            ObserverRequest::ConfigSet { id, config, reply } => {
                let _ = reply.send(self.config_set(&id, config).await);
            }
            ObserverRequest::SetName { serial, name, reply } => {
                let result = self.set_name(&serial, &name).await;
                if let Err(e) = &result {
                    debug!(observer = %observer, error = %e, "Rename request failed");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
        }
    }
}

/// Running coordinator: request channels and worker tasks.
pub struct CoordinatorHandle {
    coordinator: Coordinator,
    system_tx: mpsc::Sender<SystemRequest>,
    observer_tx: mpsc::Sender<ObserverMessage>,
    stop: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl CoordinatorHandle {
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Client for the internal bus.
    pub fn system(&self) -> SystemClient {
        SystemClient::new(self.system_tx.clone())
    }

    /// Register a new observer.
    pub fn connect_observer(&self) -> ObserverConnection {
        let (id, events) = self.coordinator.fanout().register_observer();
        ObserverConnection::new(id, events, self.observer_tx.clone(), self.coordinator.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.coordinator.subscribe()
    }

    /// Stop the workers and release every device.
    ///
    /// Each worker finishes the request it is handling before it stops;
    /// queued requests are dropped and their callers see
    /// [`RegistryError::ChannelClosed`]. Returns the number of devices
    /// released.
    pub async fn shutdown(mut self) -> usize {
        let _ = self.stop.send(true);

        let mut panics = 0;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result
                && e.is_panic()
            {
                panics += 1;
            }
        }
        if panics > 0 {
            error!(panics, "Coordinator workers panicked");
        }

        self.coordinator.quit_all().await
    }
}
