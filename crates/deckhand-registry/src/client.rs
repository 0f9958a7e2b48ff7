//! Request clients for a running coordinator.
//!
//! [`SystemClient`] is what other parts of the application use to talk to
//! the coordinator over the internal bus. [`ObserverConnection`] is one
//! connected user interface: it sends requests tagged with its own
//! [`ObserverId`] and receives device list pushes.

use crate::coordinator::Coordinator;
use crate::error::{RegistryError, Result};
use crate::fanout::{DeviceList, ObserverEvent, ObserverId};
use crate::messages::{ObserverMessage, ObserverRequest, SystemRequest};
use deckhand_core::{BusDescriptor, DeviceConfig};
use tokio::sync::{mpsc, oneshot};

/// Sender side of the internal bus.
#[derive(Debug, Clone)]
pub struct SystemClient {
    tx: mpsc::Sender<SystemRequest>,
}

impl SystemClient {
    pub(crate) fn new(tx: mpsc::Sender<SystemRequest>) -> Self {
        Self { tx }
    }

    async fn send(&self, request: SystemRequest) -> Result<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| RegistryError::ChannelClosed)
    }

    /// Scan the bus and wait for it to finish.
    ///
    /// Returns the suppression reason or `Scan failed`, if either applies.
    pub async fn rescan(&self) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(SystemRequest::Rescan { reply: Some(reply) }).await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Queue a scan without waiting for it.
    pub async fn request_rescan(&self) -> Result<()> {
        self.send(SystemRequest::Rescan { reply: None }).await
    }

    pub async fn remove_device(&self, path: impl Into<String>) -> Result<()> {
        self.send(SystemRequest::RemoveDevice { path: path.into() }).await
    }

    pub async fn list_devices(&self) -> Result<DeviceList> {
        let (reply, rx) = oneshot::channel();
        self.send(SystemRequest::ListDevices { reply }).await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    pub async fn config_get(&self, id: impl Into<String>) -> Result<DeviceConfig> {
        let (reply, rx) = oneshot::channel();
        self.send(SystemRequest::ConfigGet { id: id.into(), reply }).await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    pub async fn config_set(&self, id: impl Into<String>, config: DeviceConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SystemRequest::ConfigSet {
            id: id.into(),
            config,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    pub async fn add_satellite(&self, descriptor: BusDescriptor) -> Result<()> {
        self.send(SystemRequest::AddSatellite { descriptor }).await
    }

    pub async fn add_plugin(&self, path: impl Into<String>) -> Result<()> {
        self.send(SystemRequest::AddPlugin { path: path.into() }).await
    }
}

/// One connected observer.
///
/// Dropping the connection is enough to stop receiving pushes; the fan-out
/// forgets closed observers on its next publish. [`disconnect`](Self::disconnect)
/// does so immediately.
#[derive(Debug)]
pub struct ObserverConnection {
    id: ObserverId,
    events: mpsc::Receiver<ObserverEvent>,
    requests: mpsc::Sender<ObserverMessage>,
    coordinator: Coordinator,
}

impl ObserverConnection {
    pub(crate) fn new(
        id: ObserverId,
        events: mpsc::Receiver<ObserverEvent>,
        requests: mpsc::Sender<ObserverMessage>,
        coordinator: Coordinator,
    ) -> Self {
        Self {
            id,
            events,
            requests,
            coordinator,
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Wait for the next push.
    pub async fn recv(&mut self) -> Option<ObserverEvent> {
        self.events.recv().await
    }

    /// Wait for the next device list push.
    pub async fn next_list(&mut self) -> Option<DeviceList> {
        match self.events.recv().await? {
            ObserverEvent::DevicesList(list) => Some(list),
        }
    }

    async fn send(&self, request: ObserverRequest) -> Result<()> {
        self.requests
            .send(ObserverMessage {
                observer: self.id,
                request,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)
    }

    /// Ask for the current list. It arrives as a push on this connection.
    pub async fn request_list(&self) -> Result<()> {
        self.send(ObserverRequest::ListDevices).await
    }

    pub async fn rescan(&self) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(ObserverRequest::Rescan { reply }).await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    pub async fn config_get(&self, id: impl Into<String>) -> Result<DeviceConfig> {
        let (reply, rx) = oneshot::channel();
        self.send(ObserverRequest::ConfigGet { id: id.into(), reply }).await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    pub async fn config_set(&self, id: impl Into<String>, config: DeviceConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(ObserverRequest::ConfigSet {
            id: id.into(),
            config,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    pub async fn set_name(&self, serial: impl Into<String>, name: impl Into<String>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(ObserverRequest::SetName {
            serial: serial.into(),
            name: name.into(),
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    pub fn disconnect(self) {
        self.coordinator.fanout().unregister_observer(self.id);
    }
}
