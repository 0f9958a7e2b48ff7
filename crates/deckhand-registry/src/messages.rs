//! Requests accepted by the coordinator.
//!
//! Requests arrive over two channels: the internal bus (other parts of the
//! application) and the observer transport (user interfaces). Replies travel
//! back on a `oneshot` sender carried in the request. Device list requests
//! have no reply channel; the list is pushed through the fan-out instead.

use crate::error::Result;
use crate::fanout::{DeviceList, ObserverId};
use deckhand_core::{BusDescriptor, DeviceConfig};
use tokio::sync::oneshot;

/// Reply to a rescan: the reason the scan was restricted or failed, if any.
pub type RescanReply = oneshot::Sender<Option<String>>;

/// Request from another part of the application.
#[derive(Debug)]
#[non_exhaustive]
pub enum SystemRequest {
    /// Enumerate the bus and add new surfaces.
    Rescan { reply: Option<RescanReply> },

    /// Remove the device registered at `path`.
    RemoveDevice { path: String },

    /// Reply with the current list.
    ListDevices { reply: oneshot::Sender<DeviceList> },

    ConfigGet {
        id: String,
        reply: oneshot::Sender<Result<DeviceConfig>>,
    },

    ConfigSet {
        id: String,
        config: DeviceConfig,
        reply: Option<oneshot::Sender<Result<()>>>,
    },

    /// Register a remote satellite surface.
    AddSatellite { descriptor: BusDescriptor },

    /// Register a surface bridged in by the vendor plugin.
    AddPlugin { path: String },
}

/// Request from an observer.
#[derive(Debug)]
#[non_exhaustive]
pub enum ObserverRequest {
    /// Push the current list to the requesting observer.
    ListDevices,

    Rescan { reply: RescanReply },

    ConfigGet {
        id: String,
        reply: oneshot::Sender<Result<DeviceConfig>>,
    },

    ConfigSet {
        id: String,
        config: DeviceConfig,
        reply: oneshot::Sender<Result<()>>,
    },

    SetName {
        serial: String,
        name: String,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
}

/// An observer request tagged with its sender.
#[derive(Debug)]
pub struct ObserverMessage {
    pub observer: ObserverId,
    pub request: ObserverRequest,
}
