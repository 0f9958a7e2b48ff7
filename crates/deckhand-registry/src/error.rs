//! Error types for registry operations.

use deckhand_core::constants::DEVICE_NOT_FOUND_MESSAGE;
use deckhand_hardware::HardwareError;
use deckhand_storage::StorageError;
use thiserror::Error;

/// Errors returned by the coordinator to the caller that issued a request.
///
/// Per-device failures during a scan never surface here; they are logged and
/// the scan moves on.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No live device has the requested id.
    #[error("{}", DEVICE_NOT_FOUND_MESSAGE)]
    DeviceNotFound { id: String },

    /// A name was set for a serial number that no live device reports.
    #[error("Rename rejected: no live device with serial number '{serial}'")]
    RenameRejected { serial: String },

    /// Bus enumeration failed; nothing was added.
    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The coordinator's workers are gone.
    #[error("Coordinator channel closed")]
    ChannelClosed,
}

impl RegistryError {
    pub fn device_not_found(id: impl Into<String>) -> Self {
        Self::DeviceNotFound { id: id.into() }
    }

    pub fn rename_rejected(serial: impl Into<String>) -> Self {
        Self::RenameRejected { serial: serial.into() }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_message_matches_protocol() {
        let err = RegistryError::device_not_found("elgato:AB12");
        assert_eq!(err.to_string(), "device not found");
    }

    #[test]
    fn test_hardware_conversion() {
        let err: RegistryError = HardwareError::busy("/dev/hidraw0").into();
        assert!(matches!(err, RegistryError::Hardware(_)));
    }
}
