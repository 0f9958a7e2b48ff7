use crate::{Result, constants::EMULATOR_ID, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-specific settings as exchanged with observers.
pub type DeviceConfig = serde_json::Map<String, serde_json::Value>;

/// Closed set of surface families known to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DeviceFamily {
    /// Original 15-key Stream Deck.
    StreamDeck,
    /// Stream Deck Mini.
    StreamDeckMini,
    /// Stream Deck XL.
    StreamDeckXl,
    /// Second generation Stream Deck, including the MK.2 revision.
    StreamDeckV2,
    /// Infinitton iDisplay.
    Infinitton,
    /// P.I. Engineering X-keys (interface 0 only).
    XKeys,
    /// Built-in software emulator.
    Emulator,
    /// Surface provided through the Stream Deck plugin bridge.
    Plugin,
    /// Remote satellite surface.
    Satellite,
}

impl DeviceFamily {
    /// All families, in declaration order.
    pub const ALL: [DeviceFamily; 9] = [
        Self::StreamDeck,
        Self::StreamDeckMini,
        Self::StreamDeckXl,
        Self::StreamDeckV2,
        Self::Infinitton,
        Self::XKeys,
        Self::Emulator,
        Self::Plugin,
        Self::Satellite,
    ];

    /// Stable label reported as `type` in device summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::StreamDeck => "elgato",
            Self::StreamDeckMini => "elgato-mini",
            Self::StreamDeckXl => "elgato-xl",
            Self::StreamDeckV2 => "elgato-v2",
            Self::Infinitton => "infinitton",
            Self::XKeys => "xkeys",
            Self::Emulator => "emulator",
            Self::Plugin => "streamdeck_plugin",
            Self::Satellite => "satellite_device",
        }
    }

    /// Synthetic families are constructed without touching the HID bus.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Emulator | Self::Plugin | Self::Satellite)
    }

    /// Families whose hardware the vendor application can lock exclusively.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Self::StreamDeck | Self::StreamDeckMini | Self::StreamDeckXl | Self::StreamDeckV2
        )
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for DeviceFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.label() == s)
            .ok_or_else(|| Error::UnknownFamily(s.to_string()))
    }
}

impl From<DeviceFamily> for String {
    fn from(family: DeviceFamily) -> Self {
        family.label().to_string()
    }
}

impl TryFrom<String> for DeviceFamily {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Snapshot of one connection reported by bus enumeration.
///
/// The path is an opaque handle that stays stable for as long as the physical
/// connection exists. Descriptors are re-derived on every scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusDescriptor {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    /// HID interface number; `-1` when the platform does not report one.
    pub interface_number: i32,
    pub serial_number: Option<String>,
    pub product_name: Option<String>,
}

impl BusDescriptor {
    pub fn new(path: impl Into<String>, vendor_id: u16, product_id: u16, interface_number: i32) -> Self {
        Self {
            path: path.into(),
            vendor_id,
            product_id,
            interface_number,
            serial_number: None,
            product_name: None,
        }
    }

    /// Descriptor for a surface that does not live on the HID bus.
    pub fn synthetic(path: impl Into<String>) -> Self {
        Self::new(path, 0, 0, -1)
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    /// Ensure the descriptor can identify a device.
    ///
    /// # Errors
    /// Returns `Error::InvalidDescriptor` if the path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(Error::InvalidDescriptor("path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Identity of a live driver instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    /// Family-qualified identifier, unique among live devices.
    pub id: String,
    /// Stable hardware identity; empty for synthetic devices without one.
    pub serial_number: String,
    pub family: DeviceFamily,
    /// Bus path the instance was created from.
    pub path: String,
}

impl DriverInfo {
    /// Build the identity of a device from its family, path and serial.
    ///
    /// The emulator always reports `emulator` as id and serial. Other devices
    /// use `"{family}:{serial}"`, falling back to the path when no serial is
    /// known.
    pub fn new(family: DeviceFamily, path: impl Into<String>, serial_number: Option<&str>) -> Self {
        let path = path.into();

        if family == DeviceFamily::Emulator {
            return Self {
                id: EMULATOR_ID.to_string(),
                serial_number: EMULATOR_ID.to_string(),
                family,
                path,
            };
        }

        let serial_number = serial_number.unwrap_or_default().trim().to_string();
        let identity = if serial_number.is_empty() {
            path.as_str()
        } else {
            serial_number.as_str()
        };

        Self {
            id: format!("{}:{}", family.label(), identity),
            serial_number,
            family,
            path,
        }
    }

    #[must_use]
    pub fn is_emulator(&self) -> bool {
        self.id == EMULATOR_ID
    }
}

/// Externally visible, read-only view of one registered device.
///
/// Field names on the wire follow the observer protocol (`serialnumber`,
/// `type`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: String,
    #[serde(rename = "serialnumber")]
    pub serial_number: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub config: DeviceConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DeviceFamily::StreamDeck, "elgato")]
    #[case(DeviceFamily::StreamDeckMini, "elgato-mini")]
    #[case(DeviceFamily::StreamDeckXl, "elgato-xl")]
    #[case(DeviceFamily::StreamDeckV2, "elgato-v2")]
    #[case(DeviceFamily::Infinitton, "infinitton")]
    #[case(DeviceFamily::XKeys, "xkeys")]
    #[case(DeviceFamily::Emulator, "emulator")]
    #[case(DeviceFamily::Plugin, "streamdeck_plugin")]
    #[case(DeviceFamily::Satellite, "satellite_device")]
    fn test_family_label_parses_back(#[case] family: DeviceFamily, #[case] label: &str) {
        assert_eq!(family.label(), label);
        assert_eq!(family.to_string(), label);
        assert_eq!(label.parse::<DeviceFamily>().unwrap(), family);
    }

    #[test]
    fn test_unknown_family_label() {
        let result: Result<DeviceFamily> = "elgato-plus".parse();
        assert!(matches!(result, Err(Error::UnknownFamily(_))));
    }

    #[test]
    fn test_family_classes() {
        assert!(DeviceFamily::Emulator.is_synthetic());
        assert!(DeviceFamily::Satellite.is_synthetic());
        assert!(!DeviceFamily::XKeys.is_synthetic());

        assert!(DeviceFamily::StreamDeckV2.is_protected());
        assert!(!DeviceFamily::Infinitton.is_protected());
        assert!(!DeviceFamily::Plugin.is_protected());
    }

    #[test]
    fn test_family_serializes_as_label() {
        let json = serde_json::to_string(&DeviceFamily::StreamDeckXl).unwrap();
        assert_eq!(json, "\"elgato-xl\"");
        let family: DeviceFamily = serde_json::from_str(&json).unwrap();
        assert_eq!(family, DeviceFamily::StreamDeckXl);
    }

    #[test]
    fn test_emulator_identity() {
        let info = DriverInfo::new(DeviceFamily::Emulator, "emulator", None);
        assert_eq!(info.id, "emulator");
        assert_eq!(info.serial_number, "emulator");
        assert!(info.is_emulator());
    }

    #[rstest]
    #[case(Some("CL12345"), "elgato:CL12345", "CL12345")]
    #[case(Some("  "), "elgato:/dev/hidraw3", "")]
    #[case(None, "elgato:/dev/hidraw3", "")]
    fn test_device_identity(
        #[case] serial: Option<&str>,
        #[case] expected_id: &str,
        #[case] expected_serial: &str,
    ) {
        let info = DriverInfo::new(DeviceFamily::StreamDeck, "/dev/hidraw3", serial);
        assert_eq!(info.id, expected_id);
        assert_eq!(info.serial_number, expected_serial);
        assert!(!info.is_emulator());
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = BusDescriptor::new("/dev/hidraw0", 0x0fd9, 0x0060, 0)
            .with_serial_number("AL01")
            .with_product_name("Stream Deck");

        assert_eq!(descriptor.serial_number.as_deref(), Some("AL01"));
        assert_eq!(descriptor.product_name.as_deref(), Some("Stream Deck"));
        assert!(descriptor.validate().is_ok());
        assert!(BusDescriptor::synthetic("").validate().is_err());
    }

    #[test]
    fn test_summary_wire_names() {
        let summary = DeviceSummary {
            id: "emulator".to_string(),
            serial_number: "emulator".to_string(),
            device_type: "emulator".to_string(),
            name: String::new(),
            config: DeviceConfig::new(),
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["serialnumber"], "emulator");
        assert_eq!(value["type"], "emulator");
        assert!(value.get("serial_number").is_none());
    }
}
