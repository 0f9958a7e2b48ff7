//! Bus identities and fixed strings shared across the Deckhand crates.
//!
//! Vendor and product ids are the values reported by HID enumeration for each
//! supported surface family. The classifier in `deckhand-hardware` is the only
//! consumer of the id tables; the remaining constants are shared between the
//! hardware layer, the registry and the storage adapters.
//!
//! # Usage
//!
//! ```
//! use deckhand_core::constants::*;
//!
//! assert_eq!(ELGATO_VENDOR_ID, 0x0fd9);
//! assert_eq!(XKEYS_VENDOR_ID, 1523);
//! assert_eq!(EMULATOR_PATH, "emulator");
//! ```

// ============================================================================
// Elgato Stream Deck
// ============================================================================

/// USB vendor id of Elgato Stream Deck devices.
pub const ELGATO_VENDOR_ID: u16 = 0x0fd9;

/// Original 15-key Stream Deck.
pub const STREAMDECK_PRODUCT_ID: u16 = 0x0060;

/// Stream Deck Mini (6 keys).
pub const STREAMDECK_MINI_PRODUCT_ID: u16 = 0x0063;

/// Stream Deck XL (32 keys).
pub const STREAMDECK_XL_PRODUCT_ID: u16 = 0x006c;

/// Second generation 15-key Stream Deck.
pub const STREAMDECK_V2_PRODUCT_ID: u16 = 0x006d;

/// Stream Deck MK.2.
///
/// A later hardware revision that speaks the same protocol as
/// [`STREAMDECK_V2_PRODUCT_ID`] and is classified as the same family.
pub const STREAMDECK_MK2_PRODUCT_ID: u16 = 0x0080;

// ============================================================================
// Infinitton
// ============================================================================

/// USB vendor id used by Infinitton iDisplay devices.
pub const INFINITTON_VENDOR_ID: u16 = 0xffff;

/// Infinitton iDisplay, first product id.
pub const INFINITTON_PRODUCT_ID: u16 = 0x1f40;

/// Infinitton iDisplay, second product id.
pub const INFINITTON_ALT_PRODUCT_ID: u16 = 0x1f41;

// ============================================================================
// P.I. Engineering X-keys
// ============================================================================

/// USB vendor id of P.I. Engineering X-keys devices.
///
/// X-keys expose several HID interfaces; only interface 0 carries key data.
pub const XKEYS_VENDOR_ID: u16 = 1523;

/// The only X-keys HID interface that is claimed.
pub const XKEYS_INTERFACE: i32 = 0;

// ============================================================================
// Synthetic surfaces
// ============================================================================

/// Path and id of the built-in emulator surface.
pub const EMULATOR_PATH: &str = "emulator";

/// Id reported by the emulator surface. Always sorts first.
pub const EMULATOR_ID: &str = "emulator";

// ============================================================================
// Conflict guard
// ============================================================================

/// Process name of the vendor application that locks Stream Deck hardware.
pub const STREAMDECK_APP_PROCESS_NAME: &str = "Stream Deck";

/// Reason reported to rescan requesters while the vendor application runs.
pub const STREAMDECK_SUPPRESSED_REASON: &str =
    "Not scanning for Stream Deck devices as the stream deck app is running";

// ============================================================================
// Persistence and user-facing messages
// ============================================================================

/// Persistence key holding the serial → display name mapping.
pub const SURFACE_NAMES_KEY: &str = "surfaces_names";

/// Message logged when a matched device cannot be opened exclusively.
pub const DEVICE_IN_USE_MESSAGE: &str = "Found device, but no access. Please quit any other applications using the device, and try again.";

/// Reply sent when a config request names an unknown device id.
pub const DEVICE_NOT_FOUND_MESSAGE: &str = "device not found";

/// Reply sent to a rescan requester when bus enumeration failed.
pub const SCAN_FAILED_MESSAGE: &str = "Scan failed";
