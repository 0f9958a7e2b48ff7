//! Identity classification of HID bus descriptors.
//!
//! Maps the `(vendor id, product id, interface number)` triple reported by
//! enumeration to a [`DeviceFamily`]. Classification is a pure table lookup:
//! no state, no I/O, safe to call from any thread.
//!
//! # Known identities
//!
//! | Vendor | Product | Interface | Family |
//! |--------|---------|-----------|--------|
//! | `0x0fd9` | `0x0060` | any | `elgato` |
//! | `0x0fd9` | `0x0063` | any | `elgato-mini` |
//! | `0x0fd9` | `0x006c` | any | `elgato-xl` |
//! | `0x0fd9` | `0x006d` | any | `elgato-v2` |
//! | `0x0fd9` | `0x0080` | any | `elgato-v2` (MK.2, same protocol) |
//! | `0xffff` | `0x1f40` | any | `infinitton` |
//! | `0xffff` | `0x1f41` | any | `infinitton` |
//! | `1523` | any | `0` | `xkeys` |
//!
//! Product ids not in the table are never folded into an existing family.
//!
//! # Examples
//!
//! ```
//! use deckhand_core::{BusDescriptor, DeviceFamily};
//! use deckhand_hardware::classifier::classify;
//!
//! let descriptor = BusDescriptor::new("/dev/hidraw0", 0xffff, 0x1f40, 0);
//! assert_eq!(classify(&descriptor), Some(DeviceFamily::Infinitton));
//!
//! let keyboard = BusDescriptor::new("/dev/hidraw1", 0x046d, 0xc31c, 0);
//! assert_eq!(classify(&keyboard), None);
//! ```

use deckhand_core::constants::*;
use deckhand_core::{BusDescriptor, DeviceFamily};

/// Scan-scoped options applied on top of the identity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Drop matches in the protected Stream Deck families.
    pub suppress_protected: bool,
}

impl ClassifyOptions {
    pub fn suppress_protected(suppress: bool) -> Self {
        Self {
            suppress_protected: suppress,
        }
    }
}

/// Classify a descriptor by its bus identity.
pub fn classify(descriptor: &BusDescriptor) -> Option<DeviceFamily> {
    classify_ids(
        descriptor.vendor_id,
        descriptor.product_id,
        descriptor.interface_number,
    )
}

/// Classify a descriptor, honouring scan-scoped options.
pub fn classify_with(descriptor: &BusDescriptor, options: ClassifyOptions) -> Option<DeviceFamily> {
    classify(descriptor).filter(|family| !(options.suppress_protected && family.is_protected()))
}

/// Classify raw bus identity values.
pub fn classify_ids(vendor_id: u16, product_id: u16, interface_number: i32) -> Option<DeviceFamily> {
    match (vendor_id, product_id) {
        (ELGATO_VENDOR_ID, STREAMDECK_PRODUCT_ID) => Some(DeviceFamily::StreamDeck),
        (ELGATO_VENDOR_ID, STREAMDECK_MINI_PRODUCT_ID) => Some(DeviceFamily::StreamDeckMini),
        (ELGATO_VENDOR_ID, STREAMDECK_XL_PRODUCT_ID) => Some(DeviceFamily::StreamDeckXl),
        (ELGATO_VENDOR_ID, STREAMDECK_V2_PRODUCT_ID) => Some(DeviceFamily::StreamDeckV2),
        // MK.2 is a different hardware revision speaking the v2 protocol
        (ELGATO_VENDOR_ID, STREAMDECK_MK2_PRODUCT_ID) => Some(DeviceFamily::StreamDeckV2),
        (INFINITTON_VENDOR_ID, INFINITTON_PRODUCT_ID | INFINITTON_ALT_PRODUCT_ID) => {
            Some(DeviceFamily::Infinitton)
        }
        (XKEYS_VENDOR_ID, _) if interface_number == XKEYS_INTERFACE => Some(DeviceFamily::XKeys),
        _ => None,
    }
}
