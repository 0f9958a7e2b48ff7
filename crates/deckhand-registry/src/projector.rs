//! Projection of the registry into the externally visible device list.

use crate::names::NameStore;
use crate::registry::Registry;
use deckhand_core::DeviceSummary;
use deckhand_hardware::traits::SurfaceDriver;
use std::cmp::Ordering;

/// Build the sorted device list.
///
/// The emulator always comes first. Everything else is ordered by family
/// label, then serial number, then id. Projecting the same registry twice
/// yields the same list.
pub fn project(registry: &Registry, names: &NameStore) -> Vec<DeviceSummary> {
    let mut summaries: Vec<DeviceSummary> = registry
        .iter()
        .map(|entry| {
            let info = entry.info();
            DeviceSummary {
                id: info.id.clone(),
                serial_number: info.serial_number.clone(),
                device_type: info.family.label().to_string(),
                name: names.get(&info.serial_number).to_string(),
                config: entry.driver().config().clone(),
            }
        })
        .collect();

    summaries.sort_by(compare);
    summaries
}

fn compare(a: &DeviceSummary, b: &DeviceSummary) -> Ordering {
    let a_emulator = a.id == deckhand_core::constants::EMULATOR_ID;
    let b_emulator = b.id == deckhand_core::constants::EMULATOR_ID;

    b_emulator
        .cmp(&a_emulator)
        .then_with(|| a.device_type.cmp(&b.device_type))
        .then_with(|| a.serial_number.cmp(&b.serial_number))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerFactory, LoggingHandlerFactory};
    use crate::registry::RegistryEntry;
    use deckhand_core::{BusDescriptor, DeviceFamily, DriverInfo};
    use deckhand_hardware::devices::AnySurfaceDriver;
    use deckhand_hardware::mock::MockSurface;
    use deckhand_hardware::synthetic::SyntheticSurface;
    use rstest::rstest;

    fn register(registry: &mut Registry, family: DeviceFamily, path: &str, serial: &str) {
        let info = DriverInfo::new(family, path, Some(serial));
        let handler = LoggingHandlerFactory.attach(&info);
        let (surface, _) = MockSurface::new(info);
        registry.insert(RegistryEntry::new(AnySurfaceDriver::Mock(surface), handler));
    }

    fn register_emulator(registry: &mut Registry) {
        let surface =
            SyntheticSurface::new(DeviceFamily::Emulator, &BusDescriptor::synthetic("emulator"));
        let handler = LoggingHandlerFactory.attach(surface.info());
        registry.insert(RegistryEntry::new(AnySurfaceDriver::Synthetic(surface), handler));
    }

    #[test]
    fn test_emulator_first_then_serial_order() {
        let mut registry = Registry::new();
        register(&mut registry, DeviceFamily::StreamDeck, "/dev/hidraw0", "B");
        register(&mut registry, DeviceFamily::StreamDeck, "/dev/hidraw1", "A");
        register_emulator(&mut registry);

        let list = project(&registry, &NameStore::new());
        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["emulator", "elgato:A", "elgato:B"]);
    }

    #[rstest]
    #[case(&["B", "A", "C"])]
    #[case(&["C", "B", "A"])]
    #[case(&["A", "C", "B"])]
    fn test_order_independent_of_insertion(#[case] serials: &[&str]) {
        let mut registry = Registry::new();
        for (i, serial) in serials.iter().enumerate() {
            register(&mut registry, DeviceFamily::StreamDeckXl, &format!("/dev/hidraw{i}"), serial);
        }

        let list = project(&registry, &NameStore::new());
        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["elgato-xl:A", "elgato-xl:B", "elgato-xl:C"]);
    }

    #[test]
    fn test_family_label_orders_before_serial() {
        let mut registry = Registry::new();
        register(&mut registry, DeviceFamily::XKeys, "/dev/hidraw0", "A");
        register(&mut registry, DeviceFamily::Infinitton, "/dev/hidraw1", "Z");

        let list = project(&registry, &NameStore::new());
        let types: Vec<&str> = list.iter().map(|s| s.device_type.as_str()).collect();

        assert_eq!(types, vec!["infinitton", "xkeys"]);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let mut registry = Registry::new();
        for (i, serial) in ["Q", "C", "M", "C2"].iter().enumerate() {
            register(&mut registry, DeviceFamily::StreamDeckMini, &format!("/dev/hidraw{i}"), serial);
        }
        register_emulator(&mut registry);

        let mut names = NameStore::new();
        names.set("M", "Middle");

        assert_eq!(project(&registry, &names), project(&registry, &names));
    }

    #[test]
    fn test_names_and_config_are_projected() {
        let mut registry = Registry::new();
        register(&mut registry, DeviceFamily::StreamDeckV2, "/dev/hidraw5", "AL12");

        let mut names = NameStore::new();
        names.set("AL12", "Left deck");

        let list = project(&registry, &names);
        assert_eq!(list[0].name, "Left deck");
        assert_eq!(list[0].device_type, "elgato-v2");
        assert_eq!(list[0].serial_number, "AL12");
        assert!(list[0].config.is_empty());
    }

    #[test]
    fn test_empty_registry() {
        assert!(project(&Registry::new(), &NameStore::new()).is_empty());
    }
}
