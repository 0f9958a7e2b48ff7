//! Discovery pipeline tests: enumerate, classify, construct.
//!
//! Run with: cargo test --package deckhand-hardware --test discovery

use deckhand_core::{BusDescriptor, DeviceFamily};
use deckhand_hardware::mock::{MockHidBus, MockProcessLister};
use deckhand_hardware::traits::SurfaceDriver;
use deckhand_hardware::{
    ClassifyOptions, ConflictGuard, GuardConfig, HardwareError, HidAccess, SurfaceFactory,
    classify_with,
};
use std::sync::Arc;

fn bus_with_mixed_devices() -> MockHidBus {
    let bus = MockHidBus::new();
    bus.plug(BusDescriptor::new("/dev/hidraw0", 0x0fd9, 0x0063, 0).with_serial_number("MINI1"));
    bus.plug(BusDescriptor::new("/dev/hidraw1", 0xffff, 0x1f41, 0).with_serial_number("INF2"));
    bus.plug(BusDescriptor::new("/dev/hidraw2", 1523, 0x0405, 0).with_serial_number("XK24"));
    bus.plug(BusDescriptor::new("/dev/hidraw3", 1523, 0x0405, 2).with_serial_number("XK24"));
    bus.plug(BusDescriptor::new("/dev/hidraw4", 0x046d, 0xc077, 0));
    bus
}

async fn discover(bus: &MockHidBus, options: ClassifyOptions) -> Vec<(String, Result<String, HardwareError>)> {
    let factory = SurfaceFactory::new(Arc::new(bus.clone()));
    let mut results = Vec::new();

    for descriptor in bus.enumerate().unwrap() {
        let Some(family) = classify_with(&descriptor, options) else {
            continue;
        };
        let created = factory
            .create(&descriptor, family)
            .await
            .map(|driver| driver.info().id.clone());
        results.push((descriptor.path, created));
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

#[tokio::test]
async fn test_recognised_devices_are_constructed() {
    let bus = bus_with_mixed_devices();

    let results = discover(&bus, ClassifyOptions::default()).await;
    let ids: Vec<&str> = results
        .iter()
        .map(|(_, created)| created.as_deref().unwrap())
        .collect();

    assert_eq!(ids, vec!["elgato-mini:MINI1", "infinitton:INF2", "xkeys:XK24"]);
    assert_eq!(bus.open_count("/dev/hidraw3"), 0);
    assert_eq!(bus.open_count("/dev/hidraw4"), 0);
}

#[tokio::test]
async fn test_suppression_skips_only_protected_families() {
    let bus = bus_with_mixed_devices();
    let lister = Arc::new(MockProcessLister::new());
    lister.set_running(["Stream Deck.exe"]);
    let guard = ConflictGuard::new(GuardConfig::default().enabled(true), lister);

    let suppression = guard.check().await;
    assert!(suppression.is_active());

    let results = discover(&bus, ClassifyOptions::suppress_protected(suppression.is_active())).await;
    let paths: Vec<&str> = results.iter().map(|(path, _)| path.as_str()).collect();

    assert_eq!(paths, vec!["/dev/hidraw1", "/dev/hidraw2"]);
}

#[tokio::test]
async fn test_busy_device_does_not_stop_the_rest() {
    let bus = bus_with_mixed_devices();
    bus.set_busy("/dev/hidraw1", true);

    let results = discover(&bus, ClassifyOptions::default()).await;

    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(HardwareError::DeviceBusy { .. })));
    assert!(results[2].1.is_ok());
}

#[tokio::test]
async fn test_classification_of_families() {
    let bus = bus_with_mixed_devices();
    let families: Vec<DeviceFamily> = bus
        .enumerate()
        .unwrap()
        .iter()
        .filter_map(|d| classify_with(d, ClassifyOptions::default()))
        .collect();

    assert!(families.contains(&DeviceFamily::StreamDeckMini));
    assert!(families.contains(&DeviceFamily::Infinitton));
    assert_eq!(families.iter().filter(|f| **f == DeviceFamily::XKeys).count(), 1);
}
