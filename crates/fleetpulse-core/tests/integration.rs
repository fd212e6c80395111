//! Integration tests for fleetpulse-core.
//!
//! These tests exercise the full path a server takes:
//! roster file → registry → concurrent event recording → derived metrics.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use fleetpulse_core::{Registry, RegistryError, RosterError, format_duration, load_roster};
use rand::seq::SliceRandom;

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_040, 0).unwrap()
}

fn roster_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn roster_bootstraps_registry() {
    let file = roster_file("device_id\n60-6b-44-84-dc-64\nb4-45-52-a2-f1-3c\n26-9a-66-01-33-83\n");
    let registry = Registry::new();

    let rows = load_roster(file.path(), &registry).unwrap();
    assert_eq!(rows, 3);
    assert_eq!(registry.len(), 3);

    for id in registry.device_ids() {
        let report = registry.report(&id).unwrap();
        assert_eq!(report.uptime, 0.0);
        assert_eq!(format_duration(report.avg_upload_time), "0s");
    }
}

#[test]
fn missing_roster_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new();
    let err = load_roster(dir.path().join("devices.csv"), &registry).unwrap_err();
    assert!(matches!(err, RosterError::Open { .. }));
    assert!(err.to_string().contains("devices.csv"));
}

#[test]
fn empty_roster_file_is_rejected() {
    let file = roster_file("");
    let registry = Registry::new();
    let err = load_roster(file.path(), &registry).unwrap_err();
    assert!(matches!(err, RosterError::Empty));
}

#[test]
fn unknown_device_reports_not_found() {
    let registry = Registry::from_iter(["known"]);
    let err = registry.record_heartbeat("unknown", t0()).unwrap_err();
    assert_eq!(err.to_string(), "Device not found: unknown");
    assert!(matches!(err, RegistryError::DeviceNotFound { .. }));
}

#[test]
fn concurrent_heartbeats_keep_every_minute() {
    const DISTINCT_MINUTES: i64 = 240;
    const CALLERS: usize = 8;

    let registry = Arc::new(Registry::from_iter(["dev"]));

    // Every caller sends every minute twice, in its own random order.
    std::thread::scope(|s| {
        for _ in 0..CALLERS {
            let registry = Arc::clone(&registry);
            s.spawn(move || {
                let mut offsets: Vec<i64> = (0..DISTINCT_MINUTES).chain(0..DISTINCT_MINUTES).collect();
                offsets.shuffle(&mut rand::rng());
                for minute in offsets {
                    registry
                        .record_heartbeat("dev", t0() + TimeDelta::minutes(minute))
                        .unwrap();
                }
            });
        }
    });

    let stats = registry.lookup("dev").unwrap();
    assert_eq!(stats.heartbeat_minute_count(), DISTINCT_MINUTES as usize);
    assert_eq!(
        stats.last_heartbeat(),
        Some(t0() + TimeDelta::minutes(DISTINCT_MINUTES - 1))
    );
    assert!(stats.first_heartbeat().is_some());
}

#[test]
fn devices_are_independent() {
    let registry = Arc::new(Registry::from_iter(["a", "b"]));

    std::thread::scope(|s| {
        let r = Arc::clone(&registry);
        s.spawn(move || {
            for minute in 0..10 {
                r.record_heartbeat("a", t0() + TimeDelta::minutes(minute))
                    .unwrap();
            }
        });
        let r = Arc::clone(&registry);
        s.spawn(move || {
            for _ in 0..100 {
                r.record_upload("b", Duration::from_millis(250)).unwrap();
            }
        });
    });

    let a = registry.report("a").unwrap();
    let b = registry.report("b").unwrap();
    assert_eq!(a.uptime, 100.0);
    assert_eq!(a.avg_upload_time, Duration::ZERO);
    assert_eq!(b.uptime, 0.0);
    assert_eq!(format_duration(b.avg_upload_time), "250ms");
}

#[test]
fn readers_and_writers_interleave() {
    let registry = Arc::new(Registry::from_iter(["dev"]));

    std::thread::scope(|s| {
        for _ in 0..4 {
            let r = Arc::clone(&registry);
            s.spawn(move || {
                for _ in 0..500 {
                    r.record_upload("dev", Duration::from_secs(2)).unwrap();
                }
            });
        }
        for _ in 0..4 {
            let r = Arc::clone(&registry);
            s.spawn(move || {
                for _ in 0..500 {
                    let report = r.report("dev").unwrap();
                    // Every sample is 2s, so any consistent snapshot averages to 0s or 2s.
                    assert!(
                        report.avg_upload_time == Duration::ZERO
                            || report.avg_upload_time == Duration::from_secs(2)
                    );
                }
            });
        }
    });

    let stats = registry.lookup("dev").unwrap();
    assert_eq!(stats.upload_count(), 2000);
    assert_eq!(stats.upload_sum_nanos(), 4_000_000_000_000);
}

#[test]
fn registration_during_traffic() {
    let registry = Arc::new(Registry::from_iter(["base"]));

    std::thread::scope(|s| {
        let r = Arc::clone(&registry);
        s.spawn(move || {
            for i in 0..200 {
                r.register_device(&format!("late-{i}"));
            }
        });
        let r = Arc::clone(&registry);
        s.spawn(move || {
            for i in 0..200 {
                r.record_heartbeat("base", t0() + TimeDelta::seconds(i))
                    .unwrap();
            }
        });
    });

    assert_eq!(registry.len(), 201);
    assert_eq!(registry.lookup("base").unwrap().heartbeat_minute_count(), 4);
}
