//! # fleetpulse-core
//!
//! In-memory device statistics for a fixed fleet: heartbeats become uptime,
//! upload reports become an average upload time.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use chrono::{DateTime, TimeDelta};
//! use fleetpulse_core::{Registry, format_duration};
//!
//! let registry = Registry::from_iter(["60-6b-44-84-dc-64"]);
//!
//! let t0 = DateTime::from_timestamp(1_700_000_040, 0).unwrap();
//! for minute in 0..4 {
//!     registry
//!         .record_heartbeat("60-6b-44-84-dc-64", t0 + TimeDelta::minutes(minute))
//!         .unwrap();
//! }
//! registry
//!     .record_upload("60-6b-44-84-dc-64", Duration::from_secs(2))
//!     .unwrap();
//!
//! let report = registry.report("60-6b-44-84-dc-64").unwrap();
//! assert_eq!(report.uptime, 100.0);
//! assert_eq!(format_duration(report.avg_upload_time), "2s");
//! ```
//!
//! ## Architecture
//!
//! [`Registry`] → [`DeviceStats`] → [`StatsReport`]
//!
//! The registry lock guards only the ID → stats map. Each [`DeviceStats`]
//! has its own lock, so devices never contend with each other. Handles are
//! `Arc`s that stay valid for the life of the registry; devices are never
//! removed.
//!
//! Uptime is the number of minute buckets with at least one heartbeat over
//! the elapsed time from the first to the last heartbeat, in fractional
//! minutes plus one.

pub mod duration;
pub mod error;
pub mod registry;
pub mod roster;
pub mod stats;

pub use duration::format_duration;
pub use error::{RegistryError, RegistryResult, RosterError};
pub use registry::Registry;
pub use roster::{load_roster, parse_roster};
pub use stats::{DeviceStats, StatsReport, minute_bucket};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
