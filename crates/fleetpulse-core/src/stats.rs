//! Per-device heartbeat and upload aggregates.
//!
//! Each [`DeviceStats`] carries its own reader-writer lock. Recording takes
//! the write side; the derived metrics take the read side and are computed
//! from a single snapshot of the fields, so a query never observes a
//! half-applied event.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

const SECS_PER_MINUTE: i64 = 60;
const NANOS_PER_MINUTE: f64 = 60_000_000_000.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Minute bucket a timestamp falls into: `floor(unix_seconds / 60)`.
pub fn minute_bucket(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp().div_euclid(SECS_PER_MINUTE)
}

fn elapsed_minutes(delta: TimeDelta) -> f64 {
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / NANOS_PER_MINUTE,
        // Out of i64 nanosecond range (~292 years).
        None => delta.num_milliseconds() as f64 / MILLIS_PER_MINUTE,
    }
}

/// Derived metrics for one device, read from one consistent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsReport {
    /// Percentage of observed minutes that saw at least one heartbeat.
    pub uptime: f64,
    /// Mean upload duration, truncated to whole nanoseconds.
    #[serde(serialize_with = "crate::duration::serialize")]
    pub avg_upload_time: Duration,
}

#[derive(Debug, Default)]
struct StatsState {
    heartbeat_minutes: HashSet<i64>,
    first_heartbeat: Option<DateTime<Utc>>,
    last_heartbeat: Option<DateTime<Utc>>,
    upload_count: u64,
    upload_sum_nanos: u128,
}

impl StatsState {
    fn uptime_percent(&self) -> f64 {
        let (Some(first), Some(last)) = (self.first_heartbeat, self.last_heartbeat) else {
            return 0.0;
        };

        // Fractional, not rounded to buckets. The +1 counts the first minute.
        let elapsed_minutes = elapsed_minutes(last.signed_duration_since(first));
        let total_minutes = if elapsed_minutes <= 0.0 {
            1.0
        } else {
            elapsed_minutes + 1.0
        };
        if !total_minutes.is_finite() || total_minutes <= 0.0 {
            return 0.0;
        }

        self.heartbeat_minutes.len() as f64 / total_minutes * 100.0
    }

    fn average_upload(&self) -> Duration {
        if self.upload_count == 0 {
            return Duration::ZERO;
        }
        let avg = self.upload_sum_nanos / u128::from(self.upload_count);
        Duration::from_nanos(u64::try_from(avg).unwrap_or(u64::MAX))
    }
}

/// Aggregate telemetry state for a single device.
///
/// Instances are created zeroed by the [`Registry`](crate::Registry) and
/// live for the rest of the process.
#[derive(Debug, Default)]
pub struct DeviceStats {
    state: RwLock<StatsState>,
}

impl DeviceStats {
    /// Create an empty record: no heartbeats, no uploads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heartbeat sent at `sent_at`.
    ///
    /// The first call fixes `first_heartbeat`. `last_heartbeat` only moves
    /// forward, so a late-arriving older heartbeat still adds its minute
    /// bucket but never rewinds the window end.
    pub fn record_heartbeat(&self, sent_at: DateTime<Utc>) {
        let mut state = self.write();
        if state.first_heartbeat.is_none() {
            state.first_heartbeat = Some(sent_at);
        }
        if state.last_heartbeat.is_none_or(|last| sent_at > last) {
            state.last_heartbeat = Some(sent_at);
        }
        state.heartbeat_minutes.insert(minute_bucket(&sent_at));
    }

    /// Record one completed upload that took `duration`.
    pub fn record_upload(&self, duration: Duration) {
        let mut state = self.write();
        state.upload_count = state.upload_count.saturating_add(1);
        state.upload_sum_nanos = state.upload_sum_nanos.saturating_add(duration.as_nanos());
    }

    /// Uptime over the observed window, in percent. Zero before the first
    /// heartbeat.
    pub fn uptime_percent(&self) -> f64 {
        self.read().uptime_percent()
    }

    /// Mean upload duration, or zero if nothing was uploaded yet.
    pub fn average_upload_duration(&self) -> Duration {
        self.read().average_upload()
    }

    /// Both derived metrics under one read lock.
    pub fn report(&self) -> StatsReport {
        let state = self.read();
        StatsReport {
            uptime: state.uptime_percent(),
            avg_upload_time: state.average_upload(),
        }
    }

    pub fn first_heartbeat(&self) -> Option<DateTime<Utc>> {
        self.read().first_heartbeat
    }

    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        self.read().last_heartbeat
    }

    /// Number of distinct minute buckets that saw a heartbeat.
    pub fn heartbeat_minute_count(&self) -> usize {
        self.read().heartbeat_minutes.len()
    }

    /// Observed minute buckets in ascending order.
    pub fn heartbeat_minutes(&self) -> Vec<i64> {
        let mut minutes: Vec<i64> = self.read().heartbeat_minutes.iter().copied().collect();
        minutes.sort_unstable();
        minutes
    }

    pub fn upload_count(&self) -> u64 {
        self.read().upload_count
    }

    /// Sum of all recorded upload durations, in nanoseconds.
    pub fn upload_sum_nanos(&self) -> u128 {
        self.read().upload_sum_nanos
    }

    // Every critical section leaves the state consistent, so a guard
    // poisoned by a panicking holder is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, StatsState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StatsState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold this device's write lock until the returned guard is dropped.
    #[cfg(test)]
    pub(crate) fn lock_exclusive(&self) -> impl Sized + '_ {
        self.write()
    }
}
