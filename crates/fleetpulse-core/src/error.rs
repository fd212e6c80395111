//! Error types for registry lookups and roster loading.

use std::path::PathBuf;

/// Errors raised by [`Registry`](crate::Registry) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },
}

impl RegistryError {
    pub(crate) fn not_found(device_id: &str) -> Self {
        Self::DeviceNotFound {
            device_id: device_id.to_string(),
        }
    }
}

/// Errors raised while loading the device roster at startup.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to open roster {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read roster: {0}")]
    Read(#[from] std::io::Error),

    #[error("roster is empty")]
    Empty,

    #[error("roster header is empty")]
    EmptyHeader,
}

pub type RegistryResult<T> = Result<T, RegistryError>;
