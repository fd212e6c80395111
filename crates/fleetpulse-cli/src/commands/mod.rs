pub mod roster;
pub mod serve;

use fleetpulse_core::{Registry, RosterError, load_roster};

/// Build a registry from the roster at `path`.
pub fn try_load_registry(path: &str) -> Result<Registry, RosterError> {
    let registry = Registry::new();
    load_roster(path, &registry)?;
    Ok(registry)
}

/// Build a registry from the roster at `path`, exiting on failure.
pub fn load_registry(path: &str) -> Registry {
    match try_load_registry(path) {
        Ok(registry) => {
            if registry.is_empty() {
                log::warn!("roster {path} lists no devices; every request will return 404");
            }
            registry
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
