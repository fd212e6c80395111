//! `fleetpulse roster` — validate a roster file without serving.

pub fn run(devices: &str) {
    let registry = super::load_registry(devices);
    let ids = registry.device_ids();

    for id in &ids {
        println!("{id}");
    }
    println!();
    println!("{} devices in {devices}", ids.len());
}
