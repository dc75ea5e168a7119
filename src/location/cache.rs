//! Persistence of the last known location in the local key-value cache.

use crate::{location::UserLocation, traits::LocalCache, Result};

/// Reads the cached location. Missing, corrupt or out-of-range entries yield `None`.
pub fn load(cache: &dyn LocalCache, key: &str) -> Option<UserLocation> {
    let raw = match cache.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Failed to read cached location '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_str::<UserLocation>(&raw) {
        Ok(location) if location.position.is_valid() => Some(location),
        Ok(location) => {
            log::warn!("Ignoring cached location out of range: {:?}", location.position);
            None
        }
        Err(e) => {
            log::warn!("Ignoring corrupt cached location: {}", e);
            None
        }
    }
}

pub fn store(cache: &dyn LocalCache, key: &str, location: &UserLocation) -> Result<()> {
    let json = serde_json::to_string(location)?;
    cache.set(key, &json)
}
