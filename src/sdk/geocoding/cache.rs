use super::error::StoreError;
use super::service::GeocodingProvider;
use super::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Address-to-coordinate resolution backed by a durable store.
///
/// Lookups are best effort: every failure is logged and surfaces as `None`,
/// and nothing is written unless the provider produced a coordinate, so a
/// failed address is retried on the next call.
#[derive(Clone)]
pub struct GeocodingCache {
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn GeocodingProvider>,
}

impl GeocodingCache {
    pub fn new(store: Arc<dyn KeyValueStore>, provider: Arc<dyn GeocodingProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn resolve(&self, address: &str) -> Option<Coordinate> {
        if address.trim().is_empty() {
            log::debug!("Skipping geocode for empty address");
            return None;
        }

        if let Some(coord) = self.cached(address) {
            log::debug!("[CACHE HIT] {}", address);
            return Some(coord);
        }
        log::debug!("[CACHE MISS] {}", address);

        match self.provider.geocode(address).await {
            Ok(Some(coord)) => {
                self.remember(address, coord);
                Some(coord)
            }
            Ok(None) => {
                log::warn!("No geocode results for address: \"{}\"", address);
                None
            }
            Err(err) => {
                log::error!("Geocoding failed for \"{}\": {}", address, err);
                None
            }
        }
    }

    /// Store-only lookup; never reaches the provider.
    pub fn cached(&self, address: &str) -> Option<Coordinate> {
        let raw = match self.store.get(address) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("Geo cache read failed for \"{}\": {}", address, err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(coord) => Some(coord),
            Err(err) => {
                log::warn!(
                    "Discarding unreadable cache entry for \"{}\": {}. Value: {}",
                    address,
                    err,
                    raw
                );
                None
            }
        }
    }

    /// Drops a single entry so the next `resolve` goes back to the provider.
    pub fn evict(&self, address: &str) -> Result<bool, StoreError> {
        self.store.remove(address)
    }

    fn remember(&self, address: &str, coord: Coordinate) {
        let value = match serde_json::to_string(&coord) {
            Ok(value) => value,
            Err(err) => {
                log::error!("Could not encode coordinate for \"{}\": {}", address, err);
                return;
            }
        };
        if let Err(err) = self.store.set(address, &value) {
            log::error!("Geo cache write failed for \"{}\": {}", address, err);
        }
    }
}
