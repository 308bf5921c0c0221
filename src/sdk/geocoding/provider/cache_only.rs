use crate::sdk::geocoding::cache::Coordinate;
use crate::sdk::geocoding::error::GeocodeError;
use crate::sdk::geocoding::service::GeocodingProvider;
use async_trait::async_trait;

/// Used when no API key is configured: cached addresses still resolve, misses fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheOnlyProvider;

#[async_trait]
impl GeocodingProvider for CacheOnlyProvider {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        log::debug!("[Cache-only Provider] refusing network lookup for \"{}\"", address);
        Err(GeocodeError::MissingApiKey)
    }
}
