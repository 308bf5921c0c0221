use super::cache::Coordinate;
use super::error::GeocodeError;
use async_trait::async_trait;

#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Looks up a free-text address. `Ok(None)` means the provider answered but found nothing.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError>;
}
