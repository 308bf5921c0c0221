use super::types::GeocodeResponse;
use crate::sdk::config::GeocoderConfig;
use crate::sdk::geocoding::cache::Coordinate;
use crate::sdk::geocoding::error::{GeocodeError, OpenCageStatusPayload};
use crate::sdk::geocoding::service::GeocodingProvider;
use crate::sdk::util::rate_limit::Limiter;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const OPENCAGE_BASE_URL: &str = "https://api.opencagedata.com";

pub struct OpenCageProvider {
    client: Client,
    api_key: String,
    base_url: String,
    limiter: Limiter,
}

impl OpenCageProvider {
    pub fn new(api_key: String, limiter: Limiter, timeout: Duration) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: OPENCAGE_BASE_URL.to_string(),
            limiter,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &GeocoderConfig, limiter: Limiter) -> Result<Self, GeocodeError> {
        let api_key = config.api_key.clone().ok_or(GeocodeError::MissingApiKey)?;
        Ok(Self::new(api_key, limiter, config.timeout)?.with_base_url(config.base_url.clone()))
    }
}

#[async_trait]
impl GeocodingProvider for OpenCageProvider {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        log::debug!("Waiting for geocode limiter before calling OpenCage...");
        self.limiter.until_ready().await;

        let url = format!("{}/geocode/v1/json", self.base_url);
        log::debug!("[PROVIDER] Calling OpenCage geocode for address: \"{}\"", address);

        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Quota, bad key and malformed queries all come back in the status envelope
            if let Ok(payload) = serde_json::from_str::<OpenCageStatusPayload>(&text) {
                return Err(GeocodeError::Api {
                    code: payload.status.code,
                    message: payload.status.message,
                });
            }
            log::error!(
                "OpenCage returned non-success status: {}. Unparseable Body: {}",
                status,
                text
            );
            return Err(GeocodeError::RawApi {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: GeocodeResponse = serde_json::from_str(&text).map_err(|e| {
            log::error!(
                "Failed to parse OpenCage response for \"{}\"\nError: {}. Body: {}",
                address,
                e,
                text
            );
            e
        })?;

        Ok(body
            .results
            .first()
            .map(|result| Coordinate::new(result.geometry.lat, result.geometry.lng)))
    }
}
