#![allow(dead_code)]

use async_trait::async_trait;
use epod_dropoff::sdk::geocoding::{Coordinate, GeocodeError, GeocodingProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const MAKATI_WAREHOUSE: Coordinate = Coordinate { lat: 14.5547, lng: 121.0244 };
pub const MANILA_CITY_HALL: Coordinate = Coordinate { lat: 14.5958, lng: 120.9772 };
pub const QUEZON_CITY_HALL: Coordinate = Coordinate { lat: 14.6760, lng: 121.0437 };
pub const TAGUIG: Coordinate = Coordinate { lat: 14.5176, lng: 121.0509 };

pub enum Answer {
    Found(Coordinate),
    NoResults,
    Fails,
}

/// Scripted provider that counts how often each address reaches it and how
/// many lookups were ever in flight together.
#[derive(Default)]
pub struct FakeProvider {
    answers: HashMap<String, Answer>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    per_address: parking_lot::Mutex<HashMap<String, usize>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn found(mut self, address: &str, coord: Coordinate) -> Self {
        self.answers.insert(address.to_string(), Answer::Found(coord));
        self
    }

    pub fn no_results(mut self, address: &str) -> Self {
        self.answers.insert(address.to_string(), Answer::NoResults);
        self
    }

    pub fn fails(mut self, address: &str) -> Self {
        self.answers.insert(address.to_string(), Answer::Fails);
        self
    }

    /// Every lookup sleeps this long before answering.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, address: &str) -> usize {
        self.per_address.lock().get(address).copied().unwrap_or(0)
    }
}

#[async_trait]
impl GeocodingProvider for FakeProvider {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.per_address.lock().entry(address.to_string()).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.answers.get(address) {
            Some(Answer::Found(coord)) => Ok(Some(*coord)),
            Some(Answer::Fails) => Err(GeocodeError::RawApi {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
            Some(Answer::NoResults) | None => Ok(None),
        }
    }
}
