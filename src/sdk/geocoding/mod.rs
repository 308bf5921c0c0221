pub mod cache;
pub mod error;
pub mod provider;
pub mod service;
pub mod store;

pub use cache::{Coordinate, GeocodingCache};
pub use error::{GeocodeError, StoreError};
pub use provider::{CacheOnlyProvider, OpenCageProvider};
pub use service::GeocodingProvider;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
