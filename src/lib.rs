pub mod sdk;

pub use sdk::appointments::{check_appointment, has_conflict, todays_board, AppointmentRecord};
pub use sdk::clock::{Clock, FixedClock, SystemClock};
pub use sdk::config::AppConfig;
pub use sdk::deliveries::{DeliveryRecord, PreDeliveryRecord};
pub use sdk::geocoding::{Coordinate, GeocodingCache, JsonFileStore, MemoryStore};
pub use sdk::ranking::{haversine_km, DropOffRanker, RankedDelivery};
