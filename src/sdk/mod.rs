pub mod appointments;
pub mod clock;
pub mod config;
pub mod deliveries;
pub mod geocoding;
pub mod ranking;
pub mod rows;
pub mod timestamp;
pub mod util;
