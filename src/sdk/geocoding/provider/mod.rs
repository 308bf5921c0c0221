pub mod cache_only;
pub mod opencage;
pub mod types;

pub use cache_only::CacheOnlyProvider;
pub use opencage::OpenCageProvider;
