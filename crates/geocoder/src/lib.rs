pub mod cache;
pub mod error;
pub mod ladder;
pub mod provider;

pub use cache::{CachedCoords, GeocodingCache};
pub use error::GeocoderError;
pub use ladder::{geocode_address, BatchContext, GeocodingResult};
pub use provider::{FallbackProvider, GeocodeProvider, LatLon, PrimaryProvider};
