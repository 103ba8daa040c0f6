use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tracing::debug;

/// Resolved coordinates for a previously-seen query string.
#[derive(Debug, Clone)]
pub struct CachedCoords {
    pub latitude: f64,
    pub longitude: f64,
    pub provider: String,
}

/// Cache of geocoding results keyed by the exact query string sent to a
/// provider. Writes tolerate duplicate inserts — on conflict the newer value
/// overwrites the older one, never an error.
pub struct GeocodingCache {
    entries: Mutex<LruCache<String, CachedCoords>>,
}

impl GeocodingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("capacity must be nonzero"),
            )),
        }
    }

    pub fn get(&self, query: &str) -> Option<CachedCoords> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        let hit = entries.get(query).cloned();
        if hit.is_some() {
            debug!("geocoding cache hit: {query}");
        }
        hit
    }

    pub fn put(&self, query: impl Into<String>, coords: CachedCoords) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.put(query.into(), coords);
    }
}

impl Default for GeocodingCache {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_overwrites_without_error() {
        let cache = GeocodingCache::new(4);
        cache.put("almaty", CachedCoords { latitude: 43.0, longitude: 76.0, provider: "2gis".into() });
        cache.put("almaty", CachedCoords { latitude: 43.1, longitude: 76.1, provider: "nominatim".into() });
        let got = cache.get("almaty").unwrap();
        assert_eq!(got.provider, "nominatim");
    }

    #[test]
    fn miss_returns_none() {
        let cache = GeocodingCache::new(4);
        assert!(cache.get("nowhere").is_none());
    }
}
