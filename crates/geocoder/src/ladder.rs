use std::sync::atomic::{AtomicU32, Ordering};

use triage_core::{Address, AddressStatus, Coordinates};

use crate::cache::{CachedCoords, GeocodingCache};
use crate::provider::{GeocodeProvider, LatLon};

const ASTANA: (f64, f64) = (51.1694, 71.4491);
const ALMATY: (f64, f64) = (43.2220, 76.8512);

const CAPITAL_COORDS: &[(&str, (f64, f64))] = &[
    ("казахстан", ASTANA),
    ("kazakhstan", ASTANA),
    ("россия", (55.7558, 37.6173)),
    ("russia", (55.7558, 37.6173)),
    ("узбекистан", (41.2995, 69.2401)),
    ("uzbekistan", (41.2995, 69.2401)),
    ("украина", (50.4501, 30.5234)),
    ("ukraine", (50.4501, 30.5234)),
    ("азербайджан", (40.4093, 49.8671)),
    ("azerbaijan", (40.4093, 49.8671)),
    ("кыргызстан", (42.8746, 74.5698)),
    ("kyrgyzstan", (42.8746, 74.5698)),
    ("таджикистан", (38.5598, 68.7738)),
    ("tajikistan", (38.5598, 68.7738)),
    ("туркменистан", (37.9601, 58.3261)),
    ("turkmenistan", (37.9601, 58.3261)),
    ("беларусь", (53.9006, 27.5590)),
    ("belarus", (53.9006, 27.5590)),
    ("молдова", (47.0105, 28.8638)),
    ("moldova", (47.0105, 28.8638)),
    ("грузия", (41.7151, 44.8271)),
    ("georgia", (41.7151, 44.8271)),
    ("армения", (40.1872, 44.5152)),
    ("armenia", (40.1872, 44.5152)),
];

const CIS_COUNTRIES: &[&str] = &[
    "Казахстан", "Россия", "Узбекистан", "Украина", "Кыргызстан", "Таджикистан",
    "Беларусь", "Молдова", "Грузия", "Армения", "Азербайджан", "Туркменистан",
];

const KZ_NAMES: &[&str] = &["казахстан", "kazakhstan", "кз", "kz"];

fn is_kazakhstan(country: &str) -> bool {
    KZ_NAMES.contains(&country.trim().to_lowercase().as_str())
}

/// Scopes the non-KZ even/odd office alternator to a single batch, so
/// concurrent batches never share alternator state (see OQ-2).
#[derive(Default)]
pub struct BatchContext {
    unknown_counter: AtomicU32,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_alternator(&self) -> u32 {
        self.unknown_counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub struct GeocodingResult {
    pub coordinates: Option<Coordinates>,
    pub status: AddressStatus,
    pub provider: String,
    pub explanation: String,
}

/// Resolves an address through the cascading ladder described by the source
/// rules: absent country falls back to CIS city search; Kazakhstan addresses
/// cascade country → city → street → house; any other country alternates
/// between two domestic fallback offices, scoped per batch.
pub async fn geocode_address(
    address: &Address,
    primary: &dyn GeocodeProvider,
    fallback: &dyn GeocodeProvider,
    cache: &GeocodingCache,
    batch: &BatchContext,
) -> GeocodingResult {
    let country = address.country.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let city = address.city.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let street = address.street.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let house = address.house.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let region = address.region.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let Some(country) = country else {
        return match city {
            Some(city) => search_city_in_cis(city, primary, fallback, cache).await,
            None => GeocodingResult {
                coordinates: None,
                status: AddressStatus::Unknown,
                provider: "no_address".to_string(),
                explanation: "no country or city given".to_string(),
            },
        };
    };

    if !is_kazakhstan(country) {
        let n = batch.next_alternator();
        let (coords, city_name) = if n % 2 == 0 { (ASTANA, "Астана") } else { (ALMATY, "Алматы") };
        return GeocodingResult {
            coordinates: Some(Coordinates { latitude: coords.0, longitude: coords.1 }),
            status: AddressStatus::Foreign,
            provider: "international_alternator".to_string(),
            explanation: format!("foreign address ({country}): routed to nearest domestic office {city_name}"),
        };
    }

    let Some(city) = city else {
        let coords = CAPITAL_COORDS
            .iter()
            .find(|(name, _)| *name == country.to_lowercase())
            .map(|(_, c)| *c)
            .unwrap_or(ASTANA);
        return GeocodingResult {
            coordinates: Some(Coordinates { latitude: coords.0, longitude: coords.1 }),
            status: AddressStatus::Partial,
            provider: "capital_fallback".to_string(),
            explanation: "no city given — used capital coordinates".to_string(),
        };
    };

    if street.is_none() {
        return geocode_city_center(country, region, city, primary, fallback, cache, batch, "no street given").await;
    }
    let street = street.unwrap();

    if house.is_none() {
        return geocode_city_center(country, region, city, primary, fallback, cache, batch, "no house number given").await;
    }
    let house = house.unwrap();

    let full_query = build_query(&[Some(country), region, Some(city), Some(street), Some(house)]);
    geocode_full(&full_query, country, region, city, primary, fallback, cache, batch).await
}

fn build_query(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .filter_map(|p| *p)
        .collect::<Vec<_>>()
        .join(", ")
}

async fn try_providers(
    query: &str,
    primary: &dyn GeocodeProvider,
    fallback: &dyn GeocodeProvider,
    cache: &GeocodingCache,
) -> Option<(LatLon, String)> {
    if let Some(cached) = cache.get(query) {
        return Some((LatLon { latitude: cached.latitude, longitude: cached.longitude }, cached.provider));
    }
    if let Some(coords) = primary.geocode(query).await {
        cache.put(query, CachedCoords { latitude: coords.latitude, longitude: coords.longitude, provider: primary.name().to_string() });
        return Some((coords, primary.name().to_string()));
    }
    if let Some(coords) = fallback.geocode(query).await {
        cache.put(query, CachedCoords { latitude: coords.latitude, longitude: coords.longitude, provider: fallback.name().to_string() });
        return Some((coords, fallback.name().to_string()));
    }
    None
}

async fn search_city_in_cis(
    city: &str,
    primary: &dyn GeocodeProvider,
    fallback: &dyn GeocodeProvider,
    cache: &GeocodingCache,
) -> GeocodingResult {
    for cis_country in CIS_COUNTRIES {
        let query = format!("{city}, {cis_country}");
        if let Some((coords, provider)) = try_providers(&query, primary, fallback, cache).await {
            return GeocodingResult {
                coordinates: Some(Coordinates { latitude: coords.latitude, longitude: coords.longitude }),
                status: AddressStatus::Partial,
                provider,
                explanation: format!("no country given — found city {city} in {cis_country}"),
            };
        }
    }
    GeocodingResult {
        coordinates: None,
        status: AddressStatus::Unknown,
        provider: "cis_search_failed".to_string(),
        explanation: format!("city {city} not found in any CIS country"),
    }
}

#[allow(clippy::too_many_arguments)]
async fn geocode_city_center(
    country: &str,
    region: Option<&str>,
    city: &str,
    primary: &dyn GeocodeProvider,
    fallback: &dyn GeocodeProvider,
    cache: &GeocodingCache,
    batch: &BatchContext,
    reason: &str,
) -> GeocodingResult {
    let query = build_query(&[Some(country), region, Some(city)]);
    if let Some((coords, provider)) = try_providers(&query, primary, fallback, cache).await {
        return GeocodingResult {
            coordinates: Some(Coordinates { latitude: coords.latitude, longitude: coords.longitude }),
            status: AddressStatus::Partial,
            provider,
            explanation: format!("{reason} — used center of {city}"),
        };
    }

    let n = batch.next_alternator();
    let (coords, city_name) = if n % 2 == 0 { (ASTANA, "Астана") } else { (ALMATY, "Алматы") };
    GeocodingResult {
        coordinates: Some(Coordinates { latitude: coords.0, longitude: coords.1 }),
        status: AddressStatus::Unknown,
        provider: "city_geocode_failed".to_string(),
        explanation: format!("city {city} not found — assigned office {city_name}"),
    }
}

#[allow(clippy::too_many_arguments)]
async fn geocode_full(
    query: &str,
    country: &str,
    region: Option<&str>,
    city: &str,
    primary: &dyn GeocodeProvider,
    fallback: &dyn GeocodeProvider,
    cache: &GeocodingCache,
    batch: &BatchContext,
) -> GeocodingResult {
    if let Some((coords, provider)) = try_providers(query, primary, fallback, cache).await {
        return GeocodingResult {
            coordinates: Some(Coordinates { latitude: coords.latitude, longitude: coords.longitude }),
            status: AddressStatus::Resolved,
            provider,
            explanation: "full address geocoded".to_string(),
        };
    }

    geocode_city_center(country, region, city, primary, fallback, cache, batch, "full address not found").await
}
