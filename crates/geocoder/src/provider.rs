use async_trait::async_trait;

#[derive(Debug, Clone, Copy)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single geocoding backend. The ladder tries providers in order and never
/// retries a single provider — the ladder itself is the retry.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    async fn geocode(&self, query: &str) -> Option<LatLon>;
    fn name(&self) -> &'static str;
}

/// Commercial provider (2GIS-shaped): `GET {url}?q=..&fields=items.point&key=..`,
/// response path `result.items[0].point.{lat,lon}`.
pub struct PrimaryProvider {
    client: reqwest::Client,
    url: String,
    key: String,
}

impl PrimaryProvider {
    pub fn new(url: String, key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            url,
            key,
        }
    }
}

#[async_trait]
impl GeocodeProvider for PrimaryProvider {
    async fn geocode(&self, query: &str) -> Option<LatLon> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("fields", "items.point"), ("key", &self.key)])
            .send()
            .await
            .ok()?
            .json::<serde_json::Value>()
            .await
            .ok()?;

        let point = resp["result"]["items"][0]["point"].as_object()?;
        let lat = point.get("lat")?.as_f64()?;
        let lon = point.get("lon")?.as_f64()?;
        Some(LatLon { latitude: lat, longitude: lon })
    }

    fn name(&self) -> &'static str {
        "primary"
    }
}

/// Free OSM-based fallback (Nominatim-shaped): `GET {url}?q=..&format=json&limit=1`,
/// response is an array whose first element has string `lat`/`lon`.
pub struct FallbackProvider {
    client: reqwest::Client,
    url: String,
}

impl FallbackProvider {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent("triage-geocoder/1.0")
                .build()
                .unwrap_or_default(),
            url,
        }
    }
}

#[async_trait]
impl GeocodeProvider for FallbackProvider {
    async fn geocode(&self, query: &str) -> Option<LatLon> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .ok()?
            .json::<serde_json::Value>()
            .await
            .ok()?;

        let first = resp.as_array()?.first()?;
        let lat: f64 = first.get("lat")?.as_str()?.parse().ok()?;
        let lon: f64 = first.get("lon")?.as_str()?.parse().ok()?;
        Some(LatLon { latitude: lat, longitude: lon })
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
