//! Reverse geocoding against a Nominatim-compatible endpoint
//!
//! Lookups are cached in-process by coordinates rounded to four decimals
//! (roughly 11 m), and cache misses go through a one-request-per-second
//! limiter, which is the public Nominatim usage policy. The cache has no
//! expiry; place names do not move.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_async::sync::RwLock;
use core_library::models::Coordinates;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{MetadataError, Result};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Coordinates to a human-readable place name.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve to e.g. `"London, United Kingdom"`.
    ///
    /// An empty string means the upstream knew no city, town, village or
    /// country for the point.
    async fn reverse_geocode(&self, coordinates: &Coordinates) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Address,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
}

pub struct GeocodeResolver {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    user_agent: String,
    referer: String,
    cache: RwLock<HashMap<String, String>>,
    limiter: DirectRateLimiter,
}

impl GeocodeResolver {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            referer: referer.into(),
            cache: RwLock::new(HashMap::new()),
            limiter: RateLimiter::direct(Quota::per_second(NonZeroU32::MIN)),
        }
    }

    /// Number of cached place names.
    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn lookup(&self, lat: f64, lng: f64) -> Result<String> {
        self.limiter.until_ready().await;

        let url = format!(
            "{}/reverse?format=json&lat={:.6}&lon={:.6}&zoom=18&addressdetails=1",
            self.base_url, lat, lng
        );
        let mut request = HttpRequest::new(HttpMethod::Get, url)
            .header("User-Agent", self.user_agent.clone())
            .header("Accept-Language", "en");
        if !self.referer.is_empty() {
            request = request.header("Referer", self.referer.clone());
        }

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(MetadataError::Geocode(format!(
                "reverse lookup returned status {}",
                response.status
            )));
        }

        let body: ReverseResponse = serde_json::from_slice(&response.body)
            .map_err(|e| MetadataError::Parse(e.to_string()))?;
        Ok(place_from_address(&body.address))
    }
}

#[async_trait]
impl Geocoder for GeocodeResolver {
    #[instrument(skip(self), fields(coordinates = %coordinates))]
    async fn reverse_geocode(&self, coordinates: &Coordinates) -> Result<String> {
        let (lat, lng) = coordinates
            .to_degrees()
            .ok_or_else(|| MetadataError::InvalidCoordinates(coordinates.to_string()))?;
        let key = cache_key(lat, lng);

        if let Some(place) = self.cache.read().await.get(&key) {
            debug!(key = %key, "Geocode cache hit");
            return Ok(place.clone());
        }

        let place = self.lookup(lat, lng).await?;
        if place.is_empty() {
            return Ok(place);
        }

        let mut cache = self.cache.write().await;
        let cached = cache.entry(key).or_insert(place);
        Ok(cached.clone())
    }
}

/// Cache key: both parts rounded to four decimals.
pub fn cache_key(lat: f64, lng: f64) -> String {
    format!("{:.4},{:.4}", lat, lng)
}

fn place_from_address(address: &Address) -> String {
    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let locality = non_empty(&address.city)
        .or_else(|| non_empty(&address.town))
        .or_else(|| non_empty(&address.village));

    match (locality, non_empty(&address.country)) {
        (Some(locality), Some(country)) => format!("{}, {}", locality, country),
        (Some(locality), None) => locality,
        (None, Some(country)) => country,
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn resolver(mock: MockHttpClient) -> GeocodeResolver {
        GeocodeResolver::new(
            Arc::new(mock),
            "https://geo.example.com/",
            "media-sync-test/1.0",
            "https://photos.example.com",
        )
    }

    #[test]
    fn test_cache_key_rounding() {
        assert_eq!(cache_key(51.50735, -0.12776), "51.5074,-0.1278");
        assert_eq!(cache_key(51.50739, -0.12776), "51.5074,-0.1278");
    }

    #[test]
    fn test_place_from_address() {
        let address = |city: Option<&str>, town: Option<&str>, village: Option<&str>, country: Option<&str>| Address {
            city: city.map(String::from),
            town: town.map(String::from),
            village: village.map(String::from),
            country: country.map(String::from),
        };

        assert_eq!(
            place_from_address(&address(Some("London"), Some("Ignored"), None, Some("United Kingdom"))),
            "London, United Kingdom"
        );
        assert_eq!(
            place_from_address(&address(None, Some("Hallstatt"), None, Some("Austria"))),
            "Hallstatt, Austria"
        );
        assert_eq!(
            place_from_address(&address(None, None, Some("Giethoorn"), None)),
            "Giethoorn"
        );
        assert_eq!(place_from_address(&address(None, None, None, Some("Iceland"))), "Iceland");
        assert_eq!(place_from_address(&address(Some("  "), None, None, None)), "");
    }

    #[core_async::test]
    async fn test_nearby_points_share_one_lookup() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .withf(|request| {
                request.url.starts_with("https://geo.example.com/reverse?format=json&lat=51.507350")
                    && request.url.contains("zoom=18&addressdetails=1")
                    && request.headers.get("User-Agent").map(String::as_str)
                        == Some("media-sync-test/1.0")
                    && request.headers.get("Accept-Language").map(String::as_str) == Some("en")
                    && request.headers.get("Referer").map(String::as_str)
                        == Some("https://photos.example.com")
            })
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"address": {"city": "London", "country": "United Kingdom"}}"#,
                ))
            });

        let resolver = resolver(mock);
        let first = resolver
            .reverse_geocode(&Coordinates::new("51.50735", "-0.12776"))
            .await
            .unwrap();
        let second = resolver
            .reverse_geocode(&Coordinates::new("51.50739", "-0.12776"))
            .await
            .unwrap();

        assert_eq!(first, "London, United Kingdom");
        assert_eq!(second, first);
        assert_eq!(resolver.cached_len().await, 1);
    }

    #[core_async::test]
    async fn test_invalid_coordinates_skip_upstream() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(0);

        let resolver = resolver(mock);
        let err = resolver
            .reverse_geocode(&Coordinates::new("north", "-0.12776"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidCoordinates(_)));
    }

    #[core_async::test]
    async fn test_non_success_status_is_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(503, "unavailable")));

        let resolver = resolver(mock);
        let err = resolver
            .reverse_geocode(&Coordinates::new("48.8566", "2.3522"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Geocode(_)));
        assert_eq!(resolver.cached_len().await, 0);
    }

    #[core_async::test]
    async fn test_empty_place_is_not_cached() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(200, r#"{"address": {}}"#)));

        let resolver = resolver(mock);
        let place = resolver
            .reverse_geocode(&Coordinates::new("0.5", "-30.0"))
            .await
            .unwrap();
        assert_eq!(place, "");
        assert_eq!(resolver.cached_len().await, 0);
    }
}
