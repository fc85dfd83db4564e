//! Geocode resolution with a two-tier cache
//!
//! Tier 1 is an in-process address -> coordinate map that lives for the
//! whole process; address cardinality is small relative to process lifetime,
//! so entries are never evicted. Tier 2 is the coordinate columns persisted
//! on the store record itself. Only when both tiers miss does the resolver
//! call the external geocoding service, so a distinct address costs at most
//! one external lookup ever across process restarts. The external service is
//! rate-limited and the listing is rendered repeatedly; redundant lookups
//! are the one thing this module must not produce.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::stores::save_coordinates;
use crate::geo::address::normalize;
use shopmap_common::db::models::StoreRecord;

/// Default geocoding endpoint (Nominatim-compatible search API)
const GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Bound on each lookup request; a timeout is an ordinary lookup failure
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client identifier sent with every lookup. The geocoding service's usage
/// policy requires callers to identify themselves.
const CLIENT_USER_AGENT: &str = concat!("shopmap-sd/", env!("CARGO_PKG_VERSION"));

/// A resolved coordinate pair, both components finite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
}

/// Geocode lookup failure
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Request could not be sent, or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Service answered with a non-success status
    #[error("Service error: {0}")]
    Service(String),

    /// Candidate present but coordinates not parseable as finite numbers
    #[error("Parse error: {0}")]
    Parse(String),
}

/// External geocoding lookup.
///
/// `Ok(None)` means the service answered but had no candidate for the
/// address. The resolver treats that and every `Err` identically: no
/// result, no negative caching, a later call retries.
#[async_trait]
pub trait GeocodeGateway: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<Option<GeocodeResult>, GeocodeError>;
}

/// Nominatim-style geocoding client
///
/// One GET per lookup: URL-encoded free-text query, JSON array of candidates
/// with string `lat`/`lon` fields. Sends a distinguishing User-Agent.
pub struct NominatimClient {
    http_client: Client,
    base_url: String,
}

impl NominatimClient {
    /// Create a client against a custom endpoint (used with self-hosted
    /// Nominatim instances and in tests)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .user_agent(CLIENT_USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }
}

impl Default for NominatimClient {
    fn default() -> Self {
        Self::new(GEOCODER_BASE_URL)
    }
}

/// One candidate from the geocoder. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    lat: String,
    lon: String,
}

#[async_trait]
impl GeocodeGateway for NominatimClient {
    async fn lookup(&self, address: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
        debug!(address = %address, "Querying geocoding service");

        let url = format!("{}/search", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(format!("Geocoder request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Service(format!(
                "Geocoder returned error {}: {}",
                status, body
            )));
        }

        let candidates: Vec<GeocodeCandidate> = response.json().await.map_err(|e| {
            GeocodeError::Parse(format!("Failed to parse geocoder response: {}", e))
        })?;

        let Some(candidate) = candidates.first() else {
            return Ok(None);
        };

        let latitude: f64 = candidate
            .lat
            .parse()
            .map_err(|e| GeocodeError::Parse(format!("Bad latitude {:?}: {}", candidate.lat, e)))?;
        let longitude: f64 = candidate
            .lon
            .parse()
            .map_err(|e| GeocodeError::Parse(format!("Bad longitude {:?}: {}", candidate.lon, e)))?;

        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeocodeError::Parse(format!(
                "Non-finite coordinates: lat={} lon={}",
                candidate.lat, candidate.lon
            )));
        }

        Ok(Some(GeocodeResult {
            latitude,
            longitude,
        }))
    }
}

/// Geocode resolver owning the tier-1 cache and the external gateway.
///
/// The gateway is injected so tests can count and stub external calls.
/// Batch resolution is sequential, so the cache mutex is only contended
/// between concurrent listing requests and is never held across an await.
pub struct GeocodeResolver {
    gateway: Box<dyn GeocodeGateway>,
    cache: Mutex<HashMap<String, GeocodeResult>>,
}

impl GeocodeResolver {
    pub fn new(gateway: Box<dyn GeocodeGateway>) -> Self {
        Self {
            gateway,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve coordinates for one record.
    ///
    /// Returns `None` when the record has no address or the lookup fails.
    /// Failures are logged, never fatal, and never cached - a later call for
    /// the same address attempts the lookup again. The record is simply
    /// excluded from the map layer downstream.
    pub async fn resolve(&self, pool: &SqlitePool, record: &StoreRecord) -> Option<GeocodeResult> {
        let address = normalize(record)?;

        if let Some(cached) = self.cached(&address) {
            debug!(store_id = %record.guid, address = %address, "Geocode cache hit");
            return Some(cached);
        }

        // Coordinates persisted by an earlier process lifetime are
        // authoritative; promote them into the cache so other records
        // sharing this address skip the external lookup too.
        if let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) {
            if latitude.is_finite() && longitude.is_finite() {
                let result = GeocodeResult {
                    latitude,
                    longitude,
                };
                self.insert(&address, result);
                return Some(result);
            }
        }

        let result = match self.gateway.lookup(&address).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                warn!(store_id = %record.guid, address = %address, "Geocoder had no candidate for address");
                return None;
            }
            Err(e) => {
                warn!(store_id = %record.guid, address = %address, "Geocode lookup failed: {}", e);
                return None;
            }
        };

        self.insert(&address, result);

        // Best-effort write-back: the listing must not fail because the
        // record store rejected the coordinate update.
        let resolved_at = Utc::now().to_rfc3339();
        if let Err(e) =
            save_coordinates(pool, record.guid, result.latitude, result.longitude, &resolved_at)
                .await
        {
            warn!(store_id = %record.guid, "Failed to persist coordinates: {}", e);
        }

        Some(result)
    }

    /// Resolve a batch sequentially, attaching coordinates in place.
    ///
    /// One record's resolution (including its write-back) completes before
    /// the next begins; identical addresses within the batch collapse onto
    /// the cache, so each distinct address costs at most one external call.
    pub async fn resolve_batch(&self, pool: &SqlitePool, records: &mut [StoreRecord]) {
        for record in records.iter_mut() {
            if let Some(result) = self.resolve(pool, record).await {
                record.latitude = Some(result.latitude);
                record.longitude = Some(result.longitude);
            }
        }
    }

    fn cached(&self, address: &str) -> Option<GeocodeResult> {
        self.cache
            .lock()
            .expect("geocode cache lock poisoned")
            .get(address)
            .copied()
    }

    fn insert(&self, address: &str, result: GeocodeResult) {
        self.cache
            .lock()
            .expect("geocode cache lock poisoned")
            .insert(address.to_string(), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::stores::{load_all_stores, save_store};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Gateway stub that counts lookups and serves a fixed answer
    struct MockGateway {
        candidate: Option<GeocodeResult>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl MockGateway {
        fn succeeding(latitude: f64, longitude: f64) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    candidate: Some(GeocodeResult {
                        latitude,
                        longitude,
                    }),
                    fail: false,
                    calls: calls.clone(),
                },
                calls,
            )
        }

        fn failing() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    candidate: None,
                    fail: true,
                    calls: calls.clone(),
                },
                calls,
            )
        }

        fn empty() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    candidate: None,
                    fail: false,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl GeocodeGateway for MockGateway {
        async fn lookup(&self, _address: &str) -> Result<Option<GeocodeResult>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(GeocodeError::Service("Geocoder returned error 503".to_string()))
            } else {
                Ok(self.candidate)
            }
        }
    }

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        shopmap_common::db::init::init_schema(&pool)
            .await
            .expect("Failed to init schema");
        pool
    }

    fn store_with_address() -> StoreRecord {
        StoreRecord::new("Corner Books").with_address(
            "Marienplatz 1",
            "Munich",
            "Bavaria",
            "Germany",
        )
    }

    #[tokio::test]
    async fn test_second_resolution_hits_cache() {
        let pool = memory_pool().await;
        let (gateway, calls) = MockGateway::succeeding(48.137, 11.576);
        let resolver = GeocodeResolver::new(Box::new(gateway));
        let store = store_with_address();

        let first = resolver.resolve(&pool, &store).await;
        let second = resolver.resolve(&pool, &store).await;

        assert_eq!(first, second);
        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "Second resolution must be served from the cache"
        );
    }

    #[tokio::test]
    async fn test_shared_address_resolved_once() {
        let pool = memory_pool().await;
        let (gateway, calls) = MockGateway::succeeding(48.137, 11.576);
        let resolver = GeocodeResolver::new(Box::new(gateway));

        // Two different records at the same address
        let mut records = vec![store_with_address(), store_with_address()];
        resolver.resolve_batch(&pool, &mut records).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(records.iter().all(|r| r.has_coordinates()));
    }

    #[tokio::test]
    async fn test_persisted_coordinates_skip_lookup() {
        let pool = memory_pool().await;
        let (gateway, calls) = MockGateway::succeeding(0.0, 0.0);
        let resolver = GeocodeResolver::new(Box::new(gateway));

        let store = store_with_address().with_coordinates(48.137, 11.576);
        let result = resolver.resolve(&pool, &store).await;

        assert_eq!(
            result,
            Some(GeocodeResult {
                latitude: 48.137,
                longitude: 11.576
            })
        );
        assert_eq!(
            calls.load(Ordering::SeqCst),
            0,
            "Persisted coordinates are authoritative"
        );
    }

    #[tokio::test]
    async fn test_persisted_coordinates_promote_to_cache() {
        let pool = memory_pool().await;
        let (gateway, calls) = MockGateway::succeeding(0.0, 0.0);
        let resolver = GeocodeResolver::new(Box::new(gateway));

        let resolved = store_with_address().with_coordinates(48.137, 11.576);
        let unresolved = store_with_address();

        resolver.resolve(&pool, &resolved).await;
        let result = resolver.resolve(&pool, &unresolved).await;

        assert_eq!(
            result,
            Some(GeocodeResult {
                latitude: 48.137,
                longitude: 11.576
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_address_no_lookup() {
        let pool = memory_pool().await;
        let (gateway, calls) = MockGateway::succeeding(48.137, 11.576);
        let resolver = GeocodeResolver::new(Box::new(gateway));

        let store = StoreRecord::new("Nomad Pop-Up");
        assert_eq!(resolver.resolve(&pool, &store).await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_cached() {
        let pool = memory_pool().await;
        let (gateway, calls) = MockGateway::failing();
        let resolver = GeocodeResolver::new(Box::new(gateway));
        let store = store_with_address();

        assert_eq!(resolver.resolve(&pool, &store).await, None);
        assert_eq!(resolver.resolve(&pool, &store).await, None);

        assert_eq!(
            calls.load(Ordering::SeqCst),
            2,
            "Failures must not be negatively cached"
        );
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_not_cached() {
        let pool = memory_pool().await;
        let (gateway, calls) = MockGateway::empty();
        let resolver = GeocodeResolver::new(Box::new(gateway));
        let store = store_with_address();

        assert_eq!(resolver.resolve(&pool, &store).await, None);
        assert_eq!(resolver.resolve(&pool, &store).await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_successful_resolution_persists_coordinates() {
        let pool = memory_pool().await;
        let (gateway, _calls) = MockGateway::succeeding(48.137, 11.576);
        let resolver = GeocodeResolver::new(Box::new(gateway));

        let store = store_with_address();
        save_store(&pool, &store).await.expect("Failed to save store");

        resolver.resolve(&pool, &store).await;

        let stores = load_all_stores(&pool).await.expect("Failed to load stores");
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].latitude, Some(48.137));
        assert_eq!(stores[0].longitude, Some(11.576));
        assert!(
            stores[0].resolved_at.is_some(),
            "Write-back must tag the resolution time"
        );
    }

    #[tokio::test]
    async fn test_write_back_failure_still_returns_result() {
        // Pool with no schema: the write-back UPDATE fails but resolution
        // must still return the looked-up coordinates
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let (gateway, calls) = MockGateway::succeeding(48.137, 11.576);
        let resolver = GeocodeResolver::new(Box::new(gateway));
        let store = store_with_address();

        let result = resolver.resolve(&pool, &store).await;
        assert!(result.is_some(), "Persistence failure is non-fatal");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
