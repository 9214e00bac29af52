//! The composed lookup facade used by the server and the CLI.

use std::sync::Arc;
use std::time::Duration;

use bcprop_arcgis::{ArcgisError, OpenDataClient, SpatialQueryClient, DEFAULT_SEARCH_URL};
use bcprop_core::{AppConfig, Coordinate, Snapshot, ZoningOutcome};
use bcprop_geocode::{GeocodeCache, GeocodeResult, NominatimClient, RateLimiter};
use reqwest::Client;

use crate::aggregator::{enrichment_deadline, SnapshotAggregator};
use crate::cache::{address_key, coordinate_key, MemoryCache, SnapshotCache};
use crate::error::LookupError;
use crate::ocp::{OcpCity, OcpEndpoints, OcpLookup, OcpResult};
use crate::providers::{ProviderAdapters, ProviderEndpoints};
use crate::sources::ZoningSourceTable;
use crate::zoning::vancouver::VancouverCatalogue;
use crate::zoning::ZoningEngine;

const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(2);
const GEOCODER_BACKOFF_BASE_MS: u64 = 1_000;

/// Everything needed to wire a [`LookupService`]. Endpoint fields default
/// to the production services; tests repoint them at a mock server.
#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub budget: Duration,
    pub cache_ttl: Duration,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub provider_endpoints: ProviderEndpoints,
    pub zoning_sources: Arc<ZoningSourceTable>,
    pub opendata_search_url: String,
    pub ocp_endpoints: OcpEndpoints,
    pub geocoder_url: String,
    pub geocoder_limiter: Arc<RateLimiter>,
    pub geocoder_max_retries: u32,
    pub geocoder_backoff_base_ms: u64,
    pub enrichment_timeout: Duration,
}

impl LookupSettings {
    /// Settings from the process configuration, loading the zoning-source
    /// table from `zoning_sources_path` when set.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Config`] if the zoning-source table cannot be
    /// read or fails validation.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, LookupError> {
        let zoning_sources = match &config.zoning_sources_path {
            Some(path) => ZoningSourceTable::load(path)?,
            None => ZoningSourceTable::builtin()?,
        };
        Ok(Self {
            budget: Duration::from_millis(config.lookup_budget_ms),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            http_timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            provider_endpoints: ProviderEndpoints::default(),
            zoning_sources: Arc::new(zoning_sources),
            opendata_search_url: DEFAULT_SEARCH_URL.to_string(),
            ocp_endpoints: OcpEndpoints::default(),
            geocoder_url: config.geocoder_url.clone(),
            geocoder_limiter: Arc::new(RateLimiter::new(Duration::from_millis(
                config.geocoder_min_interval_ms,
            ))),
            geocoder_max_retries: config.geocoder_max_retries,
            geocoder_backoff_base_ms: GEOCODER_BACKOFF_BASE_MS,
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LookupService {
    aggregator: SnapshotAggregator,
    ocp: OcpLookup,
    geocoder: NominatimClient,
    cache: Arc<dyn SnapshotCache>,
    budget: Duration,
}

impl LookupService {
    /// Wire every client around one shared HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Client`] or [`LookupError::Geocode`] if an
    /// HTTP client cannot be built or a configured URL is invalid.
    pub fn new(settings: LookupSettings) -> Result<Self, LookupError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&settings.user_agent)
            .build()
            .map_err(ArcgisError::from)?;

        let spatial = SpatialQueryClient::from_client(http.clone());
        let opendata = OpenDataClient::from_client(http, &settings.opendata_search_url)?;
        let zoning = ZoningEngine::new(
            spatial.clone(),
            Arc::clone(&settings.zoning_sources),
            Some(VancouverCatalogue::new(opendata, settings.enrichment_timeout)),
        );
        let providers = ProviderAdapters::new(spatial.clone(), settings.provider_endpoints);

        let geocoder = NominatimClient::new(
            &settings.geocoder_url,
            settings.http_timeout_secs,
            &settings.user_agent,
            settings.geocoder_limiter,
        )?
        .with_cache(Arc::new(GeocodeCache::new(settings.cache_ttl)))
        .with_retries(settings.geocoder_max_retries, settings.geocoder_backoff_base_ms);

        Ok(Self {
            aggregator: SnapshotAggregator::new(providers, zoning),
            ocp: OcpLookup::new(spatial, settings.ocp_endpoints),
            geocoder,
            cache: Arc::new(MemoryCache::new(settings.cache_ttl)),
            budget: settings.budget,
        })
    }

    /// # Errors
    ///
    /// See [`LookupSettings::from_app_config`] and [`LookupService::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, LookupError> {
        Self::new(LookupSettings::from_app_config(config)?)
    }

    /// Replace the default in-memory snapshot cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn SnapshotCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    #[must_use]
    pub fn sources(&self) -> &ZoningSourceTable {
        self.aggregator.zoning().sources()
    }

    /// Snapshot for a point, read through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidCoordinate`] for an out-of-range point.
    pub async fn lookup_coordinate(
        &self,
        coord: Coordinate,
        municipality: Option<&str>,
    ) -> Result<Snapshot, LookupError> {
        coord.validate()?;
        let key = coordinate_key(coord, municipality);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let snapshot = self
            .aggregator
            .resolve(coord, municipality, self.budget)
            .await?;
        self.store(&key, &snapshot);
        Ok(snapshot)
    }

    /// Geocode `address`, then resolve a snapshot at the match using the
    /// geocoder's locality as the municipality hint.
    ///
    /// # Errors
    ///
    /// - [`LookupError::MissingInput`] if `address` is blank.
    /// - [`LookupError::Geocode`] if the address cannot be geocoded.
    pub async fn lookup_address(&self, address: &str) -> Result<Snapshot, LookupError> {
        if address.trim().is_empty() {
            return Err(LookupError::MissingInput);
        }
        let key = address_key(address);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let geocoded = self.geocoder.geocode_address(address).await?;
        let mut snapshot = self
            .aggregator
            .resolve(geocoded.coordinate, geocoded.city.as_deref(), self.budget)
            .await?;
        snapshot.address = Some(if geocoded.display_name.is_empty() {
            geocoded.address
        } else {
            geocoded.display_name
        });
        self.store(&key, &snapshot);
        Ok(snapshot)
    }

    /// Zoning alone, bounded by the lookup budget.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidCoordinate`] for an out-of-range point.
    pub async fn zoning(
        &self,
        coord: Coordinate,
        municipality: Option<&str>,
    ) -> Result<ZoningOutcome, LookupError> {
        coord.validate()?;
        let deadline = enrichment_deadline(self.budget);
        let resolve = self
            .aggregator
            .zoning()
            .resolve_by(coord, municipality, Some(deadline));
        match tokio::time::timeout(self.budget, resolve).await {
            Ok(outcome) => Ok(outcome),
            Err(_) => Ok(ZoningOutcome::NotFound {
                error: format!("Zoning lookup timed out after {}ms", self.budget.as_millis()),
                source: None,
                partial: None,
                attempts: Vec::new(),
            }),
        }
    }

    /// Official Community Plan designation for `city` at `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidCoordinate`] for an out-of-range point.
    pub async fn ocp(
        &self,
        city: OcpCity,
        coord: Option<Coordinate>,
    ) -> Result<OcpResult, LookupError> {
        if let Some(coord) = &coord {
            coord.validate()?;
        }
        Ok(self.ocp.lookup(city, coord).await)
    }

    /// Type-ahead address candidates.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Geocode`] on a transport or parse failure.
    pub async fn suggest(&self, query: &str) -> Result<Vec<GeocodeResult>, LookupError> {
        Ok(self.geocoder.search_suggestions(query).await?)
    }

    fn cached(&self, key: &str) -> Option<Snapshot> {
        match self.cache.get(key) {
            Ok(Some(hit)) => {
                tracing::debug!(key, "snapshot cache hit");
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "snapshot cache read failed");
                None
            }
        }
    }

    /// Snapshots carrying provider errors are never cached.
    fn store(&self, key: &str, snapshot: &Snapshot) {
        if !snapshot.errors.is_empty() {
            return;
        }
        if let Err(e) = self.cache.put(key, snapshot.clone()) {
            tracing::warn!(key, error = %e, "snapshot cache write failed");
        }
    }
}
