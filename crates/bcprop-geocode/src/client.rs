//! HTTP client for Nominatim free-form search.
//!
//! Every outbound call first takes a slot from the shared [`RateLimiter`].
//! Address lookups are read through the [`GeocodeCache`] and retried on
//! transient failures; suggestion searches are single best-effort calls.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::cache::GeocodeCache;
use crate::error::GeocodeError;
use crate::normalize::normalize_address;
use crate::rate_limit::RateLimiter;
use crate::retry::retry_with_backoff;
use crate::types::{GeocodeResult, NominatimPlace};

const SUGGESTION_LIMIT: u32 = 5;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Client for a Nominatim `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: Url,
    limiter: Arc<RateLimiter>,
    cache: Arc<GeocodeCache>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl NominatimClient {
    /// Creates a client for `base_url` that spaces calls through `limiter`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::Parse`] if `base_url` is
    /// not a valid URL.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        let parsed = Url::parse(base_url).map_err(|e| GeocodeError::Parse {
            message: format!("invalid geocoder URL '{base_url}': {e}"),
        })?;

        Ok(Self {
            client,
            base_url: parsed,
            limiter,
            cache: Arc::new(GeocodeCache::new(DEFAULT_CACHE_TTL)),
            max_retries: 2,
            backoff_base_ms: 1_000,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<GeocodeCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Resolves a free-text address to its best-match coordinate.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::EmptyQuery`] if the address is blank.
    /// - [`GeocodeError::NoResults`] if the geocoder matched nothing.
    /// - [`GeocodeError::RateLimited`], [`GeocodeError::UnexpectedStatus`]
    ///   or [`GeocodeError::Http`] once retries are exhausted.
    /// - [`GeocodeError::Parse`] on a malformed response.
    pub async fn geocode_address(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        let normalized = normalize_address(address);
        if normalized.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }
        if let Some(hit) = self.cache.get(&normalized) {
            tracing::debug!(address = %normalized, "geocode cache hit");
            return Ok(hit);
        }

        let places = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.search(&normalized, 1)
        })
        .await?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoResults {
                query: normalized.clone(),
            })?;
        let result = place.into_result(&normalized)?;

        self.cache.insert(&normalized, result.clone());
        Ok(result)
    }

    /// Returns up to five candidate matches for type-ahead suggestions.
    ///
    /// A blank query or a non-2xx response yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] on network failure and
    /// [`GeocodeError::Parse`] on a malformed 2xx response.
    pub async fn search_suggestions(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let normalized = normalize_address(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let places = match self.search(&normalized, SUGGESTION_LIMIT).await {
            Ok(places) => places,
            Err(GeocodeError::UnexpectedStatus { status, .. }) => {
                tracing::warn!(status, "geocoder suggestions returned non-success status");
                return Ok(Vec::new());
            }
            Err(GeocodeError::RateLimited { .. }) => {
                tracing::warn!("geocoder suggestions rate limited");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        places
            .into_iter()
            .map(|place| {
                let address = normalize_address(&place.display_name);
                let mut result = place.into_result(&address)?;
                result.city = None;
                Ok(result)
            })
            .collect()
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<NominatimPlace>, GeocodeError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("addressdetails", "1")
            .append_pair("accept-language", "en");

        self.limiter.acquire().await;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(GeocodeError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(GeocodeError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.base_url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GeocodeError::Parse {
            message: format!("geocoder response is not a result array: {e}"),
        })
    }
}
