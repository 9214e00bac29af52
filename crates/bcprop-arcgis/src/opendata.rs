//! Client for records-1.0 open-data search APIs (OpenDataSoft style).

use std::time::Duration;

use bcprop_core::Coordinate;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::ArcgisError;
use crate::types::{OpenDataRecord, OpenDataSearchResponse};

/// City of Vancouver records search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://opendata.vancouver.ca/api/records/1.0/search/";

/// A distance-filtered dataset search around one point.
#[derive(Debug, Clone, Copy)]
pub struct NearbySearch<'a> {
    pub dataset: &'a str,
    pub center: Coordinate,
    pub radius_m: u32,
    pub fields: &'a [&'a str],
    pub rows: u32,
}

/// Response of one nearby search.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyPage {
    pub records: Vec<OpenDataRecord>,
    pub raw: Value,
    pub status: u16,
}

impl NearbyPage {
    /// The closest record within `max_distance_m`.
    ///
    /// Records that carry no distance are never chosen.
    #[must_use]
    pub fn nearest_within(&self, max_distance_m: f64) -> Option<(f64, &OpenDataRecord)> {
        self.records
            .iter()
            .filter_map(|r| r.distance_m().map(|d| (d, r)))
            .filter(|(d, _)| *d <= max_distance_m)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

/// Client for an open-data `records/1.0/search` endpoint.
#[derive(Debug, Clone)]
pub struct OpenDataClient {
    client: Client,
    search_url: Url,
}

impl OpenDataClient {
    /// Creates a client pointed at the City of Vancouver catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`ArcgisError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ArcgisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Self::from_client(client, DEFAULT_SEARCH_URL)
    }

    /// Wraps an existing client and points it at `search_url` (used by tests).
    ///
    /// # Errors
    ///
    /// Returns [`ArcgisError::InvalidUrl`] if `search_url` does not parse.
    pub fn from_client(client: Client, search_url: &str) -> Result<Self, ArcgisError> {
        let search_url = Url::parse(search_url)
            .map_err(|e| ArcgisError::InvalidUrl(format!("{search_url}: {e}")))?;
        Ok(Self { client, search_url })
    }

    /// The search endpoint, without query string.
    #[must_use]
    pub fn search_url(&self) -> &str {
        self.search_url.as_str()
    }

    /// Runs one `geofilter.distance` search.
    ///
    /// # Errors
    ///
    /// - [`ArcgisError::Http`] on network failure.
    /// - [`ArcgisError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ArcgisError::Deserialize`] if the body is not a records page.
    pub async fn search_nearby(&self, search: &NearbySearch<'_>) -> Result<NearbyPage, ArcgisError> {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("dataset", search.dataset);
            pairs.append_pair("rows", &search.rows.to_string());
            pairs.append_pair(
                "geofilter.distance",
                &format!(
                    "{},{},{}",
                    search.center.latitude, search.center.longitude, search.radius_m
                ),
            );
            if !search.fields.is_empty() {
                pairs.append_pair("fields", &search.fields.join(","));
            }
            pairs.append_pair("format", "json");
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArcgisError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.search_url.to_string(),
            });
        }
        let body = response.text().await?;
        let raw: Value = serde_json::from_str(&body).map_err(|e| ArcgisError::Deserialize {
            context: format!("search(dataset={})", search.dataset),
            source: e,
        })?;
        let page: OpenDataSearchResponse =
            serde_json::from_value(raw.clone()).map_err(|e| ArcgisError::Deserialize {
                context: format!("search(dataset={})", search.dataset),
                source: e,
            })?;

        tracing::debug!(
            dataset = search.dataset,
            radius_m = search.radius_m,
            records = page.records.len(),
            "open data search complete"
        );

        Ok(NearbyPage {
            records: page.records,
            raw,
            status: status.as_u16(),
        })
    }
}
