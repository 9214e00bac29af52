//! HTTP client for ArcGIS REST point-intersection queries.
//!
//! One call is one request. The client reports "no feature here" as a
//! successful result with `attributes: None` and leaves alternate
//! encodings to the caller.

use std::time::Duration;

use bcprop_core::{Coordinate, GeometryEncoding, Polygon};
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::ArcgisError;
use crate::types::{FeatureSet, PointGeometry, PointQueryResult, SpatialQueryConfig};

/// Client for ArcGIS map/feature service `query` operations.
#[derive(Debug, Clone)]
pub struct SpatialQueryClient {
    client: Client,
}

impl SpatialQueryClient {
    /// Creates a client with its own connection pool.
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
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::Client` so several clients share a pool.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Builds the full query URL for one point in one encoding.
    ///
    /// # Errors
    ///
    /// Returns [`ArcgisError::InvalidUrl`] if the configured service URL
    /// does not parse.
    pub fn build_query_url(
        config: &SpatialQueryConfig,
        point: &PointGeometry,
        encoding: GeometryEncoding,
    ) -> Result<Url, ArcgisError> {
        let base = config.query_url();
        let mut url =
            Url::parse(&base).map_err(|e| ArcgisError::InvalidUrl(format!("{base}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("f", "json");
            pairs.append_pair("geometry", &point.encode(encoding));
            pairs.append_pair("geometryType", "esriGeometryPoint");
            pairs.append_pair("inSR", point.spatial_reference.epsg());
            pairs.append_pair("spatialRel", "esriSpatialRelIntersects");
            pairs.append_pair("outFields", &config.out_fields.join(","));
            pairs.append_pair(
                "returnGeometry",
                if config.return_geometry {
                    "true"
                } else {
                    "false"
                },
            );
            pairs.append_pair("outSR", config.out_sr.epsg());
            pairs.append_pair("resultRecordCount", "1");
        }
        Ok(url)
    }

    /// Queries the layer at a WGS84 coordinate using the plain `x,y` encoding.
    ///
    /// # Errors
    ///
    /// See [`SpatialQueryClient::query_geometry`].
    pub async fn query_point(
        &self,
        config: &SpatialQueryConfig,
        coord: Coordinate,
    ) -> Result<PointQueryResult, ArcgisError> {
        self.query_geometry(
            config,
            &PointGeometry::wgs84(coord),
            GeometryEncoding::PointPair,
        )
        .await
    }

    /// Queries the layer at an arbitrary point in the given encoding.
    ///
    /// # Errors
    ///
    /// - [`ArcgisError::Http`] on network failure.
    /// - [`ArcgisError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ArcgisError::Service`] when the body is an ArcGIS error object.
    /// - [`ArcgisError::Deserialize`] if the body is not a feature set.
    pub async fn query_geometry(
        &self,
        config: &SpatialQueryConfig,
        point: &PointGeometry,
        encoding: GeometryEncoding,
    ) -> Result<PointQueryResult, ArcgisError> {
        let url = Self::build_query_url(config, point, encoding)?;
        let (status, raw) = self.request_json(&url).await?;

        let feature_set: FeatureSet =
            serde_json::from_value(raw.clone()).map_err(|e| ArcgisError::Deserialize {
                context: config.query_url(),
                source: e,
            })?;

        if let Some(err) = feature_set.error {
            return Err(ArcgisError::Service {
                code: err.code.unwrap_or_default(),
                message: err.describe(),
            });
        }

        let Some(feature) = feature_set.features.into_iter().next() else {
            tracing::debug!(
                endpoint = %config.query_url(),
                spatial_reference = %point.spatial_reference,
                "point query returned no features"
            );
            return Ok(PointQueryResult {
                attributes: None,
                geometry: None,
                raw,
                status,
            });
        };

        let geometry = feature
            .geometry
            .and_then(|g| g.rings)
            .and_then(|rings| Polygon::from_raw_rings(&rings));

        Ok(PointQueryResult {
            attributes: Some(feature.attributes.unwrap_or_default()),
            geometry,
            raw,
            status,
        })
    }

    /// Fetches the layer description (`<service>/<layer>?f=pjson`).
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SpatialQueryClient::query_geometry`].
    pub async fn layer_metadata(
        &self,
        service_url: &str,
        layer_id: u32,
    ) -> Result<Value, ArcgisError> {
        let layer_url = SpatialQueryConfig::new(service_url, layer_id).layer_url();
        let mut url = Url::parse(&layer_url)
            .map_err(|e| ArcgisError::InvalidUrl(format!("{layer_url}: {e}")))?;
        url.query_pairs_mut().append_pair("f", "pjson");

        let (_, body) = self.request_json(&url).await?;
        if let Some(err) = body.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown service error")
                .to_string();
            return Err(ArcgisError::Service { code, message });
        }
        Ok(body)
    }

    /// Sends a GET, requires a 2xx status, and parses the body as JSON.
    async fn request_json(&self, url: &Url) -> Result<(u16, Value), ArcgisError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut endpoint = url.clone();
            endpoint.set_query(None);
            return Err(ArcgisError::UnexpectedStatus {
                status: status.as_u16(),
                url: endpoint.to_string(),
            });
        }
        let body = response.text().await?;
        let value = serde_json::from_str(&body).map_err(|e| ArcgisError::Deserialize {
            context: url.path().to_string(),
            source: e,
        })?;
        Ok((status.as_u16(), value))
    }
}

#[cfg(test)]
mod tests {
    use bcprop_core::SpatialReference;

    use super::*;

    fn query_value<'a>(url: &'a Url, key: &str) -> Option<std::borrow::Cow<'a, str>> {
        url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn build_query_url_sets_intersection_parameters() {
        let config = SpatialQueryConfig::new("https://gis.example.test/MapServer", 18)
            .with_out_fields(["ADMIN_AREA_NAME", "NAME"]);
        let coord = Coordinate::new(49.2488, -122.9805).unwrap();
        let url = SpatialQueryClient::build_query_url(
            &config,
            &PointGeometry::wgs84(coord),
            GeometryEncoding::PointPair,
        )
        .unwrap();

        assert_eq!(url.path(), "/MapServer/18/query");
        assert_eq!(query_value(&url, "f").as_deref(), Some("json"));
        assert_eq!(
            query_value(&url, "geometry").as_deref(),
            Some("-122.9805,49.2488")
        );
        assert_eq!(
            query_value(&url, "spatialRel").as_deref(),
            Some("esriSpatialRelIntersects")
        );
        assert_eq!(query_value(&url, "inSR").as_deref(), Some("4326"));
        assert_eq!(
            query_value(&url, "outFields").as_deref(),
            Some("ADMIN_AREA_NAME,NAME")
        );
        assert_eq!(query_value(&url, "returnGeometry").as_deref(), Some("false"));
        assert_eq!(query_value(&url, "resultRecordCount").as_deref(), Some("1"));
    }

    #[test]
    fn build_query_url_uses_point_reference_for_in_sr() {
        let config = SpatialQueryConfig::new("https://gis.example.test/MapServer", 42);
        let point = PointGeometry {
            x: 501_419.0,
            y: 5_455_114.0,
            spatial_reference: SpatialReference::Utm10N,
        };
        let url =
            SpatialQueryClient::build_query_url(&config, &point, GeometryEncoding::JsonObject)
                .unwrap();
        assert_eq!(query_value(&url, "inSR").as_deref(), Some("26910"));
        assert_eq!(query_value(&url, "outSR").as_deref(), Some("4326"));
        assert!(query_value(&url, "geometry")
            .is_some_and(|g| g.contains("\"wkid\":26910")));
    }

    #[test]
    fn build_query_url_rejects_relative_service_url() {
        let config = SpatialQueryConfig::new("not a url", 1);
        let coord = Coordinate::new(49.0, -123.0).unwrap();
        let err = SpatialQueryClient::build_query_url(
            &config,
            &PointGeometry::wgs84(coord),
            GeometryEncoding::PointPair,
        )
        .unwrap_err();
        assert!(matches!(err, ArcgisError::InvalidUrl(_)));
    }
}
