use bcprop_core::{
    AttributeMap, Coordinate, GeometryEncoding, Polygon, ProjectedCoordinate, SpatialReference,
};
use serde::Deserialize;
use serde_json::Value;

/// Static description of one queryable ArcGIS layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQueryConfig {
    /// Map/feature service root, e.g. `https://host/arcgis/rest/services/X/MapServer`.
    pub service_url: String,
    pub layer_id: u32,
    /// Requested attribute fields. `["*"]` asks for everything.
    pub out_fields: Vec<String>,
    pub return_geometry: bool,
    pub out_sr: SpatialReference,
}

impl SpatialQueryConfig {
    /// A config requesting all fields without geometry, output in WGS84.
    pub fn new(service_url: impl Into<String>, layer_id: u32) -> Self {
        Self {
            service_url: service_url.into(),
            layer_id,
            out_fields: vec!["*".to_string()],
            return_geometry: false,
            out_sr: SpatialReference::Wgs84,
        }
    }

    #[must_use]
    pub fn with_out_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if !fields.is_empty() {
            self.out_fields = fields;
        }
        self
    }

    #[must_use]
    pub fn with_geometry(mut self, return_geometry: bool) -> Self {
        self.return_geometry = return_geometry;
        self
    }

    /// `<service_url>/<layer_id>` without a trailing slash.
    #[must_use]
    pub fn layer_url(&self) -> String {
        format!("{}/{}", self.service_url.trim_end_matches('/'), self.layer_id)
    }

    /// The layer's `query` operation URL (no query string).
    #[must_use]
    pub fn query_url(&self) -> String {
        format!("{}/query", self.layer_url())
    }
}

/// A query point already expressed in the reference it will be sent in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointGeometry {
    pub x: f64,
    pub y: f64,
    pub spatial_reference: SpatialReference,
}

impl PointGeometry {
    /// Longitude as `x`, latitude as `y`.
    #[must_use]
    pub fn wgs84(coord: Coordinate) -> Self {
        Self {
            x: coord.longitude,
            y: coord.latitude,
            spatial_reference: SpatialReference::Wgs84,
        }
    }

    #[must_use]
    pub fn projected(coord: ProjectedCoordinate) -> Self {
        Self {
            x: coord.x,
            y: coord.y,
            spatial_reference: coord.epsg,
        }
    }

    /// Render the `geometry` query parameter.
    ///
    /// `PointPair` is the bare `x,y` form; `JsonObject` is the esri point
    /// JSON carrying its own `spatialReference.wkid`.
    #[must_use]
    pub fn encode(&self, encoding: GeometryEncoding) -> String {
        match encoding {
            GeometryEncoding::PointPair => format!("{},{}", self.x, self.y),
            GeometryEncoding::JsonObject => format!(
                r#"{{"x":{},"y":{},"spatialReference":{{"wkid":{}}}}}"#,
                self.x,
                self.y,
                self.spatial_reference.epsg()
            ),
        }
    }
}

/// Normalized result of one point-intersection query.
#[derive(Debug, Clone, PartialEq)]
pub struct PointQueryResult {
    /// Attributes of the first matching feature; `None` when nothing intersects.
    pub attributes: Option<AttributeMap>,
    pub geometry: Option<Polygon>,
    /// The response body as received.
    pub raw: Value,
    pub status: u16,
}

impl PointQueryResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_none()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureSet {
    #[serde(default)]
    pub features: Vec<Feature>,
    pub error: Option<ServiceErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    pub attributes: Option<AttributeMap>,
    pub geometry: Option<FeatureGeometry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureGeometry {
    pub rings: Option<Vec<Vec<Vec<f64>>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceErrorBody {
    pub code: Option<i64>,
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ServiceErrorBody {
    pub(crate) fn describe(&self) -> String {
        let message = self
            .message
            .as_deref()
            .unwrap_or("unknown service error")
            .to_string();
        if self.details.is_empty() {
            message
        } else {
            format!("{message} ({})", self.details.join("; "))
        }
    }
}

/// One record of a records-1.0 open-data search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenDataRecord {
    #[serde(default)]
    pub fields: AttributeMap,
    pub geometry: Option<Value>,
}

impl OpenDataRecord {
    /// Distance from the search centre in metres, read from `_distance`
    /// or `dist`. Numeric strings are accepted.
    #[must_use]
    pub fn distance_m(&self) -> Option<f64> {
        ["_distance", "dist"]
            .iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|d| d.is_finite())
    }

    /// The record's `geom` field when it is a GeoJSON polygon.
    #[must_use]
    pub fn polygon(&self) -> Option<Polygon> {
        let geom = self.fields.get("geom")?;
        if geom.get("type").and_then(Value::as_str) != Some("Polygon") {
            return None;
        }
        let rings: Vec<Vec<Vec<f64>>> =
            serde_json::from_value(geom.get("coordinates")?.clone()).ok()?;
        Polygon::from_raw_rings(&rings)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenDataSearchResponse {
    #[serde(default)]
    pub records: Vec<OpenDataRecord>,
}
