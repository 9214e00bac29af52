//! Records returned to callers: per-attempt diagnostics, provider results,
//! the zoning outcome, and the aggregate [`Snapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::AttributeMap;
use crate::geo::{Coordinate, Polygon, SpatialReference};

/// How a point geometry is written into the `geometry` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryEncoding {
    /// `x,y`
    PointPair,
    /// `{"x":..,"y":..}`
    JsonObject,
}

/// What a single query attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Feature returned with a resolvable code or name.
    Hit,
    /// Feature returned, but none of the code/name aliases were populated.
    Partial,
    /// The service answered successfully with zero features.
    NoMatch,
    /// Transport, HTTP status, or service-level error.
    Failed,
}

/// Diagnostic record of one query issued by the zoning engine. Kept in issue
/// order and returned to the caller even on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAttempt {
    pub endpoint: String,
    pub spatial_reference: SpatialReference,
    pub geometry_encoding: GeometryEncoding,
    /// The encoded geometry parameter exactly as sent.
    pub geometry: String,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

/// Per-provider result; failures are carried as data instead of propagated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult<T> {
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> ProviderResult<T> {
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(message.into()),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_parts(self) -> (Option<T>, Option<String>) {
        (self.value, self.error)
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ProviderResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParcelInfo {
    /// Whether the cadastre layer returned a parcel at all.
    pub found: bool,
    pub pid: Option<String>,
    pub parcel_name: Option<String>,
    pub parcel_status: Option<String>,
    pub parcel_class: Option<String>,
}

/// Administrative boundary (municipality or regional district) containing the point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundaryInfo {
    pub found: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlrStatus {
    pub inside_alr: bool,
    pub status: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FloodplainInfo {
    pub has_mapped_floodplain_study: bool,
    pub project_name: Option<String>,
    pub report_url: Option<String>,
    pub geometry: Option<Polygon>,
}

/// Property-tax assessment record matched near the point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub distance_m: f64,
    pub report_year: Option<String>,
    pub pid: Option<String>,
    pub folio: Option<String>,
    pub current_land_value: Option<String>,
    pub current_improvement_value: Option<String>,
    pub tax_levy: Option<String>,
    pub legal_description: Option<String>,
    pub fields: AttributeMap,
}

/// A resolved zoning classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoningHit {
    pub code: Option<String>,
    pub name: Option<String>,
    pub attributes: AttributeMap,
    pub geometry: Option<Polygon>,
}

/// Result of one zoning resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ZoningOutcome {
    Found {
        hit: ZoningHit,
        source: String,
        attempts: Vec<QueryAttempt>,
        /// Present only for sources that carry assessment enrichment.
        #[serde(skip_serializing_if = "Option::is_none")]
        assessment: Option<ProviderResult<AssessmentRecord>>,
    },
    NotFound {
        error: String,
        source: Option<String>,
        /// Attributes from a feature that matched but carried no zoning fields.
        #[serde(skip_serializing_if = "Option::is_none")]
        partial: Option<AttributeMap>,
        attempts: Vec<QueryAttempt>,
    },
    Unsupported {
        error: String,
        municipality: Option<String>,
    },
}

impl ZoningOutcome {
    #[must_use]
    pub fn hit(&self) -> Option<&ZoningHit> {
        match self {
            ZoningOutcome::Found { hit, .. } => Some(hit),
            _ => None,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> &[QueryAttempt] {
        match self {
            ZoningOutcome::Found { attempts, .. } | ZoningOutcome::NotFound { attempts, .. } => {
                attempts
            }
            ZoningOutcome::Unsupported { .. } => &[],
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            ZoningOutcome::Found { .. } => None,
            ZoningOutcome::NotFound { error, .. } | ZoningOutcome::Unsupported { error, .. } => {
                Some(error)
            }
        }
    }
}

/// Consolidated property snapshot for one point. Built once per resolution
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Display address when the lookup started from free text.
    pub address: Option<String>,
    pub coordinate: Coordinate,
    pub parcel: Option<ParcelInfo>,
    pub municipality: Option<BoundaryInfo>,
    pub regional_district: Option<BoundaryInfo>,
    pub alr: Option<AlrStatus>,
    pub floodplain: Option<FloodplainInfo>,
    pub zoning: Option<ZoningOutcome>,
    /// One entry per failed provider, led by the provider label.
    pub errors: Vec<String>,
    pub resolved_at: DateTime<Utc>,
}

impl Snapshot {
    /// Number of provider fields that carry a value.
    #[must_use]
    pub fn populated_field_count(&self) -> usize {
        [
            self.parcel.is_some(),
            self.municipality.is_some(),
            self.regional_district.is_some(),
            self.alr.is_some(),
            self.floodplain.is_some(),
            self.zoning.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}
