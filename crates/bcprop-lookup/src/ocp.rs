//! Official Community Plan designation lookups.

use std::str::FromStr;

use bcprop_arcgis::{SpatialQueryClient, SpatialQueryConfig};
use bcprop_core::{pick_field, Coordinate};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

const BURNABY_SERVICE: &str =
    "https://gis.burnaby.ca/arcgis/rest/services/BurnabyMap/BBY_PUBLIC_TOC/MapServer";
const SURREY_SERVICE: &str = "https://gisservices.surrey.ca/arcgis/rest/services/OpenData/MapServer";

const ARCGIS_SOURCE: &str = "ArcGIS REST";
const LINKS_ONLY_SOURCE: &str = "Official plan links";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcpCity {
    Burnaby,
    Surrey,
    Vancouver,
}

impl OcpCity {
    #[must_use]
    pub fn official_url(self) -> &'static str {
        match self {
            OcpCity::Burnaby => "https://www.burnaby.ca/our-city/official-community-plan",
            OcpCity::Surrey => "https://www.surrey.ca/city-government/bylaws/official-community-plan",
            OcpCity::Vancouver => {
                "https://vancouver.ca/home-property-development/official-development-plans.aspx"
            }
        }
    }
}

impl FromStr for OcpCity {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "burnaby" => Ok(OcpCity::Burnaby),
            "surrey" => Ok(OcpCity::Surrey),
            "vancouver" => Ok(OcpCity::Vancouver),
            other => Err(LookupError::UnknownCity(other.to_string())),
        }
    }
}

impl std::fmt::Display for OcpCity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcpCity::Burnaby => write!(f, "burnaby"),
            OcpCity::Surrey => write!(f, "surrey"),
            OcpCity::Vancouver => write!(f, "vancouver"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcpResult {
    pub city: OcpCity,
    pub found: bool,
    pub designation: Option<String>,
    pub community_plan: Option<String>,
    pub official_url: String,
    pub source: String,
}

impl OcpResult {
    fn not_found(city: OcpCity, source: &str) -> Self {
        Self {
            city,
            found: false,
            designation: None,
            community_plan: None,
            official_url: city.official_url().to_string(),
            source: source.to_string(),
        }
    }
}

/// Service roots of the queryable OCP layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcpEndpoints {
    pub burnaby: String,
    pub surrey: String,
}

impl Default for OcpEndpoints {
    fn default() -> Self {
        Self {
            burnaby: BURNABY_SERVICE.to_string(),
            surrey: SURREY_SERVICE.to_string(),
        }
    }
}

struct OcpLayer<'a> {
    service_url: &'a str,
    layer_id: u32,
    designation_fields: &'static [&'static str],
    community_plan_fields: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct OcpLookup {
    client: SpatialQueryClient,
    endpoints: OcpEndpoints,
}

impl OcpLookup {
    #[must_use]
    pub fn new(client: SpatialQueryClient, endpoints: OcpEndpoints) -> Self {
        Self { client, endpoints }
    }

    fn layer(&self, city: OcpCity) -> Option<OcpLayer<'_>> {
        match city {
            OcpCity::Burnaby => Some(OcpLayer {
                service_url: &self.endpoints.burnaby,
                layer_id: 45,
                designation_fields: &["DESIGNATION"],
                community_plan_fields: &["COMMUNITY_PLAN"],
            }),
            OcpCity::Surrey => Some(OcpLayer {
                service_url: &self.endpoints.surrey,
                layer_id: 237,
                designation_fields: &["LAND_USE"],
                community_plan_fields: &["OCP_ID"],
            }),
            OcpCity::Vancouver => None,
        }
    }

    /// Look up the plan designation at `coord`.
    ///
    /// Vancouver is links-only. A missing coordinate or a query failure is
    /// reported as `found: false`, never as an error.
    pub async fn lookup(&self, city: OcpCity, coord: Option<Coordinate>) -> OcpResult {
        let Some(layer) = self.layer(city) else {
            return OcpResult::not_found(city, LINKS_ONLY_SOURCE);
        };
        let Some(coord) = coord else {
            return OcpResult::not_found(city, ARCGIS_SOURCE);
        };

        let config = SpatialQueryConfig::new(layer.service_url, layer.layer_id);
        let attrs = match self.client.query_point(&config, coord).await {
            Ok(result) => result.attributes.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(city = %city, error = %e, "OCP lookup failed");
                return OcpResult::not_found(city, ARCGIS_SOURCE);
            }
        };

        let designation = pick_field(&attrs, layer.designation_fields);
        let community_plan = pick_field(&attrs, layer.community_plan_fields);
        OcpResult {
            city,
            found: designation.is_some() || community_plan.is_some(),
            designation,
            community_plan,
            official_url: city.official_url().to_string(),
            source: ARCGIS_SOURCE.to_string(),
        }
    }
}
