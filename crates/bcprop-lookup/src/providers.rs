//! Fixed provincial point lookups: parcel, municipal and regional
//! boundaries, agricultural reserve, and floodplain-study index.
//!
//! Each adapter is one [`SpatialQueryClient`] call followed by a pure
//! extraction function over the attribute map. Adapters never retry and
//! hand failures back as [`ProviderResult`] data.

use bcprop_arcgis::{ArcgisError, PointQueryResult, SpatialQueryClient, SpatialQueryConfig};
use bcprop_core::{
    pick_field, AlrStatus, AttributeMap, BoundaryInfo, Coordinate, FloodplainInfo, ParcelInfo,
    ProviderResult,
};

pub const CADASTRE_SERVICE: &str =
    "https://delivery.maps.gov.bc.ca/arcgis/rest/services/whse/bcgw_pub_whse_cadastre/MapServer";
pub const LEGAL_ADMIN_SERVICE: &str =
    "https://delivery.maps.gov.bc.ca/arcgis/rest/services/whse/bcgw_pub_whse_legal_admin_boundaries/MapServer";
pub const WATER_MANAGEMENT_SERVICE: &str =
    "https://delivery.maps.gov.bc.ca/arcgis/rest/services/whse/bcgw_pub_whse_water_management/MapServer";

const PARCEL_LAYER: u32 = 1;
const REGIONAL_DISTRICT_LAYER: u32 = 16;
const MUNICIPALITY_LAYER: u32 = 18;
const ALR_LAYER: u32 = 23;
const FLOODPLAIN_LAYER: u32 = 37;

const PID_FIELDS: &[&str] = &["PID_FORMATTED", "PID", "LTO_PID", "PID_NUMBER"];
const PARCEL_OUT_FIELDS: &[&str] = &[
    "PID",
    "PID_FORMATTED",
    "PID_NUMBER",
    "PARCEL_NAME",
    "PARCEL_STATUS",
    "PARCEL_CLASS",
];
const BOUNDARY_NAME_FIELDS: &[&str] = &["ADMIN_AREA_NAME", "NAME"];

pub const ALR_SOURCE: &str = "Province of BC";

/// The six aggregator branches, named the way diagnostics report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Parcel,
    Municipality,
    RegionalDistrict,
    Alr,
    Floodplain,
    Zoning,
}

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Parcel,
        Provider::Municipality,
        Provider::RegionalDistrict,
        Provider::Alr,
        Provider::Floodplain,
        Provider::Zoning,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Provider::Parcel => "PID",
            Provider::Municipality => "Municipality",
            Provider::RegionalDistrict => "Regional district",
            Provider::Alr => "ALR",
            Provider::Floodplain => "Floodplain",
            Provider::Zoning => "Zoning",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Service roots for the provincial layers. Tests point these at a mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub cadastre: String,
    pub legal_admin: String,
    pub water_management: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            cadastre: CADASTRE_SERVICE.to_string(),
            legal_admin: LEGAL_ADMIN_SERVICE.to_string(),
            water_management: WATER_MANAGEMENT_SERVICE.to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every service rooted at one base URL (`<base>/cadastre`, ...).
    #[must_use]
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            cadastre: format!("{base}/cadastre/MapServer"),
            legal_admin: format!("{base}/legal/MapServer"),
            water_management: format!("{base}/water/MapServer"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderAdapters {
    client: SpatialQueryClient,
    endpoints: ProviderEndpoints,
}

impl ProviderAdapters {
    #[must_use]
    pub fn new(client: SpatialQueryClient, endpoints: ProviderEndpoints) -> Self {
        Self { client, endpoints }
    }

    #[must_use]
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    pub async fn parcel(&self, coord: Coordinate) -> ProviderResult<ParcelInfo> {
        let config = SpatialQueryConfig::new(self.endpoints.cadastre.clone(), PARCEL_LAYER)
            .with_out_fields(PARCEL_OUT_FIELDS.iter().copied());
        self.run(Provider::Parcel, &config, coord, |r| {
            extract_parcel(r.attributes.as_ref())
        })
        .await
    }

    pub async fn municipality(&self, coord: Coordinate) -> ProviderResult<BoundaryInfo> {
        let config = SpatialQueryConfig::new(self.endpoints.legal_admin.clone(), MUNICIPALITY_LAYER);
        self.run(Provider::Municipality, &config, coord, |r| {
            extract_boundary(r.attributes.as_ref())
        })
        .await
    }

    pub async fn regional_district(&self, coord: Coordinate) -> ProviderResult<BoundaryInfo> {
        let config =
            SpatialQueryConfig::new(self.endpoints.legal_admin.clone(), REGIONAL_DISTRICT_LAYER);
        self.run(Provider::RegionalDistrict, &config, coord, |r| {
            extract_boundary(r.attributes.as_ref())
        })
        .await
    }

    pub async fn alr(&self, coord: Coordinate) -> ProviderResult<AlrStatus> {
        let config = SpatialQueryConfig::new(self.endpoints.legal_admin.clone(), ALR_LAYER);
        self.run(Provider::Alr, &config, coord, |r| {
            extract_alr(r.attributes.as_ref())
        })
        .await
    }

    pub async fn floodplain(&self, coord: Coordinate) -> ProviderResult<FloodplainInfo> {
        let config =
            SpatialQueryConfig::new(self.endpoints.water_management.clone(), FLOODPLAIN_LAYER)
                .with_geometry(true);
        self.run(Provider::Floodplain, &config, coord, extract_floodplain)
            .await
    }

    async fn run<T>(
        &self,
        provider: Provider,
        config: &SpatialQueryConfig,
        coord: Coordinate,
        extract: impl FnOnce(PointQueryResult) -> T,
    ) -> ProviderResult<T> {
        match self.client.query_point(config, coord).await {
            Ok(result) => ProviderResult::ok(extract(result)),
            Err(e) => {
                tracing::warn!(provider = provider.label(), error = %e, "provider lookup failed");
                ProviderResult::err(failure_message(provider, &e))
            }
        }
    }
}

fn failure_message(provider: Provider, err: &ArcgisError) -> String {
    format!("{} lookup failed: {err}", provider.label())
}

/// Parcel identity from a cadastre feature. `PID_FORMATTED` wins over the
/// bare and numeric identifiers.
#[must_use]
pub fn extract_parcel(attrs: Option<&AttributeMap>) -> ParcelInfo {
    let Some(attrs) = attrs else {
        return ParcelInfo::default();
    };
    ParcelInfo {
        found: true,
        pid: pick_field(attrs, PID_FIELDS),
        parcel_name: pick_field(attrs, ["PARCEL_NAME"]),
        parcel_status: pick_field(attrs, ["PARCEL_STATUS"]),
        parcel_class: pick_field(attrs, ["PARCEL_CLASS"]),
    }
}

#[must_use]
pub fn extract_boundary(attrs: Option<&AttributeMap>) -> BoundaryInfo {
    match attrs {
        Some(attrs) => BoundaryInfo {
            found: true,
            name: pick_field(attrs, BOUNDARY_NAME_FIELDS),
        },
        None => BoundaryInfo::default(),
    }
}

#[must_use]
pub fn extract_alr(attrs: Option<&AttributeMap>) -> AlrStatus {
    AlrStatus {
        inside_alr: attrs.is_some(),
        status: attrs.and_then(|a| pick_field(a, ["ALR_STATUS"])),
        source: ALR_SOURCE.to_string(),
    }
}

#[must_use]
pub fn extract_floodplain(result: PointQueryResult) -> FloodplainInfo {
    let Some(attrs) = result.attributes.as_ref() else {
        return FloodplainInfo::default();
    };
    FloodplainInfo {
        has_mapped_floodplain_study: true,
        project_name: pick_field(attrs, ["PROJECT_NAME"]),
        report_url: pick_field(attrs, ["LINK"]),
        geometry: result.geometry,
    }
}
