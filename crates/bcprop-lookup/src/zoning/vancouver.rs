//! City of Vancouver zoning via its open-data catalogue.
//!
//! Vancouver publishes zoning districts and the property-tax report as
//! point datasets rather than an intersectable layer, so the lookup is a
//! nearest-record search over a growing radius.

use std::time::Duration;

use bcprop_arcgis::{NearbySearch, OpenDataClient, OpenDataRecord};
use bcprop_core::{
    pick_field, AssessmentRecord, AttemptOutcome, AttributeMap, Coordinate, GeometryEncoding,
    ProviderResult, QueryAttempt, SpatialReference, ZoningHit,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tokio::time::Instant;

pub const ZONING_DATASET: &str = "zoning-districts-and-labels";
pub const ASSESSMENT_DATASET: &str = "property-tax-report";

const ZONING_FIELDS: &[&str] = &[
    "zoning_district",
    "zoning_category",
    "zoning_classification",
    "cd_1_number",
    "_distance",
];
const ASSESSMENT_FIELDS: &[&str] = &[
    "report_year",
    "tax_assessment_year",
    "current_land_value",
    "current_improvement_value",
    "tax_levy",
    "pid",
    "plan",
    "lot",
    "block",
    "district_lot",
    "legal_type",
    "zoning_district",
    "zoning_classification",
    "folio",
    "narrative_legal_line1",
    "narrative_legal_line2",
    "_distance",
];

const CODE_FIELDS: &[&str] = &["zoning_district", "cd_1_number", "zoning_category"];
const NAME_FIELDS: &[&str] = &["zoning_classification", "zoning_category"];

/// Search radii in metres, tried smallest first.
pub const SEARCH_RADII_M: [u32; 4] = [25, 50, 100, 200];
pub const MAX_DISTANCE_M: f64 = 400.0;
const ROWS: u32 = 5;

const BYLAW_PDF: &str = "https://bylaws.vancouver.ca/Zoning/zoning-by-law-consolidated.pdf";
const DOCUMENT_LIBRARY: &str =
    "https://vancouver.ca/home-property-development/zoning-and-land-use-policies-document-library.aspx";

/// `encodeURIComponent`-style: unreserved characters pass through.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Whether a lookup belongs to the City of Vancouver catalogue.
///
/// A known municipality name decides on its own; the bounding box is only
/// consulted when no name is available.
#[must_use]
pub fn is_city_of_vancouver(municipality: Option<&str>, coord: Coordinate) -> bool {
    match municipality.map(str::trim).filter(|m| !m.is_empty()) {
        Some(name) => {
            let lower = name.to_lowercase();
            lower.contains("vancouver")
                && !lower.contains("north vancouver")
                && !lower.contains("west vancouver")
        }
        None => {
            (49.18..=49.35).contains(&coord.latitude)
                && (-123.3..=-123.0).contains(&coord.longitude)
        }
    }
}

/// Outcome of the catalogue path.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueResult {
    pub hit: Option<ZoningHit>,
    pub attempts: Vec<QueryAttempt>,
    pub assessment: ProviderResult<AssessmentRecord>,
}

#[derive(Debug, Clone)]
pub struct VancouverCatalogue {
    client: OpenDataClient,
    enrichment_timeout: Duration,
}

impl VancouverCatalogue {
    #[must_use]
    pub fn new(client: OpenDataClient, enrichment_timeout: Duration) -> Self {
        Self {
            client,
            enrichment_timeout,
        }
    }

    /// The label recorded as the zoning source.
    #[must_use]
    pub fn source_label(&self) -> String {
        format!("{}?dataset={ZONING_DATASET}", self.client.search_url())
    }

    /// Zoning search and assessment enrichment, run side by side.
    ///
    /// The zoning half is never held back by the assessment: once it
    /// settles, a still-running assessment is only awaited for a hit, and
    /// only until the enrichment timeout or `deadline`, whichever is first.
    pub async fn resolve(&self, coord: Coordinate, deadline: Option<Instant>) -> CatalogueResult {
        let started = Instant::now();
        let zoning = self.nearest_zoning(coord);
        let assessment = self.nearest_assessment(coord);
        tokio::pin!(zoning, assessment);

        let mut settled = None;
        let (hit, attempts) = loop {
            tokio::select! {
                found = &mut zoning => break found,
                result = &mut assessment, if settled.is_none() => settled = Some(result),
            }
        };

        let assessment = match settled {
            Some(result) => result,
            None if hit.is_none() => {
                ProviderResult::err("Assessment lookup skipped without a zoning hit")
            }
            None => {
                let enrichment_deadline = started + self.enrichment_timeout;
                let wait_until =
                    deadline.map_or(enrichment_deadline, |d| d.min(enrichment_deadline));
                if let Ok(result) = tokio::time::timeout_at(wait_until, assessment).await {
                    result
                } else {
                    tracing::debug!("assessment still pending, returning zoning without it");
                    ProviderResult::err(format!(
                        "Assessment lookup timed out after {}ms",
                        started.elapsed().as_millis()
                    ))
                }
            }
        };

        CatalogueResult {
            hit,
            attempts,
            assessment,
        }
    }

    async fn nearest_zoning(&self, coord: Coordinate) -> (Option<ZoningHit>, Vec<QueryAttempt>) {
        let mut attempts = Vec::new();
        let endpoint = self.source_label();

        for radius_m in SEARCH_RADII_M {
            let search = NearbySearch {
                dataset: ZONING_DATASET,
                center: coord,
                radius_m,
                fields: ZONING_FIELDS,
                rows: ROWS,
            };
            let geometry = format!("{},{},{radius_m}", coord.latitude, coord.longitude);
            let mut attempt = QueryAttempt {
                endpoint: endpoint.clone(),
                spatial_reference: SpatialReference::Wgs84,
                geometry_encoding: GeometryEncoding::PointPair,
                geometry,
                outcome: AttemptOutcome::NoMatch,
                http_status: None,
                error: None,
                raw_response: None,
            };

            let page = match self.client.search_nearby(&search).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::debug!(radius_m, error = %e, "vancouver zoning search failed");
                    attempt.outcome = AttemptOutcome::Failed;
                    attempt.http_status = e.http_status();
                    attempt.error = Some(e.to_string());
                    attempts.push(attempt);
                    continue;
                }
            };
            attempt.http_status = Some(page.status);

            let hit = page
                .nearest_within(MAX_DISTANCE_M)
                .map(|(distance, record)| (distance, zoning_hit(record, distance)));
            match hit {
                Some((_, Some(hit))) => {
                    attempt.outcome = AttemptOutcome::Hit;
                    attempt.raw_response = Some(page.raw);
                    attempts.push(attempt);
                    return (Some(hit), attempts);
                }
                Some((distance, None)) => {
                    tracing::debug!(radius_m, distance, "nearest zoning record has no code");
                    attempt.outcome = AttemptOutcome::Partial;
                }
                None => {}
            }
            attempt.raw_response = Some(page.raw);
            attempts.push(attempt);
        }

        (None, attempts)
    }

    async fn nearest_assessment(&self, coord: Coordinate) -> ProviderResult<AssessmentRecord> {
        let mut last_error = None;
        for radius_m in SEARCH_RADII_M {
            let search = NearbySearch {
                dataset: ASSESSMENT_DATASET,
                center: coord,
                radius_m,
                fields: ASSESSMENT_FIELDS,
                rows: ROWS,
            };
            match self.client.search_nearby(&search).await {
                Ok(page) => {
                    if let Some((distance, record)) = page.nearest_within(MAX_DISTANCE_M) {
                        return ProviderResult::ok(assessment_record(record, distance));
                    }
                }
                Err(e) => {
                    tracing::debug!(radius_m, error = %e, "assessment search failed");
                    last_error = Some(e.to_string());
                }
            }
        }
        ProviderResult::err(last_error.unwrap_or_else(|| {
            format!("no assessment record within {MAX_DISTANCE_M}m")
        }))
    }
}

/// Build a hit from the nearest zoning record, or `None` when it carries
/// neither a code nor a name.
#[must_use]
pub fn zoning_hit(record: &OpenDataRecord, distance_m: f64) -> Option<ZoningHit> {
    let code = pick_field(&record.fields, CODE_FIELDS);
    let name = pick_field(&record.fields, NAME_FIELDS).or_else(|| code.clone());
    if code.is_none() && name.is_none() {
        return None;
    }

    let mut attributes: AttributeMap = record.fields.clone();
    attributes.remove("geom");
    attributes.insert("_distance".to_string(), Value::from(distance_m));
    let (bylaw, docs) = match &code {
        Some(code) => {
            let encoded = utf8_percent_encode(code, COMPONENT);
            (
                format!("{BYLAW_PDF}#search={encoded}"),
                format!("{DOCUMENT_LIBRARY}?search={encoded}"),
            )
        }
        None => (BYLAW_PDF.to_string(), DOCUMENT_LIBRARY.to_string()),
    };
    attributes.insert("WEBLINK".to_string(), Value::String(bylaw));
    attributes.insert("WEBLINK_DOCS".to_string(), Value::String(docs));

    Some(ZoningHit {
        code,
        name,
        attributes,
        geometry: record.polygon(),
    })
}

#[must_use]
pub fn assessment_record(record: &OpenDataRecord, distance_m: f64) -> AssessmentRecord {
    let fields = &record.fields;
    let legal_lines: Vec<String> = ["narrative_legal_line1", "narrative_legal_line2"]
        .into_iter()
        .filter_map(|key| pick_field(fields, [key]))
        .collect();
    AssessmentRecord {
        distance_m,
        report_year: pick_field(fields, ["report_year", "tax_assessment_year"]),
        pid: pick_field(fields, ["pid"]),
        folio: pick_field(fields, ["folio"]),
        current_land_value: pick_field(fields, ["current_land_value"]),
        current_improvement_value: pick_field(fields, ["current_improvement_value"]),
        tax_levy: pick_field(fields, ["tax_levy"]),
        legal_description: if legal_lines.is_empty() {
            None
        } else {
            Some(legal_lines.join(" "))
        },
        fields: fields.clone(),
    }
}
