//! Zoning resolution: source selection, the encoding ladder, and the
//! Vancouver catalogue special case.

pub mod ladder;
pub mod vancouver;

use std::sync::Arc;

use bcprop_arcgis::{PointGeometry, PointQueryResult, SpatialQueryClient};
use bcprop_core::{
    pick_field, project, AttemptOutcome, AttributeMap, Coordinate, QueryAttempt,
    SpatialReference, ZoningHit, ZoningOutcome,
};

use tokio::time::Instant;

use crate::sources::{ZoningSource, ZoningSourceTable};
use ladder::build_ladder;
use vancouver::{is_city_of_vancouver, VancouverCatalogue};

pub const NO_ZONING_FOUND: &str = "no zoning found at this point";
pub const UNSUPPORTED_MUNICIPALITY: &str = "zoning lookup unavailable for this municipality";

#[derive(Debug, Clone)]
pub struct ZoningEngine {
    client: SpatialQueryClient,
    sources: Arc<ZoningSourceTable>,
    vancouver: Option<VancouverCatalogue>,
}

impl ZoningEngine {
    /// `vancouver` is optional so the table-driven path can run on its own.
    #[must_use]
    pub fn new(
        client: SpatialQueryClient,
        sources: Arc<ZoningSourceTable>,
        vancouver: Option<VancouverCatalogue>,
    ) -> Self {
        Self {
            client,
            sources,
            vancouver,
        }
    }

    #[must_use]
    pub fn sources(&self) -> &ZoningSourceTable {
        &self.sources
    }

    /// Resolve zoning at `coord`, using `municipality` to pick the source.
    ///
    /// Never fails: transport errors become attempt diagnostics and an
    /// exhausted ladder is a [`ZoningOutcome::NotFound`].
    pub async fn resolve(&self, coord: Coordinate, municipality: Option<&str>) -> ZoningOutcome {
        self.resolve_by(coord, municipality, None).await
    }

    /// Like [`ZoningEngine::resolve`], but optional enrichment stops waiting
    /// at `deadline` so a found record is returned before the caller gives up.
    pub async fn resolve_by(
        &self,
        coord: Coordinate,
        municipality: Option<&str>,
        deadline: Option<Instant>,
    ) -> ZoningOutcome {
        let mut prior_attempts = Vec::new();
        let mut prior_source = None;

        if let Some(catalogue) = &self.vancouver {
            if is_city_of_vancouver(municipality, coord) {
                let result = catalogue.resolve(coord, deadline).await;
                if let Some(hit) = result.hit {
                    tracing::info!(code = ?hit.code, "zoning resolved from vancouver catalogue");
                    return ZoningOutcome::Found {
                        hit,
                        source: catalogue.source_label(),
                        attempts: result.attempts,
                        assessment: Some(result.assessment),
                    };
                }
                prior_attempts = result.attempts;
                prior_source = Some(catalogue.source_label());
            }
        }

        let Some(source) = municipality.and_then(|m| self.sources.select(m)) else {
            if prior_attempts.is_empty() {
                tracing::debug!(municipality = ?municipality, "no zoning source configured");
                return ZoningOutcome::Unsupported {
                    error: UNSUPPORTED_MUNICIPALITY.to_string(),
                    municipality: municipality.map(str::to_string),
                };
            }
            return ZoningOutcome::NotFound {
                error: NO_ZONING_FOUND.to_string(),
                source: prior_source,
                partial: None,
                attempts: prior_attempts,
            };
        };

        self.run_ladder(source, coord, prior_attempts).await
    }

    /// Walk the ladder for one configured source, stopping at the first
    /// attempt that yields a code or name.
    async fn run_ladder(
        &self,
        source: &ZoningSource,
        coord: Coordinate,
        mut attempts: Vec<QueryAttempt>,
    ) -> ZoningOutcome {
        let projected = source
            .preferred_reference()
            .filter(|sr| *sr != SpatialReference::Wgs84)
            .and_then(|_| match project(coord) {
                Ok(p) => Some(PointGeometry::projected(p)),
                Err(e) => {
                    tracing::warn!(error = %e, "reprojection failed, using WGS84 only");
                    None
                }
            });
        let ladder = build_ladder(
            source.endpoints.len(),
            projected.map(|p| p.spatial_reference),
        );

        let code_aliases = source.code_aliases();
        let name_aliases = source.name_aliases();
        let mut partial: Option<AttributeMap> = None;
        let mut exhausted_endpoint = None;
        let mut last_source = None;

        for step in ladder {
            if exhausted_endpoint == Some(step.endpoint) {
                continue;
            }
            let point = match (step.spatial_reference, projected) {
                (SpatialReference::Wgs84, _) => PointGeometry::wgs84(coord),
                (_, Some(p)) => p,
                (_, None) => continue,
            };
            let config = source.endpoints[step.endpoint].query_config();
            let endpoint = config.query_url();
            last_source = Some(endpoint.clone());

            let mut attempt = QueryAttempt {
                endpoint: endpoint.clone(),
                spatial_reference: step.spatial_reference,
                geometry_encoding: step.encoding,
                geometry: point.encode(step.encoding),
                outcome: AttemptOutcome::NoMatch,
                http_status: None,
                error: None,
                raw_response: None,
            };

            let PointQueryResult {
                attributes,
                geometry,
                raw,
                status,
            } = match self.client.query_geometry(&config, &point, step.encoding).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::debug!(
                        endpoint = %endpoint,
                        spatial_reference = %step.spatial_reference,
                        error = %e,
                        "zoning attempt failed"
                    );
                    attempt.outcome = AttemptOutcome::Failed;
                    attempt.http_status = e.http_status();
                    attempt.error = Some(e.to_string());
                    attempts.push(attempt);
                    continue;
                }
            };
            attempt.http_status = Some(status);
            attempt.raw_response = Some(raw);

            let Some(attrs) = attributes else {
                tracing::debug!(
                    endpoint = %endpoint,
                    spatial_reference = %step.spatial_reference,
                    "zoning attempt returned no features"
                );
                attempts.push(attempt);
                continue;
            };

            let code = pick_field(&attrs, &code_aliases);
            let name = pick_field(&attrs, &name_aliases);
            if code.is_none() && name.is_none() {
                attempt.outcome = AttemptOutcome::Partial;
                attempts.push(attempt);
                partial.get_or_insert_with(AttributeMap::new).extend(attrs);
                exhausted_endpoint = Some(step.endpoint);
                continue;
            }

            attempt.outcome = AttemptOutcome::Hit;
            attempts.push(attempt);
            let mut merged = partial.unwrap_or_default();
            merged.extend(attrs);
            tracing::info!(
                municipality = %source.name,
                code = ?code,
                attempts = attempts.len(),
                "zoning resolved"
            );
            return ZoningOutcome::Found {
                hit: ZoningHit {
                    code,
                    name,
                    attributes: merged,
                    geometry,
                },
                source: endpoint,
                attempts,
                assessment: None,
            };
        }

        ZoningOutcome::NotFound {
            error: NO_ZONING_FOUND.to_string(),
            source: last_source,
            partial,
            attempts,
        }
    }
}
