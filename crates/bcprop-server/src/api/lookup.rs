use axum::{
    extract::{Query, State},
    Extension, Json,
};
use bcprop_core::{Coordinate, Snapshot, ZoningOutcome};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_lookup_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct LookupQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub municipality: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ZoningQuery {
    pub lat: f64,
    pub lon: f64,
    pub municipality: Option<String>,
}

/// Snapshot by coordinate (`lat`, `lon`, optional `municipality`) or by
/// free-text `address`. A coordinate pair wins when both are given.
pub(super) async fn lookup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<ApiResponse<Snapshot>>, ApiError> {
    let municipality = non_blank(query.municipality.as_deref());
    let snapshot = match (query.lat, query.lon, non_blank(query.address.as_deref())) {
        (Some(lat), Some(lon), _) => {
            let coord = parse_coordinate(&req_id, lat, lon)?;
            state.service.lookup_coordinate(coord, municipality).await
        }
        (_, _, Some(address)) => state.service.lookup_address(address).await,
        _ => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "provide an address or both lat and lon",
            ))
        }
    }
    .map_err(|e| map_lookup_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: snapshot,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn zoning(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ZoningQuery>,
) -> Result<Json<ApiResponse<ZoningOutcome>>, ApiError> {
    let coord = parse_coordinate(&req_id, query.lat, query.lon)?;
    let outcome = state
        .service
        .zoning(coord, non_blank(query.municipality.as_deref()))
        .await
        .map_err(|e| map_lookup_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) fn parse_coordinate(
    req_id: &RequestId,
    lat: f64,
    lon: f64,
) -> Result<Coordinate, ApiError> {
    Coordinate::new(lat, lon)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))
}

pub(super) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
