use axum::{
    extract::{Query, State},
    Extension, Json,
};
use bcprop_lookup::{OcpCity, OcpResult};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::lookup::parse_coordinate;
use super::{map_lookup_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct OcpQuery {
    pub city: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

pub(super) async fn lookup_ocp(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OcpQuery>,
) -> Result<Json<ApiResponse<OcpResult>>, ApiError> {
    let city: OcpCity = query
        .city
        .parse()
        .map_err(|e| map_lookup_error(req_id.0.clone(), &e))?;
    let coord = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some(parse_coordinate(&req_id, lat, lng)?),
        _ => None,
    };

    let result = state
        .service
        .ocp(city, coord)
        .await
        .map_err(|e| map_lookup_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: result,
        meta: ResponseMeta::new(req_id.0),
    }))
}
