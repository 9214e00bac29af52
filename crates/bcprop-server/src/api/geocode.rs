use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_lookup_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SuggestQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SuggestionItem {
    pub address: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub(super) async fn suggest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<ApiResponse<Vec<SuggestionItem>>>, ApiError> {
    let q = query.q.unwrap_or_default();
    let results = state
        .service
        .suggest(&q)
        .await
        .map_err(|e| map_lookup_error(req_id.0.clone(), &e))?;

    let data = results
        .into_iter()
        .map(|r| SuggestionItem {
            address: r.address,
            display_name: r.display_name,
            latitude: r.coordinate.latitude,
            longitude: r.coordinate.longitude,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
