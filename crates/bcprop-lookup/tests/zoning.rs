//! Zoning engine behaviour against mocked feature services.

use std::sync::Arc;
use std::time::Duration;

use bcprop_arcgis::{OpenDataClient, SpatialQueryClient};
use bcprop_core::{AttemptOutcome, Coordinate, GeometryEncoding, SpatialReference, ZoningOutcome};
use bcprop_lookup::zoning::vancouver::VancouverCatalogue;
use bcprop_lookup::zoning::NO_ZONING_FOUND;
use bcprop_lookup::{ZoningEngine, ZoningSourceTable};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn burnaby() -> Coordinate {
    Coordinate::new(49.2488, -122.9805).unwrap()
}

fn downtown_vancouver() -> Coordinate {
    Coordinate::new(49.2827, -123.1207).unwrap()
}

/// A Burnaby entry whose endpoints are the given layers on the mock server.
fn burnaby_table(server: &MockServer, layers: &[u32]) -> Arc<ZoningSourceTable> {
    let endpoints: String = layers
        .iter()
        .map(|layer| {
            format!(
                "      - service_url: {}/burnaby/MapServer\n        layer_id: {layer}\n",
                server.uri()
            )
        })
        .collect();
    let yaml = format!(
        "sources:\n  - name: Burnaby\n    preferred_sr: \"26910\"\n    endpoints:\n{endpoints}"
    );
    Arc::new(ZoningSourceTable::from_yaml_str(&yaml).expect("valid test table"))
}

fn engine(table: Arc<ZoningSourceTable>) -> ZoningEngine {
    let client = SpatialQueryClient::new(5, "bcprop-test/0.1").expect("client");
    ZoningEngine::new(client, table, None)
}

fn features(attributes: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "features": [{ "attributes": attributes }] }))
}

fn no_features() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "features": [] }))
}

#[tokio::test]
async fn exhausted_ladder_records_projected_then_wgs84_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/42/query"))
        .respond_with(no_features())
        .expect(4)
        .mount(&server)
        .await;

    let outcome = engine(burnaby_table(&server, &[42]))
        .resolve(burnaby(), Some("Burnaby"))
        .await;

    let ZoningOutcome::NotFound {
        error, attempts, ..
    } = outcome
    else {
        panic!("expected not found, got {outcome:?}");
    };
    assert_eq!(error, NO_ZONING_FOUND);
    let order: Vec<(SpatialReference, GeometryEncoding)> = attempts
        .iter()
        .map(|a| (a.spatial_reference, a.geometry_encoding))
        .collect();
    assert_eq!(
        order,
        vec![
            (SpatialReference::Utm10N, GeometryEncoding::JsonObject),
            (SpatialReference::Utm10N, GeometryEncoding::PointPair),
            (SpatialReference::Wgs84, GeometryEncoding::JsonObject),
            (SpatialReference::Wgs84, GeometryEncoding::PointPair),
        ]
    );
    assert!(attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::NoMatch && a.http_status == Some(200)));
    assert_eq!(attempts[3].geometry, "-122.9805,49.2488");
}

#[tokio::test]
async fn first_usable_code_stops_before_second_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/42/query"))
        .respond_with(features(json!({ "ZONECODE": "R5", "CD_ZONE": "Residential" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/60/query"))
        .respond_with(features(json!({ "ZONECODE": "RM3" })))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = engine(burnaby_table(&server, &[42, 60]))
        .resolve(burnaby(), Some("Burnaby"))
        .await;

    let ZoningOutcome::Found {
        hit,
        source,
        attempts,
        assessment,
    } = outcome
    else {
        panic!("expected a hit, got {outcome:?}");
    };
    assert_eq!(hit.code.as_deref(), Some("R5"));
    assert_eq!(hit.name.as_deref(), Some("Residential"));
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Hit);
    assert!(source.ends_with("/burnaby/MapServer/42/query"));
    assert!(assessment.is_none());
}

#[tokio::test]
async fn parcel_layer_attributes_merge_under_zoning_hit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/60/query"))
        .respond_with(features(json!({ "ROLL_NUMBER": "03410123", "ZONECODE": null })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/42/query"))
        .respond_with(features(json!({ "ZONECODE": "RM3" })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = engine(burnaby_table(&server, &[60, 42]))
        .resolve(burnaby(), Some("City of Burnaby"))
        .await;

    let attempts = outcome.attempts().to_vec();
    let hit = outcome.hit().expect("zoning hit");
    assert_eq!(hit.code.as_deref(), Some("RM3"));
    assert_eq!(hit.attributes["ROLL_NUMBER"], "03410123");
    assert_eq!(hit.attributes["ZONECODE"], "RM3");
    assert_eq!(
        attempts.iter().map(|a| a.outcome).collect::<Vec<_>>(),
        vec![AttemptOutcome::Partial, AttemptOutcome::Hit]
    );
}

#[tokio::test]
async fn failed_attempts_are_recorded_and_ladder_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/42/query"))
        .and(query_param("inSR", "26910"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/42/query"))
        .and(query_param("inSR", "4326"))
        .respond_with(features(json!({ "ZONING": "C2" })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = engine(burnaby_table(&server, &[42]))
        .resolve(burnaby(), Some("Burnaby"))
        .await;

    let attempts = outcome.attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Failed);
    assert_eq!(attempts[0].http_status, Some(500));
    assert!(attempts[0].error.is_some());
    assert_eq!(attempts[2].outcome, AttemptOutcome::Hit);
    assert_eq!(outcome.hit().and_then(|h| h.code.as_deref()), Some("C2"));
}

#[tokio::test]
async fn service_error_body_counts_as_failed_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/burnaby/MapServer/42/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 400, "message": "Invalid or missing input parameters." }
        })))
        .mount(&server)
        .await;

    let outcome = engine(burnaby_table(&server, &[42]))
        .resolve(burnaby(), Some("Burnaby"))
        .await;

    assert!(matches!(outcome, ZoningOutcome::NotFound { .. }));
    assert!(outcome.attempts().iter().all(|a| {
        a.outcome == AttemptOutcome::Failed
            && a.error
                .as_deref()
                .is_some_and(|e| e.contains("Invalid or missing input parameters."))
    }));
}

#[tokio::test]
async fn unconfigured_municipality_is_unsupported_without_requests() {
    let server = MockServer::start().await;

    let outcome = engine(burnaby_table(&server, &[42]))
        .resolve(burnaby(), Some("Richmond"))
        .await;

    assert!(matches!(
        outcome,
        ZoningOutcome::Unsupported { ref municipality, .. } if municipality.as_deref() == Some("Richmond")
    ));
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

fn catalogue(server: &MockServer) -> VancouverCatalogue {
    let client = OpenDataClient::from_client(
        reqwest::Client::new(),
        &format!("{}/opendata/search/", server.uri()),
    )
    .expect("valid search url");
    VancouverCatalogue::new(client, Duration::from_millis(500))
}

#[tokio::test]
async fn vancouver_resolves_from_catalogue_with_assessment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opendata/search/"))
        .and(query_param("dataset", "zoning-districts-and-labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                { "fields": { "zoning_district": "DD", "zoning_classification": "Downtown", "_distance": "12.5" } },
                { "fields": { "zoning_district": "CD-1", "_distance": "40.1" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/opendata/search/"))
        .and(query_param("dataset", "property-tax-report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{ "fields": { "pid": "027-123-456", "current_land_value": 4_200_000, "_distance": 8 } }]
        })))
        .mount(&server)
        .await;

    let client = SpatialQueryClient::new(5, "bcprop-test/0.1").expect("client");
    let engine = ZoningEngine::new(client, burnaby_table(&server, &[42]), Some(catalogue(&server)));
    let outcome = engine
        .resolve(downtown_vancouver(), Some("Vancouver"))
        .await;

    let ZoningOutcome::Found {
        hit,
        source,
        attempts,
        assessment,
    } = outcome
    else {
        panic!("expected catalogue hit, got {outcome:?}");
    };
    assert_eq!(hit.code.as_deref(), Some("DD"));
    assert_eq!(hit.name.as_deref(), Some("Downtown"));
    assert!(source.ends_with("?dataset=zoning-districts-and-labels"));
    assert_eq!(attempts.len(), 1);
    let assessment = assessment.expect("assessment attached");
    let record = assessment.value.expect("assessment record");
    assert_eq!(record.pid.as_deref(), Some("027-123-456"));
    assert!((record.distance_m - 8.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn vancouver_miss_without_table_entry_is_not_found_with_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opendata/search/"))
        .and(query_param("dataset", "zoning-districts-and-labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/opendata/search/"))
        .and(query_param("dataset", "property-tax-report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
        .mount(&server)
        .await;

    let client = SpatialQueryClient::new(5, "bcprop-test/0.1").expect("client");
    let engine = ZoningEngine::new(client, burnaby_table(&server, &[42]), Some(catalogue(&server)));
    let outcome = engine.resolve(downtown_vancouver(), None).await;

    assert_eq!(outcome.error(), Some(NO_ZONING_FOUND));
    let radii: Vec<&str> = outcome
        .attempts()
        .iter()
        .map(|a| a.geometry.rsplit(',').next().unwrap_or_default())
        .collect();
    assert_eq!(radii, vec!["25", "50", "100", "200"]);
}

#[tokio::test]
async fn catalogue_hit_is_not_held_back_by_a_hanging_assessment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opendata/search/"))
        .and(query_param("dataset", "zoning-districts-and-labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{ "fields": { "zoning_district": "RT-7", "_distance": 3 } }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/opendata/search/"))
        .and(query_param("dataset", "property-tax-report"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "records": [] }))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = SpatialQueryClient::new(5, "bcprop-test/0.1").expect("client");
    let engine = ZoningEngine::new(client, burnaby_table(&server, &[42]), Some(catalogue(&server)));
    let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
    let started = std::time::Instant::now();
    let outcome = engine
        .resolve_by(downtown_vancouver(), Some("Vancouver"), Some(deadline))
        .await;

    // The deadline is earlier than the catalogue's 500ms enrichment timeout.
    assert!(started.elapsed() < Duration::from_millis(450));
    assert_eq!(outcome.hit().and_then(|h| h.code.as_deref()), Some("RT-7"));
    let ZoningOutcome::Found { assessment, .. } = outcome else {
        panic!("expected catalogue hit");
    };
    assert!(assessment.and_then(|a| a.error).is_some());
}
