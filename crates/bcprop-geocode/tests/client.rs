//! Integration tests for `NominatimClient` using wiremock HTTP mocks.

use std::sync::Arc;
use std::time::Duration;

use bcprop_geocode::{GeocodeCache, GeocodeError, NominatimClient, RateLimiter};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> NominatimClient {
    NominatimClient::new(
        &format!("{}/search", server.uri()),
        5,
        "bcprop-test/0.1",
        Arc::new(RateLimiter::new(Duration::ZERO)),
    )
    .expect("client construction should not fail")
    .with_cache(Arc::new(GeocodeCache::new(Duration::from_secs(60))))
    .with_retries(1, 0)
}

fn burnaby_place() -> serde_json::Value {
    json!([{
        "lat": "49.2488",
        "lon": "-122.9805",
        "display_name": "4949, Canada Way, Burnaby, Metro Vancouver, British Columbia",
        "address": { "city": "Burnaby", "state": "British Columbia" }
    }])
}

#[tokio::test]
async fn geocode_address_sends_normalized_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "4949 Canada Way, Burnaby, BC"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .and(query_param("addressdetails", "1"))
        .and(query_param("accept-language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(burnaby_place()))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_client(&server)
        .geocode_address("  4949 Canada Way,  Burnaby british columbia")
        .await
        .expect("geocode should succeed");

    assert_eq!(result.address, "4949 Canada Way, Burnaby, BC");
    assert_eq!(result.city.as_deref(), Some("Burnaby"));
    assert!((result.coordinate.longitude - -122.9805).abs() < 1e-9);
}

#[tokio::test]
async fn geocode_address_is_served_from_cache_on_repeat() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(burnaby_place()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let first = client
        .geocode_address("4949 Canada Way, Burnaby, BC")
        .await
        .unwrap();
    let second = client
        .geocode_address("4949 canada way, burnaby bc")
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn geocode_address_with_no_results_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .geocode_address("1 Nowhere Lane")
        .await
        .unwrap_err();

    assert!(matches!(err, GeocodeError::NoResults { ref query } if query == "1 Nowhere Lane"));
}

#[tokio::test]
async fn geocode_address_rejects_blank_input_without_calling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(burnaby_place()))
        .expect(0)
        .mount(&server)
        .await;

    let err = test_client(&server).geocode_address("   ").await.unwrap_err();
    assert!(matches!(err, GeocodeError::EmptyQuery));
}

#[tokio::test]
async fn geocode_address_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = test_client(&server)
        .geocode_address("4949 Canada Way, Burnaby, BC")
        .await
        .unwrap_err();

    assert!(matches!(err, GeocodeError::UnexpectedStatus { status: 503, .. }));
}

#[tokio::test]
async fn rate_limited_response_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client(&server).with_retries(0, 0);
    let err = client
        .geocode_address("4949 Canada Way, Burnaby, BC")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GeocodeError::RateLimited {
            retry_after_secs: None
        }
    ));
}

#[tokio::test]
async fn suggestions_return_up_to_five_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "lat": "49.2827", "lon": "-123.1207", "display_name": "Granville Street, Vancouver British Columbia" },
            { "lat": "49.1913", "lon": "-122.849", "display_name": "King George Blvd, Surrey, BC" }
        ])))
        .mount(&server)
        .await;

    let suggestions = test_client(&server)
        .search_suggestions("granville")
        .await
        .unwrap();

    assert_eq!(suggestions.len(), 2);
    assert_eq!(
        suggestions[0].address,
        "Granville Street, Vancouver, BC"
    );
    assert!(suggestions.iter().all(|s| s.city.is_none()));
}

#[tokio::test]
async fn suggestions_swallow_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let suggestions = test_client(&server)
        .search_suggestions("granville")
        .await
        .unwrap();

    assert!(suggestions.is_empty());
}

#[tokio::test]
async fn blank_suggestion_query_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let suggestions = test_client(&server).search_suggestions("  ").await.unwrap();
    assert!(suggestions.is_empty());
}
