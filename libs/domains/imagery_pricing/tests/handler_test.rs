//! Handler tests for the imagery pricing domain
//!
//! These tests verify that HTTP handlers work correctly:
//! - Request deserialization (JSON → Rust structs)
//! - Response serialization (Rust structs → JSON)
//! - HTTP status codes and error bodies

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_imagery_pricing::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For oneshot()

// Helper to parse JSON response body
async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn app() -> axum::Router {
    handlers::router(EstimationService::new(PricingCatalog::builtin().unwrap()))
}

fn post_estimate(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/estimate")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn sydney_block() -> Value {
    json!({
        "type": "Feature",
        "properties": { "name": "block" },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [151.200, -33.870],
                [151.205, -33.870],
                [151.205, -33.865],
                [151.200, -33.865],
                [151.200, -33.870]
            ]]
        }
    })
}

#[tokio::test]
async fn test_estimate_returns_breakdown() {
    let response = app()
        .oneshot(post_estimate(json!({
            "geometry": sydney_block(),
            "resources": ["raster:Vert", "aiPacks:pool"],
            "captureMode": "all",
            "since": "2024-03-01",
            "until": "2024-09-30"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let estimation: EstimationResponse = json_body(response.into_body()).await;
    assert_eq!(estimation.capture_mode, CaptureMode::AllCaptures);
    assert_eq!(estimation.breakdown.len(), 2);
    assert!(estimation.area_square_meters > 200_000.0);

    let vert = estimation
        .breakdown
        .iter()
        .find(|line| line.resource == ResourceId::Vert)
        .unwrap();
    assert_eq!(vert.category, ResourceCategory::Raster);
    let expected = 15.0 * estimation.area_square_meters / 1000.0;
    assert!((vert.credits - expected).abs() < 1e-6);

    let sum: f64 = estimation.breakdown.iter().map(|line| line.credits).sum();
    assert!((estimation.total_credits - sum).abs() < 1e-9);
}

#[tokio::test]
async fn test_estimate_with_dense_ring_finishes_quickly() {
    let vertices = 20_000;
    let mut ring: Vec<[f64; 2]> = (0..vertices)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / vertices as f64;
            [151.2 + 0.01 * angle.cos(), -33.87 + 0.01 * angle.sin()]
        })
        .collect();
    ring.push(ring[0]);

    let started = std::time::Instant::now();
    let response = app()
        .oneshot(post_estimate(json!({
            "geometry": { "type": "Polygon", "coordinates": [ring] },
            "resources": ["raster:Vert"]
        })))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        elapsed < std::time::Duration::from_secs(3),
        "dense ring took {elapsed:?}"
    );
}

#[tokio::test]
async fn test_estimate_without_geometry_returns_400() {
    let response = app()
        .oneshot(post_estimate(json!({ "resources": ["raster:Vert"] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["kind"], "missing_area_of_interest");
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("GeoJSON"));
}

#[tokio::test]
async fn test_estimate_with_too_many_ai_packs_returns_400() {
    let packs: Vec<&str> = ResourceId::all()
        .filter(|id| id.category() == ResourceCategory::AiPack)
        .take(8)
        .map(|id| id.as_str())
        .collect();

    let response = app()
        .oneshot(post_estimate(json!({
            "geometry": sydney_block(),
            "resources": packs
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["kind"], "too_many_ai_packs");
}

#[tokio::test]
async fn test_estimate_with_unknown_resource_returns_400() {
    let response = app()
        .oneshot(post_estimate(json!({
            "geometry": sydney_block(),
            "resources": ["raster:Infrared"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["kind"], "unknown_resource");
}

#[tokio::test]
async fn test_estimate_with_broken_pricing_returns_500() {
    let service = EstimationService::new(PricingCatalog::from_rules([(
        ResourceId::Vert,
        PricingRule::flat(-1.0, ResourceCategory::Raster),
    )]));

    let response = handlers::router(service)
        .oneshot(post_estimate(json!({
            "geometry": sydney_block(),
            "resources": ["raster:Vert"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = json_body(response.into_body()).await;
    assert_eq!(body["error"], "Pricing configuration error");
}

#[tokio::test]
async fn test_cost_table_lists_every_rule() {
    let request = Request::builder()
        .uri("/cost-table")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rows: Vec<CostTableRow> = json_body(response.into_body()).await;
    assert_eq!(rows.len(), ResourceId::all().count());

    let vert = rows.iter().find(|row| row.resource == ResourceId::Vert).unwrap();
    assert_eq!(vert.single_capture_credits, 10.0);
    assert_eq!(vert.all_captures_credits, 15.0);
}

#[tokio::test]
async fn test_resources_reports_pricing_coverage() {
    let service = EstimationService::new(PricingCatalog::from_rules([(
        ResourceId::Vert,
        PricingRule::flat(2.0, ResourceCategory::Raster),
    )]));
    let request = Request::builder()
        .uri("/resources")
        .body(Body::empty())
        .unwrap();

    let response = handlers::router(service).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let resources: Vec<ResourceInfo> = json_body(response.into_body()).await;
    assert_eq!(resources.len(), 27);
    assert_eq!(resources.iter().filter(|r| r.priced).count(), 1);
    assert!(
        resources
            .iter()
            .any(|r| r.resource == ResourceId::ImpactAssessmentPostCatastrophe
                && r.category == ResourceCategory::ImpactAssessment)
    );
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let response = app()
        .oneshot(post_estimate(json!({ "resources": "raster:Vert" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
