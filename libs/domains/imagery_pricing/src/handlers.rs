//! HTTP handlers for imagery cost estimation

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::catalog::CostTableRow;
use crate::error::PricingResult;
use crate::models::{CaptureMode, EstimationResult, ResourceCategory, ResourceId};
use crate::service::{EstimateInput, EstimationService};

const TAG: &str = "estimation";

/// OpenAPI documentation for the estimation API
#[derive(OpenApi)]
#[openapi(
    paths(estimate, cost_table, list_resources),
    components(schemas(
        EstimateInput,
        EstimationResponse,
        LineItem,
        CostTableRow,
        ResourceInfo,
        ResourceId,
        ResourceCategory,
        CaptureMode,
        ErrorBody,
    )),
    tags((name = TAG, description = "Imagery credit cost estimation"))
)]
pub struct ApiDoc;

/// Credit cost of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub resource: ResourceId,
    pub category: ResourceCategory,
    pub credits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimationResponse {
    pub area_square_meters: f64,
    pub capture_mode: CaptureMode,
    pub total_credits: f64,
    /// Sum of the per-resource costs, each rounded to whole credits
    pub rounded_total_credits: u64,
    pub breakdown: Vec<LineItem>,
}

impl From<EstimationResult> for EstimationResponse {
    fn from(result: EstimationResult) -> Self {
        let rounded_total_credits = result.rounded_total();
        Self {
            area_square_meters: result.area_square_meters,
            capture_mode: result.capture_mode,
            total_credits: result.total_credits,
            rounded_total_credits,
            breakdown: result
                .breakdown
                .into_iter()
                .map(|(resource, credits)| LineItem {
                    resource,
                    category: resource.category(),
                    credits,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub resource: ResourceId,
    pub category: ResourceCategory,
    /// Whether the current catalog has a price for it
    pub priced: bool,
}

/// Error payload returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    pub code: u16,
}

/// Create the estimation router
pub fn router(service: EstimationService) -> Router {
    Router::new()
        .route("/estimate", post(estimate))
        .route("/cost-table", get(cost_table))
        .route("/resources", get(list_resources))
        .with_state(Arc::new(service))
}

/// Estimate the credit cost of a request
#[utoipa::path(
    post,
    path = "/estimate",
    tag = TAG,
    request_body = EstimateInput,
    responses(
        (status = 200, description = "Estimated cost", body = EstimationResponse),
        (status = 400, description = "Invalid geometry or selection", body = ErrorBody),
        (status = 500, description = "Pricing configuration error", body = ErrorBody)
    )
)]
async fn estimate(
    State(service): State<Arc<EstimationService>>,
    Json(input): Json<EstimateInput>,
) -> PricingResult<Json<EstimationResponse>> {
    // Geometry checks and measurement grow with the vertex count
    let result = tokio::task::spawn_blocking(move || service.estimate_input(input)).await??;
    Ok(Json(result.into()))
}

/// Credits per 1000 m² of every priced resource
#[utoipa::path(
    get,
    path = "/cost-table",
    tag = TAG,
    responses((status = 200, description = "Cost table", body = Vec<CostTableRow>))
)]
async fn cost_table(State(service): State<Arc<EstimationService>>) -> Json<Vec<CostTableRow>> {
    Json(service.cost_table())
}

/// Every known resource identifier
#[utoipa::path(
    get,
    path = "/resources",
    tag = TAG,
    responses((status = 200, description = "Resource identifiers", body = Vec<ResourceInfo>))
)]
async fn list_resources(State(service): State<Arc<EstimationService>>) -> Json<Vec<ResourceInfo>> {
    let catalog = service.current_catalog();
    let resources = ResourceId::all()
        .map(|resource| ResourceInfo {
            resource,
            category: resource.category(),
            priced: catalog.contains(resource),
        })
        .collect();
    Json(resources)
}
