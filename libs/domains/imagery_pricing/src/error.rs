use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

use crate::models::{ResourceCategory, ResourceId};

/// Result type for estimation operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors raised while turning a request into a cost estimate
#[derive(Debug, Error)]
pub enum PricingError {
    /// Empty, degenerate or otherwise unusable geometry
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Nothing drawn or uploaded yet
    #[error("Either upload a GeoJSON or select the extent on the map")]
    MissingAreaOfInterest,

    #[error("Please select at least one resource type")]
    NoResourceSelected,

    #[error("Too many AI packs selected: {selected} (at most {limit} per request)")]
    TooManyAiPacks { selected: usize, limit: usize },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Area that reached the estimator without being positive
    #[error("Invalid area: {0} m² (must be positive)")]
    InvalidArea(f64),

    /// Catalog data produced an unusable cost
    #[error("Invalid pricing rule for {resource}: {reason}")]
    InvalidPricingRule { resource: ResourceId, reason: String },

    #[error("Invalid date range: {since} is after {until}")]
    InvalidDateRange { since: NaiveDate, until: NaiveDate },

    #[error("Invalid capture mode '{0}' (expected 'single' or 'all')")]
    InvalidCaptureMode(String),

    #[error("Pricing catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The blocking estimation task panicked or was cancelled
    #[error("Estimation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PricingError {
    /// Short machine-readable label, used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::Geometry(_) => "geometry",
            PricingError::MissingAreaOfInterest => "missing_area_of_interest",
            PricingError::NoResourceSelected => "no_resource_selected",
            PricingError::TooManyAiPacks { .. } => "too_many_ai_packs",
            PricingError::UnknownResource(_) => "unknown_resource",
            PricingError::InvalidArea(_) => "invalid_area",
            PricingError::InvalidPricingRule { .. } => "invalid_pricing_rule",
            PricingError::InvalidDateRange { .. } => "invalid_date_range",
            PricingError::InvalidCaptureMode(_) => "invalid_capture_mode",
            PricingError::Catalog(_) => "catalog",
            PricingError::Task(_) => "task",
        }
    }

    /// Faults an operator has to fix in the pricing data, as opposed to
    /// problems the user can correct in the request.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            PricingError::InvalidPricingRule { .. } | PricingError::Catalog(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PricingError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            e if e.is_configuration_fault() => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Errors raised while loading a pricing catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read pricing catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON or a record missing required fields
    #[error("Invalid pricing catalog: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("Unknown resource in pricing catalog: {0}")]
    UnknownResource(String),

    #[error("Category mismatch for {resource}: catalog declares {declared}, expected {expected}")]
    CategoryMismatch {
        resource: ResourceId,
        declared: ResourceCategory,
        expected: ResourceCategory,
    },

    #[error("Invalid all-captures multiplier {multiplier} for {resource} (must be greater than 1)")]
    InvalidMultiplier { resource: ResourceId, multiplier: f64 },
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            PricingError::Task(_) => {
                tracing::error!(error = %self, "Estimation task failed");
                "Internal server error".to_string()
            }
            e if e.is_configuration_fault() => {
                tracing::error!(error = %self, "Pricing configuration fault");
                "Pricing configuration error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
