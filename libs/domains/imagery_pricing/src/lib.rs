//! Imagery Pricing Domain
//!
//! Estimates the credit cost of an aerial imagery request: an area of
//! interest, a set of resources (rasters, AI packs, ...) and a capture mode.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Service   │  ← Orchestration, logging, metrics
//! └──────┬──────┘
//!        │
//! ┌──────▼──────────────────────────────┐
//! │ Area → Validator → Estimator        │  ← Pure computations
//! └──────┬──────────────────────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Catalog   │  ← Immutable pricing rules, hot-swappable
//! └─────────────┘
//! ```

pub mod area;
pub mod catalog;
pub mod error;
pub mod estimator;
pub mod handlers;
pub mod models;
pub mod service;
pub mod validator;

// Re-export commonly used types
pub use area::{AreaOfInterest, compute_area_square_meters};
pub use catalog::{CatalogHandle, CostTableRow, PricingCatalog};
pub use error::{CatalogError, PricingError, PricingResult};
pub use estimator::estimate;
pub use handlers::{ApiDoc, EstimationResponse, LineItem, ResourceInfo};
pub use models::{
    CaptureMode, DateRange, EstimationRequest, EstimationResult, PricingRule, ResourceCategory,
    ResourceId,
};
pub use service::{EstimateInput, EstimationService};
pub use validator::{MAX_AI_PACKS, validate};
