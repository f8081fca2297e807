use chrono::NaiveDate;
use geojson::GeoJson;
use observability::EstimationMetrics;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::area::compute_area_square_meters;
use crate::catalog::{CatalogHandle, CostTableRow, PricingCatalog};
use crate::error::PricingResult;
use crate::estimator;
use crate::models::{EstimationRequest, EstimationResult};
use crate::validator;

/// Estimation request as it arrives at the boundary (HTTP body, CLI flags)
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateInput {
    /// GeoJSON Geometry, Feature or FeatureCollection of the area of interest
    #[schema(value_type = Option<Object>)]
    pub geometry: Option<GeoJson>,
    /// External resource identifiers, e.g. `raster:Vert`
    #[serde(default)]
    pub resources: Vec<String>,
    /// `single` (default) or `all`
    pub capture_mode: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// Runs estimations against the current pricing catalog
#[derive(Debug, Clone)]
pub struct EstimationService {
    catalog: CatalogHandle,
}

impl EstimationService {
    pub fn new(catalog: impl Into<CatalogHandle>) -> Self {
        Self {
            catalog: catalog.into(),
        }
    }

    /// Handle used for hot reloads
    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    /// Estimate the credit cost of `request`.
    ///
    /// The whole estimation prices against one catalog snapshot, so a
    /// concurrent reload never produces a mixed result.
    pub fn estimate(&self, request: &EstimationRequest) -> PricingResult<EstimationResult> {
        let started = Instant::now();
        let catalog = self.catalog.current();

        match Self::run(request, &catalog) {
            Ok(result) => {
                EstimationMetrics::record_estimation(
                    &result.capture_mode.to_string(),
                    result.breakdown.len(),
                    result.area_square_meters,
                    result.total_credits,
                    started.elapsed(),
                );
                info!(
                    area_square_meters = result.area_square_meters,
                    resources = result.breakdown.len(),
                    capture_mode = %result.capture_mode,
                    total_credits = result.total_credits,
                    "Estimate computed"
                );
                Ok(result)
            }
            Err(e) => {
                EstimationMetrics::record_rejection(e.kind(), started.elapsed());
                if e.is_configuration_fault() {
                    warn!(error = %e, "Estimate failed on pricing data");
                } else {
                    debug!(error = %e, "Estimate rejected");
                }
                Err(e)
            }
        }
    }

    fn run(request: &EstimationRequest, catalog: &PricingCatalog) -> PricingResult<EstimationResult> {
        // Selection problems are reported before anything about the geometry.
        validator::validate(&request.resources, catalog)?;
        let area = compute_area_square_meters(&request.area_of_interest)?;
        estimator::estimate(request, area, catalog)
    }

    /// Convert a boundary DTO and estimate it
    pub fn estimate_input(&self, input: EstimateInput) -> PricingResult<EstimationResult> {
        let started = Instant::now();
        match Self::request_from_input(input) {
            Ok(request) => self.estimate(&request),
            Err(e) => {
                EstimationMetrics::record_rejection(e.kind(), started.elapsed());
                debug!(error = %e, "Estimate input rejected");
                Err(e)
            }
        }
    }

    fn request_from_input(input: EstimateInput) -> PricingResult<EstimationRequest> {
        EstimationRequest::parse(
            input.geometry.as_ref(),
            &input.resources,
            input.capture_mode.as_deref(),
            input.since,
            input.until,
        )
    }

    /// Snapshot of the current cost table
    pub fn cost_table(&self) -> Vec<CostTableRow> {
        self.catalog.current().cost_table()
    }

    pub fn current_catalog(&self) -> Arc<PricingCatalog> {
        self.catalog.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::tests::square_around;
    use crate::error::PricingError;
    use crate::models::{CaptureMode, PricingRule, ResourceCategory, ResourceId};

    fn service() -> EstimationService {
        EstimationService::new(PricingCatalog::builtin().unwrap())
    }

    fn polygon_geojson() -> GeoJson {
        r#"{"type":"Polygon","coordinates":[[[151.20,-33.87],[151.21,-33.87],[151.21,-33.86],[151.20,-33.86],[151.20,-33.87]]]}"#
            .parse()
            .unwrap()
    }

    #[test]
    fn test_builtin_vertical_per_square_kilometer() {
        let aoi = square_around(-97.74, 30.27, 1000.0);
        let single = service()
            .estimate(&EstimationRequest::new(
                aoi.clone(),
                [ResourceId::Vert],
                CaptureMode::SingleCapture,
            ))
            .unwrap();
        let all = service()
            .estimate(&EstimationRequest::new(
                aoi,
                [ResourceId::Vert],
                CaptureMode::AllCaptures,
            ))
            .unwrap();

        assert!((single.total_credits - 10_000.0).abs() < 0.1);
        assert!((all.total_credits - 15_000.0).abs() < 0.15);
        assert_eq!(single.rounded_total(), 10_000);
    }

    #[test]
    fn test_estimate_input_from_geojson() {
        let result = service()
            .estimate_input(EstimateInput {
                geometry: Some(polygon_geojson()),
                resources: vec!["raster:Vert".into(), "aiPacks:solar".into()],
                capture_mode: Some("all".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(result.capture_mode, CaptureMode::AllCaptures);
        assert_eq!(result.breakdown.len(), 2);
        assert!(result.total_credits > 0.0);
    }

    #[test]
    fn test_missing_geometry_is_an_error_value() {
        let err = service()
            .estimate_input(EstimateInput {
                resources: vec!["raster:Vert".into()],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PricingError::MissingAreaOfInterest));
    }

    #[test]
    fn test_empty_selection_wins_over_bad_geometry() {
        let bad: GeoJson = r#"{"type":"Point","coordinates":[0.0,0.0]}"#.parse().unwrap();
        let err = service()
            .estimate_input(EstimateInput {
                geometry: Some(bad),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PricingError::NoResourceSelected));
    }

    #[test]
    fn test_estimate_uses_replaced_catalog() {
        let service = service();
        service.catalog().replace(PricingCatalog::from_rules([(
            ResourceId::Vert,
            PricingRule::flat(1.0, ResourceCategory::Raster),
        )]));

        let result = service
            .estimate(&EstimationRequest::new(
                square_around(2.35, 48.85, 100.0),
                [ResourceId::Vert],
                CaptureMode::AllCaptures,
            ))
            .unwrap();
        assert!((result.total_credits - 10.0).abs() < 1e-3);
        assert_eq!(service.cost_table().len(), 1);
    }
}
