//! Pricing catalog: resource identifier → pricing rule.
//!
//! A catalog is built once and never mutated. Hot reloads go through
//! [`CatalogHandle`], which swaps in a complete replacement so an estimation
//! always prices against a single consistent snapshot.

use arc_swap::ArcSwap;
use observability::EstimationMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{CatalogError, PricingError, PricingResult};
use crate::models::{CaptureMode, PricingRule, ResourceCategory, ResourceId};

/// Published cost table of the provider
const BUILTIN_COST_TABLE: &str = include_str!("../data/cost_table.json");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingCatalog {
    rules: BTreeMap<ResourceId, PricingRule>,
}

impl PricingCatalog {
    /// Catalog from already-built rules, without load-time checks
    pub fn from_rules(rules: impl IntoIterator<Item = (ResourceId, PricingRule)>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Parse a JSON object keyed by external resource identifier.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let records: BTreeMap<String, PricingRule> = serde_json::from_str(json)?;

        let mut rules = BTreeMap::new();
        for (key, rule) in records {
            let resource = ResourceId::from_str(key.trim())
                .map_err(|_| CatalogError::UnknownResource(key.clone()))?;

            let expected = resource.category();
            if rule.category != expected {
                return Err(CatalogError::CategoryMismatch {
                    resource,
                    declared: rule.category,
                    expected,
                });
            }

            if rule.captures_aware
                && !(rule.all_captures_multiplier.is_finite() && rule.all_captures_multiplier > 1.0)
            {
                return Err(CatalogError::InvalidMultiplier {
                    resource,
                    multiplier: rule.all_captures_multiplier,
                });
            }

            rules.insert(resource, rule);
        }

        Ok(Self { rules })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Cost table bundled with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_COST_TABLE)
    }

    pub fn lookup(&self, resource: ResourceId) -> PricingResult<&PricingRule> {
        self.rules
            .get(&resource)
            .ok_or_else(|| PricingError::UnknownResource(resource.to_string()))
    }

    pub fn contains(&self, resource: ResourceId) -> bool {
        self.rules.contains_key(&resource)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &PricingRule)> {
        self.rules.iter().map(|(id, rule)| (*id, rule))
    }

    /// Rows of the "see cost table" view
    pub fn cost_table(&self) -> Vec<CostTableRow> {
        self.iter()
            .map(|(resource, rule)| CostTableRow {
                resource,
                category: rule.category,
                content_type: rule.content_type.clone(),
                single_capture_credits: rule.rate_for(CaptureMode::SingleCapture),
                all_captures_credits: rule.rate_for(CaptureMode::AllCaptures),
            })
            .collect()
    }
}

/// Credits per 1000 m² for one resource in both capture modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostTableRow {
    pub resource: ResourceId,
    pub category: ResourceCategory,
    pub content_type: Option<String>,
    pub single_capture_credits: f64,
    pub all_captures_credits: f64,
}

/// Shared, atomically replaceable reference to the current catalog
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    inner: Arc<ArcSwap<PricingCatalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: PricingCatalog) -> Self {
        EstimationMetrics::record_catalog_loaded(catalog.len());
        Self {
            inner: Arc::new(ArcSwap::from_pointee(catalog)),
        }
    }

    /// Snapshot that stays valid even if a reload happens meanwhile
    pub fn current(&self) -> Arc<PricingCatalog> {
        self.inner.load_full()
    }

    pub fn replace(&self, catalog: PricingCatalog) {
        EstimationMetrics::record_catalog_loaded(catalog.len());
        self.inner.store(Arc::new(catalog));
    }

    /// Load a catalog from `path` and swap it in. On failure the current
    /// catalog stays in place.
    pub fn reload_from_path(&self, path: impl AsRef<Path>) -> Result<usize, CatalogError> {
        let path = path.as_ref();
        match PricingCatalog::from_path(path) {
            Ok(catalog) => {
                let entries = catalog.len();
                self.replace(catalog);
                EstimationMetrics::record_catalog_reload(true);
                info!(path = %path.display(), entries, "Pricing catalog reloaded");
                Ok(entries)
            }
            Err(e) => {
                EstimationMetrics::record_catalog_reload(false);
                warn!(path = %path.display(), error = %e, "Pricing catalog reload rejected");
                Err(e)
            }
        }
    }
}

impl From<PricingCatalog> for CatalogHandle {
    fn from(catalog: PricingCatalog) -> Self {
        Self::new(catalog)
    }
}
