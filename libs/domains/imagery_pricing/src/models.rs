use chrono::NaiveDate;
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use utoipa::ToSchema;

use crate::area::AreaOfInterest;
use crate::error::{PricingError, PricingResult};

/// Deliverable that can be requested from the imagery provider.
///
/// The external form is `namespace:name`, exactly as the provider's coverage
/// API names its resources.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    ToSchema,
)]
pub enum ResourceId {
    #[serde(rename = "raster:Vert")]
    #[strum(serialize = "raster:Vert")]
    Vert,
    #[serde(rename = "raster:DetailDtm")]
    #[strum(serialize = "raster:DetailDtm")]
    DetailDtm,
    #[serde(rename = "raster:DetailDsm")]
    #[strum(serialize = "raster:DetailDsm")]
    DetailDsm,
    #[serde(rename = "raster:TrueOrtho")]
    #[strum(serialize = "raster:TrueOrtho")]
    TrueOrtho,
    #[serde(rename = "raster:North")]
    #[strum(serialize = "raster:North")]
    PanoramaNorth,
    #[serde(rename = "raster:East")]
    #[strum(serialize = "raster:East")]
    PanoramaEast,
    #[serde(rename = "raster:South")]
    #[strum(serialize = "raster:South")]
    PanoramaSouth,
    #[serde(rename = "raster:West")]
    #[strum(serialize = "raster:West")]
    PanoramaWest,

    #[serde(rename = "aiPacks:building")]
    #[strum(serialize = "aiPacks:building")]
    AiBuilding,
    #[serde(rename = "aiPacks:building_char")]
    #[strum(serialize = "aiPacks:building_char")]
    AiBuildingCharacteristics,
    #[serde(rename = "aiPacks:construction")]
    #[strum(serialize = "aiPacks:construction")]
    AiConstruction,
    #[serde(rename = "aiPacks:debris")]
    #[strum(serialize = "aiPacks:debris")]
    AiDebris,
    #[serde(rename = "aiPacks:pavement_marking")]
    #[strum(serialize = "aiPacks:pavement_marking")]
    AiPavementMarking,
    #[serde(rename = "aiPacks:poles")]
    #[strum(serialize = "aiPacks:poles")]
    AiPoles,
    #[serde(rename = "aiPacks:pool")]
    #[strum(serialize = "aiPacks:pool")]
    AiPool,
    #[serde(rename = "aiPacks:postcat")]
    #[strum(serialize = "aiPacks:postcat")]
    AiPostCatastrophe,
    #[serde(rename = "aiPacks:roof_char")]
    #[strum(serialize = "aiPacks:roof_char")]
    AiRoofCharacteristics,
    #[serde(rename = "aiPacks:roof_cond")]
    #[strum(serialize = "aiPacks:roof_cond")]
    AiRoofCondition,
    #[serde(rename = "aiPacks:roof_objects")]
    #[strum(serialize = "aiPacks:roof_objects")]
    AiRoofObjects,
    #[serde(rename = "aiPacks:solar")]
    #[strum(serialize = "aiPacks:solar")]
    AiSolar,
    #[serde(rename = "aiPacks:surface_permeability")]
    #[strum(serialize = "aiPacks:surface_permeability")]
    AiSurfacePermeability,
    #[serde(rename = "aiPacks:surfaces")]
    #[strum(serialize = "aiPacks:surfaces")]
    AiSurfaces,
    #[serde(rename = "aiPacks:trampoline")]
    #[strum(serialize = "aiPacks:trampoline")]
    AiTrampoline,
    #[serde(rename = "aiPacks:vegetation")]
    #[strum(serialize = "aiPacks:vegetation")]
    AiVegetation,

    #[serde(rename = "trueOrthoAiPacks:building")]
    #[strum(serialize = "trueOrthoAiPacks:building")]
    TrueOrthoBuilding,
    #[serde(rename = "trueOrthoAiPacks:building_char")]
    #[strum(serialize = "trueOrthoAiPacks:building_char")]
    TrueOrthoBuildingCharacteristics,

    #[serde(rename = "aiImpactAssessment:postcat")]
    #[strum(serialize = "aiImpactAssessment:postcat")]
    ImpactAssessmentPostCatastrophe,
}

impl ResourceId {
    /// External identifier, e.g. `aiPacks:pool`
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Namespace part of the identifier (`raster`, `aiPacks`, ...)
    pub fn namespace(&self) -> &'static str {
        let id = self.as_str();
        id.split_once(':').map(|(namespace, _)| namespace).unwrap_or(id)
    }

    /// Category is fixed by the namespace and never comes from the catalog.
    pub fn category(&self) -> ResourceCategory {
        match self.namespace() {
            "aiPacks" => ResourceCategory::AiPack,
            "trueOrthoAiPacks" => ResourceCategory::TrueOrthoAiPack,
            "aiImpactAssessment" => ResourceCategory::ImpactAssessment,
            _ => ResourceCategory::Raster,
        }
    }

    /// Every known identifier, in declaration order
    pub fn all() -> impl Iterator<Item = ResourceId> {
        Self::iter()
    }

    /// Translate external identifiers into a de-duplicated selection.
    pub fn parse_set<I, S>(ids: I) -> PricingResult<BTreeSet<ResourceId>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .map(|id| ResourceId::from_str(&id).map_err(|_| PricingError::UnknownResource(id)))
            .collect()
    }
}

/// Resource category. Only [`ResourceCategory::AiPack`] counts toward the
/// AI-pack selection cap.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ResourceCategory {
    Raster,
    AiPack,
    TrueOrthoAiPack,
    ImpactAssessment,
}

/// Whether the request covers only the latest capture or every capture in
/// the date range.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum CaptureMode {
    #[default]
    #[serde(rename = "single")]
    #[strum(serialize = "single")]
    SingleCapture,
    #[serde(rename = "all")]
    #[strum(serialize = "all")]
    AllCaptures,
}

impl CaptureMode {
    pub fn parse(value: &str) -> PricingResult<Self> {
        CaptureMode::from_str(value.trim())
            .map_err(|_| PricingError::InvalidCaptureMode(value.to_string()))
    }
}

/// Credit price of a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    /// Credits charged per 1000 m² for a single capture
    #[serde(rename = "creditRatePer1000SqM")]
    pub credit_rate_per_1000_sqm: f64,
    /// Whether the rate scales when every capture is requested
    pub captures_aware: bool,
    /// Factor applied to the rate in [`CaptureMode::AllCaptures`]
    pub all_captures_multiplier: f64,
    pub category: ResourceCategory,
    /// Human-readable content type shown in the cost table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl PricingRule {
    /// Flat rule, identical in both capture modes
    pub fn flat(credit_rate_per_1000_sqm: f64, category: ResourceCategory) -> Self {
        Self {
            credit_rate_per_1000_sqm,
            captures_aware: false,
            all_captures_multiplier: 1.0,
            category,
            content_type: None,
        }
    }

    /// Rule whose rate is multiplied when all captures are requested
    pub fn captures_aware(
        credit_rate_per_1000_sqm: f64,
        all_captures_multiplier: f64,
        category: ResourceCategory,
    ) -> Self {
        Self {
            credit_rate_per_1000_sqm,
            captures_aware: true,
            all_captures_multiplier,
            category,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn multiplier_for(&self, mode: CaptureMode) -> f64 {
        match mode {
            CaptureMode::AllCaptures if self.captures_aware => self.all_captures_multiplier,
            _ => 1.0,
        }
    }

    /// Effective credits per 1000 m² for the given capture mode
    pub fn rate_for(&self, mode: CaptureMode) -> f64 {
        self.credit_rate_per_1000_sqm * self.multiplier_for(mode)
    }
}

/// Date window of the request. Informational only: it bounds which captures
/// "all captures" refers to but is never priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl DateRange {
    pub fn new(since: NaiveDate, until: NaiveDate) -> PricingResult<Self> {
        if since > until {
            return Err(PricingError::InvalidDateRange { since, until });
        }
        Ok(Self { since, until })
    }

    /// Fill missing bounds from the default calendar year.
    pub fn from_bounds(since: Option<NaiveDate>, until: Option<NaiveDate>) -> PricingResult<Self> {
        let default = Self::default();
        Self::new(since.unwrap_or(default.since), until.unwrap_or(default.until))
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            since: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            until: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }
}

/// One cost estimation request
#[derive(Debug, Clone)]
pub struct EstimationRequest {
    pub area_of_interest: AreaOfInterest,
    pub resources: BTreeSet<ResourceId>,
    pub date_range: DateRange,
    pub capture_mode: CaptureMode,
}

impl EstimationRequest {
    pub fn new(
        area_of_interest: AreaOfInterest,
        resources: impl IntoIterator<Item = ResourceId>,
        capture_mode: CaptureMode,
    ) -> Self {
        Self {
            area_of_interest,
            resources: resources.into_iter().collect(),
            date_range: DateRange::default(),
            capture_mode,
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    /// Build a request from boundary values.
    ///
    /// Checks run in the order a user fixes them: resources first, then the
    /// capture mode and dates, and the area of interest last. A missing area
    /// is the common "nothing drawn yet" state and is reported as
    /// [`PricingError::MissingAreaOfInterest`].
    pub fn parse<S: AsRef<str>>(
        geometry: Option<&GeoJson>,
        resources: &[S],
        capture_mode: Option<&str>,
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
    ) -> PricingResult<Self> {
        let resources = ResourceId::parse_set(resources)?;
        if resources.is_empty() {
            return Err(PricingError::NoResourceSelected);
        }

        let capture_mode = capture_mode
            .map(CaptureMode::parse)
            .transpose()?
            .unwrap_or_default();
        let date_range = DateRange::from_bounds(since, until)?;
        let area_of_interest = geometry
            .map(AreaOfInterest::from_geojson)
            .transpose()?
            .ok_or(PricingError::MissingAreaOfInterest)?;

        Ok(Self {
            area_of_interest,
            resources,
            date_range,
            capture_mode,
        })
    }
}

/// Total and itemized credit cost of a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationResult {
    pub area_square_meters: f64,
    pub capture_mode: CaptureMode,
    pub total_credits: f64,
    pub breakdown: BTreeMap<ResourceId, f64>,
}

impl EstimationResult {
    pub fn credits_for(&self, resource: ResourceId) -> Option<f64> {
        self.breakdown.get(&resource).copied()
    }

    /// Whole credits, each line rounded half to even before summing
    pub fn rounded_total(&self) -> u64 {
        self.breakdown
            .values()
            .map(|credits| credits.round_ties_even().max(0.0) as u64)
            .sum()
    }
}
