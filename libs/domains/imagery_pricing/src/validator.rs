//! Structural and business checks on a resource selection.

use std::collections::BTreeSet;

use crate::catalog::PricingCatalog;
use crate::error::{PricingError, PricingResult};
use crate::models::{ResourceCategory, ResourceId};

/// Most AI packs the provider accepts in one request
pub const MAX_AI_PACKS: usize = 7;

/// Run every selection check in order; the first failure wins.
pub fn validate(resources: &BTreeSet<ResourceId>, catalog: &PricingCatalog) -> PricingResult<()> {
    ensure_not_empty(resources)?;
    ensure_ai_pack_limit(resources)?;
    ensure_priced(resources, catalog)
}

pub fn ensure_not_empty(resources: &BTreeSet<ResourceId>) -> PricingResult<()> {
    if resources.is_empty() {
        return Err(PricingError::NoResourceSelected);
    }
    Ok(())
}

/// Only [`ResourceCategory::AiPack`] resources count toward the cap.
pub fn ensure_ai_pack_limit(resources: &BTreeSet<ResourceId>) -> PricingResult<()> {
    let selected = resources
        .iter()
        .filter(|id| id.category() == ResourceCategory::AiPack)
        .count();

    if selected > MAX_AI_PACKS {
        return Err(PricingError::TooManyAiPacks {
            selected,
            limit: MAX_AI_PACKS,
        });
    }
    Ok(())
}

pub fn ensure_priced(
    resources: &BTreeSet<ResourceId>,
    catalog: &PricingCatalog,
) -> PricingResult<()> {
    match resources.iter().find(|id| !catalog.contains(**id)) {
        Some(missing) => Err(PricingError::UnknownResource(missing.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ai_packs(n: usize) -> BTreeSet<ResourceId> {
        ResourceId::all()
            .filter(|id| id.category() == ResourceCategory::AiPack)
            .take(n)
            .collect()
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let catalog = PricingCatalog::builtin().unwrap();
        assert!(matches!(
            validate(&BTreeSet::new(), &catalog),
            Err(PricingError::NoResourceSelected)
        ));
    }

    #[test]
    fn test_seven_ai_packs_is_the_limit() {
        let catalog = PricingCatalog::builtin().unwrap();
        assert!(validate(&ai_packs(7), &catalog).is_ok());

        let err = validate(&ai_packs(8), &catalog).unwrap_err();
        assert!(matches!(
            err,
            PricingError::TooManyAiPacks {
                selected: 8,
                limit: 7
            }
        ));
    }

    #[test]
    fn test_other_categories_do_not_count_toward_cap() {
        let catalog = PricingCatalog::builtin().unwrap();
        let mut selection = ai_packs(7);
        selection.extend([
            ResourceId::Vert,
            ResourceId::DetailDsm,
            ResourceId::TrueOrthoBuilding,
            ResourceId::TrueOrthoBuildingCharacteristics,
            ResourceId::ImpactAssessmentPostCatastrophe,
        ]);
        assert!(validate(&selection, &catalog).is_ok());
    }

    #[test]
    fn test_unpriced_resource_is_rejected() {
        let catalog = PricingCatalog::from_rules([(
            ResourceId::Vert,
            crate::models::PricingRule::flat(2.0, ResourceCategory::Raster),
        )]);
        let selection = BTreeSet::from([ResourceId::Vert, ResourceId::AiSolar]);
        let err = validate(&selection, &catalog).unwrap_err();
        assert!(matches!(err, PricingError::UnknownResource(ref id) if id == "aiPacks:solar"));
    }

    #[test]
    fn test_cap_is_checked_before_catalog() {
        let catalog = PricingCatalog::default();
        assert!(matches!(
            validate(&ai_packs(8), &catalog),
            Err(PricingError::TooManyAiPacks { .. })
        ));
    }
}
