// ==============================================================================
// validator.rs - Variant List Input Validation
// ==============================================================================
// Description: Validates variant lists before they reach the frequency model
// Author: Matt Barham
// Created: 2026-10-04
// Modified: 2026-10-04
// Version: 1.0.0
// ==============================================================================
// The frequency model trusts its input. Array-length violations are caught
// here, at the boundary (CLI input, store reads), and nowhere else.
// ==============================================================================

use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::VariantList;

/// Variant list shape errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Variant {variant_id}: {field} has {actual} entries, expected {expected} (global + {populations} populations)")]
    ArrayLength {
        variant_id: String,
        field: &'static str,
        actual: usize,
        expected: usize,
        populations: usize,
    },

    #[error("Variant {variant_id}: AC present without AN (or AN without AC)")]
    UnpairedCounts { variant_id: String },

    #[error("Variant {variant_id}: AC {ac} exceeds AN {an} at index {index}")]
    CountExceedsNumber {
        variant_id: String,
        index: usize,
        ac: u64,
        an: u64,
    },

    #[error("Duplicate variant id: {0}")]
    DuplicateVariant(String),

    #[error("Duplicate population id: {0}")]
    DuplicatePopulation(String),

    #[error("Population list contains the reserved global key")]
    GlobalInPopulations,
}

/// Check every invariant the calculation engine relies on
pub fn validate_variant_list(list: &VariantList) -> Result<(), ValidationError> {
    debug!("Validating variant list {} ({} variants)", list.id, list.variants.len());

    let mut populations = HashSet::new();
    for population in list.populations() {
        if population.is_global() {
            return Err(ValidationError::GlobalInPopulations);
        }
        if !populations.insert(population.as_str()) {
            return Err(ValidationError::DuplicatePopulation(population.to_string()));
        }
    }

    let expected = list.populations().len() + 1;
    let mut seen = HashSet::new();

    for variant in &list.variants {
        if !seen.insert(variant.id.as_str()) {
            return Err(ValidationError::DuplicateVariant(variant.id.clone()));
        }

        let arrays = [
            ("AC", variant.ac.as_ref()),
            ("AN", variant.an.as_ref()),
            ("homozygote_count", variant.homozygote_count.as_ref()),
        ];
        for (field, values) in arrays {
            if let Some(values) = values {
                if values.len() != expected {
                    return Err(ValidationError::ArrayLength {
                        variant_id: variant.id.clone(),
                        field,
                        actual: values.len(),
                        expected,
                        populations: expected - 1,
                    });
                }
            }
        }

        match (variant.ac.as_ref(), variant.an.as_ref()) {
            (Some(ac), Some(an)) => {
                for (index, (&ac, &an)) in ac.iter().zip(an.iter()).enumerate() {
                    if ac > an {
                        return Err(ValidationError::CountExceedsNumber {
                            variant_id: variant.id.clone(),
                            index,
                            ac,
                            an,
                        });
                    }
                }
            }
            (None, None) => {}
            _ => {
                return Err(ValidationError::UnpairedCounts {
                    variant_id: variant.id.clone(),
                })
            }
        }
    }

    info!(
        "Variant list {} validated: {} variants, {} populations",
        list.id,
        list.variants.len(),
        expected - 1
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PopulationId, Variant, VariantListMetadata, VariantListStatus};
    use uuid::Uuid;

    fn list_with(variants: Vec<Variant>) -> VariantList {
        VariantList {
            id: Uuid::new_v4(),
            label: "validation".to_string(),
            status: VariantListStatus::Ready,
            metadata: VariantListMetadata {
                populations: vec![PopulationId::new("afr")],
                ..Default::default()
            },
            variants,
        }
    }

    #[test]
    fn test_valid_list_passes() {
        let list = list_with(vec![
            Variant::new("1-100-A-C").with_counts(vec![4, 2], vec![2000, 1000]),
            Variant::new("1-200-A-C"), // Not yet computed
        ]);
        assert!(validate_variant_list(&list).is_ok());
    }

    #[test]
    fn test_array_length_mismatch() {
        let list = list_with(vec![Variant::new("1-100-A-C").with_counts(vec![4], vec![2000])]);

        match validate_variant_list(&list) {
            Err(ValidationError::ArrayLength { field, actual, expected, .. }) => {
                assert_eq!(field, "AC");
                assert_eq!(actual, 1);
                assert_eq!(expected, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_homozygote_length_mismatch() {
        let list = list_with(vec![Variant::new("1-100-A-C")
            .with_counts(vec![4, 2], vec![2000, 1000])
            .with_homozygotes(vec![0])]);

        assert!(matches!(
            validate_variant_list(&list),
            Err(ValidationError::ArrayLength { field: "homozygote_count", .. })
        ));
    }

    #[test]
    fn test_duplicate_and_unpaired() {
        let duplicate = list_with(vec![Variant::new("1-100-A-C"), Variant::new("1-100-A-C")]);
        assert_eq!(
            validate_variant_list(&duplicate),
            Err(ValidationError::DuplicateVariant("1-100-A-C".to_string()))
        );

        let mut unpaired = Variant::new("1-100-A-C");
        unpaired.ac = Some(vec![1, 1]);
        assert!(matches!(
            validate_variant_list(&list_with(vec![unpaired])),
            Err(ValidationError::UnpairedCounts { .. })
        ));
    }

    #[test]
    fn test_count_exceeds_number() {
        let list = list_with(vec![Variant::new("1-100-A-C").with_counts(vec![4, 2000], vec![2000, 1000])]);
        assert!(matches!(
            validate_variant_list(&list),
            Err(ValidationError::CountExceedsNumber { index: 1, .. })
        ));
    }

    #[test]
    fn test_global_population_rejected() {
        let mut list = list_with(Vec::new());
        list.metadata.populations.push(PopulationId::global());
        assert_eq!(validate_variant_list(&list), Err(ValidationError::GlobalInPopulations));
    }
}
