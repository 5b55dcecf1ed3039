// ==============================================================================
// source.rs - Variant Inclusion Source Classifier
// ==============================================================================
// Description: Decides which source(s) put a variant on a variant list
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-03
// Version: 1.0.0
// ==============================================================================
// Rules:
//   1. A non-empty source recorded on the variant wins, verbatim. It reflects
//      the configuration in effect when the variant was added.
//   2. Otherwise (older records):
//      - ClinVar  if a configured significance category matches a label
//      - gnomAD   if pLoF inclusion is on, the consequence is pLoF and LOFTEE = HC
//      - Custom   if neither applies
// ==============================================================================

use std::collections::BTreeSet;

use crate::models::{Variant, VariantListMetadata, VariantSource};

/// VEP consequence terms counted as predicted loss of function
pub const PLOF_CONSEQUENCE_TERMS: [&str; 5] = [
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
];

/// LOFTEE high-confidence flag
pub const HIGH_CONFIDENCE_LOF: &str = "HC";

/// Sources that apply to a variant; never empty
pub fn classify(variant: &Variant, config: &VariantListMetadata) -> BTreeSet<VariantSource> {
    if let Some(recorded) = variant.source.as_ref().filter(|s| !s.is_empty()) {
        return recorded.iter().copied().collect();
    }

    let mut sources = BTreeSet::new();

    if is_included_by_clinvar(variant, config) {
        sources.insert(VariantSource::CuratedDatabase);
    }

    if is_included_by_gnomad(variant, config) {
        sources.insert(VariantSource::PopulationDatabase);
    }

    if sources.is_empty() {
        sources.insert(VariantSource::Custom);
    }

    sources
}

/// Shorthand used when partitioning for the by-source breakdown
pub fn has_source(variant: &Variant, config: &VariantListMetadata, source: VariantSource) -> bool {
    classify(variant, config).contains(&source)
}

fn is_included_by_clinvar(variant: &Variant, config: &VariantListMetadata) -> bool {
    config.include_clinvar_clinical_significance.iter().any(|category| {
        variant
            .clinical_significance
            .iter()
            .any(|label| category.matches(label))
    })
}

fn is_included_by_gnomad(variant: &Variant, config: &VariantListMetadata) -> bool {
    if !config.include_gnomad_plof {
        return false;
    }

    let is_plof = variant
        .major_consequence
        .as_deref()
        .map(|c| PLOF_CONSEQUENCE_TERMS.contains(&c))
        .unwrap_or(false);

    is_plof && variant.lof.as_deref() == Some(HIGH_CONFIDENCE_LOF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClinicalSignificanceCategory;

    fn config(clinvar: bool, gnomad: bool) -> VariantListMetadata {
        VariantListMetadata {
            include_clinvar_clinical_significance: if clinvar {
                vec![ClinicalSignificanceCategory::PathogenicOrLikelyPathogenic]
            } else {
                Vec::new()
            },
            include_gnomad_plof: gnomad,
            ..Default::default()
        }
    }

    fn plof_variant(id: &str) -> Variant {
        let mut variant = Variant::new(id);
        variant.major_consequence = Some("stop_gained".to_string());
        variant.lof = Some("HC".to_string());
        variant
    }

    #[test]
    fn test_recorded_source_is_authoritative() {
        // Config would say ClinVar, record says gnomAD
        let mut variant = Variant::new("1-100-A-C").with_source(vec![VariantSource::PopulationDatabase]);
        variant.clinical_significance = vec!["Pathogenic".to_string()];

        let sources = classify(&variant, &config(true, false));
        assert_eq!(sources.into_iter().collect::<Vec<_>>(), vec![VariantSource::PopulationDatabase]);
    }

    #[test]
    fn test_reconstructs_both_sources() {
        let mut variant = plof_variant("1-100-A-C");
        variant.clinical_significance = vec!["Likely pathogenic".to_string()];

        let sources = classify(&variant, &config(true, true));
        assert!(sources.contains(&VariantSource::CuratedDatabase));
        assert!(sources.contains(&VariantSource::PopulationDatabase));
        assert!(!sources.contains(&VariantSource::Custom));
    }

    #[test]
    fn test_low_confidence_plof_is_custom() {
        let mut variant = plof_variant("1-100-A-C");
        variant.lof = Some("LC".to_string());

        let sources = classify(&variant, &config(false, true));
        assert_eq!(sources.len(), 1);
        assert!(sources.contains(&VariantSource::Custom));
    }

    #[test]
    fn test_plof_ignored_when_not_opted_in() {
        let variant = plof_variant("1-100-A-C");
        assert!(!has_source(&variant, &config(true, false), VariantSource::PopulationDatabase));
    }

    #[test]
    fn test_never_empty() {
        let configs = [config(false, false), config(true, false), config(false, true), config(true, true)];
        let mut recorded_empty = Variant::new("1-300-G-T");
        recorded_empty.source = Some(Vec::new());
        let variants = [Variant::new("1-100-A-C"), plof_variant("1-200-A-C"), recorded_empty];

        for config in &configs {
            for variant in &variants {
                assert!(!classify(variant, config).is_empty());
            }
        }
    }
}
