// ==============================================================================
// calculations.rs - Variant List Calculation Aggregator
// ==============================================================================
// Description: Runs the frequency model over a variant list and its sources,
//              reshaped into population-keyed maps
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-11
// Version: 1.1.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::frequency::{self, CalculationOptions, RawNumbers};
use crate::models::{PopulationId, Variant, VariantList, VariantListMetadata, VariantSource};
use crate::source;

/// Values keyed by population, global included
pub type PopulationMap<T> = BTreeMap<PopulationId, T>;

/// Keys every persisted calculation record must carry
pub const REQUIRED_CALCULATION_KEYS: [&str; 5] = [
    "carrierFrequency",
    "carrierFrequencySimplified",
    "carrierFrequencyRawNumbers",
    "prevalence",
    "prevalenceBayesian",
];

/// Estimates restricted to variants from one source partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub carrier_frequency: PopulationMap<f64>,
    pub carrier_frequency_simplified: PopulationMap<f64>,
    pub prevalence: PopulationMap<f64>,
    pub prevalence_bayesian: PopulationMap<f64>,
}

/// Calculation result for a variant list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub carrier_frequency: PopulationMap<f64>,
    pub carrier_frequency_simplified: PopulationMap<f64>,
    pub carrier_frequency_raw_numbers: PopulationMap<RawNumbers>,
    pub prevalence: PopulationMap<f64>,
    pub prevalence_bayesian: PopulationMap<f64>,

    /// ClinVar-sourced variants only; None when no breakdown applies
    #[serde(default)]
    pub curated_database_only: Option<SourceBreakdown>,

    /// Variants not sourced from ClinVar; None when no breakdown applies
    #[serde(default)]
    pub population_database_only: Option<SourceBreakdown>,
}

impl CalculationResult {
    /// Read a persisted record; None for records missing any required key
    pub fn from_persisted(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        if REQUIRED_CALCULATION_KEYS.iter().any(|key| !object.contains_key(*key)) {
            return None;
        }

        match serde_json::from_value(value.clone()) {
            Ok(result) => Some(result),
            Err(e) => {
                debug!("Persisted calculations do not deserialize: {}", e);
                None
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Plain maps of numbers and strings; serialization cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A breakdown is only meaningful when ClinVar categories are configured
pub fn breakdown_enabled(config: &VariantListMetadata) -> bool {
    !config.include_clinvar_clinical_significance.is_empty()
}

/// Zip per-index values with `[global, ...populations]`
pub fn to_population_map<T>(populations: &[PopulationId], values: Vec<T>) -> PopulationMap<T> {
    std::iter::once(PopulationId::global())
        .chain(populations.iter().cloned())
        .zip(values)
        .collect()
}

fn source_breakdown(
    variants: &[&Variant],
    populations: &[PopulationId],
    options: CalculationOptions,
) -> SourceBreakdown {
    let estimates = frequency::estimate(variants, populations.len(), options);

    SourceBreakdown {
        carrier_frequency: to_population_map(populations, estimates.carrier_frequency),
        carrier_frequency_simplified: to_population_map(populations, estimates.carrier_frequency_simplified),
        prevalence: to_population_map(populations, estimates.prevalence),
        prevalence_bayesian: to_population_map(populations, estimates.prevalence_bayesian),
    }
}

/// Compute every estimate for the given (already selected) variants of a list
pub fn calculate(list: &VariantList, variants: &[&Variant], options: CalculationOptions) -> CalculationResult {
    let populations = list.populations();
    let estimates = frequency::estimate(variants, populations.len(), options);

    let (curated_database_only, population_database_only) = if breakdown_enabled(&list.metadata) {
        let (curated, other): (Vec<&Variant>, Vec<&Variant>) = variants
            .iter()
            .copied()
            .partition(|v| source::has_source(v, &list.metadata, VariantSource::CuratedDatabase));

        debug!(
            "Source breakdown for list {}: {} ClinVar, {} other",
            list.id,
            curated.len(),
            other.len()
        );

        (
            Some(source_breakdown(&curated, populations, options)),
            Some(source_breakdown(&other, populations, options)),
        )
    } else {
        (None, None)
    };

    CalculationResult {
        carrier_frequency: to_population_map(populations, estimates.carrier_frequency),
        carrier_frequency_simplified: to_population_map(populations, estimates.carrier_frequency_simplified),
        carrier_frequency_raw_numbers: to_population_map(populations, estimates.carrier_frequency_raw_numbers),
        prevalence: to_population_map(populations, estimates.prevalence),
        prevalence_bayesian: to_population_map(populations, estimates.prevalence_bayesian),
        curated_database_only,
        population_database_only,
    }
}

/// Compute over every variant of a list
pub fn calculate_all(list: &VariantList, options: CalculationOptions) -> CalculationResult {
    let variants: Vec<&Variant> = list.variants.iter().collect();
    calculate(list, &variants, options)
}
