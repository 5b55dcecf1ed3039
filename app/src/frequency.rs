// ==============================================================================
// frequency.rs - Carrier Frequency & Prevalence Estimators
// ==============================================================================
// Description: Per-population allele frequency, carrier frequency and prevalence
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-09
// Version: 1.0.0
// ==============================================================================
// Model (per population index i, over the variants v of a set):
//   ac_v,i  = AC_v,i - (include homozygotes ? 0 : 2 * hom_v,i)
//   q_v,i   = AN_v,i == 0 ? 0 : ac_v,i / AN_v,i
//   q_i     = sum_v q_v,i            (independent sites, additive)
//   carrier frequency             = 2 q (1 - q)
//   carrier frequency, simplified = 2 q
//   prevalence                    = q^2
//   prevalence, bayesian          = 1 - prod_v (1 - q_v,i)
//
// The additive model is only valid for rare variants in linkage equilibrium.
// No correction for non-independence is attempted.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::models::{Coverage, Variant};

/// Options that change how allele counts are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationOptions {
    /// Count alleles carried by homozygous individuals
    pub include_homozygotes_in_calculations: bool,
}

/// Summed allele counts for display (not a probability)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNumbers {
    pub total_ac: u64,
    pub average_an: f64,
}

/// All estimators for one variant set, indexed like AC/AN
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyEstimates {
    pub allele_frequency: Vec<f64>,
    pub carrier_frequency: Vec<f64>,
    pub carrier_frequency_simplified: Vec<f64>,
    pub carrier_frequency_raw_numbers: Vec<RawNumbers>,
    pub prevalence: Vec<f64>,
    pub prevalence_bayesian: Vec<f64>,
}

/// Effective allele count and allele number of a variant at an index
fn effective_counts(variant: &Variant, index: usize, options: CalculationOptions) -> Option<(u64, u64)> {
    match variant.coverage(index) {
        Coverage::Uncovered => None,
        Coverage::Covered { ac, an, homozygotes } => {
            let ac = if options.include_homozygotes_in_calculations {
                ac
            } else {
                ac.saturating_sub(homozygotes.saturating_mul(2))
            };
            Some((ac, an))
        }
    }
}

/// Allele frequency of a single variant at an index; uncovered is 0
pub fn variant_allele_frequency(variant: &Variant, index: usize, options: CalculationOptions) -> f64 {
    match effective_counts(variant, index, options) {
        Some((ac, an)) => ac as f64 / an as f64,
        None => 0.0,
    }
}

/// Summed allele frequency per index (global first)
pub fn allele_frequencies(
    variants: &[&Variant],
    population_count: usize,
    options: CalculationOptions,
) -> Vec<f64> {
    (0..=population_count)
        .map(|i| {
            variants
                .iter()
                .map(|v| variant_allele_frequency(v, i, options))
                .sum::<f64>()
        })
        .collect()
}

/// Hardy-Weinberg heterozygote frequency, 2q(1 - q)
pub fn carrier_frequency(variants: &[&Variant], population_count: usize, options: CalculationOptions) -> Vec<f64> {
    allele_frequencies(variants, population_count, options)
        .into_iter()
        .map(|q| 2.0 * q * (1.0 - q))
        .collect()
}

/// First-order approximation, 2q
pub fn carrier_frequency_simplified(
    variants: &[&Variant],
    population_count: usize,
    options: CalculationOptions,
) -> Vec<f64> {
    allele_frequencies(variants, population_count, options)
        .into_iter()
        .map(|q| 2.0 * q)
        .collect()
}

/// q^2
pub fn prevalence(variants: &[&Variant], population_count: usize, options: CalculationOptions) -> Vec<f64> {
    allele_frequencies(variants, population_count, options)
        .into_iter()
        .map(|q| q * q)
        .collect()
}

/// 1 - prod_v (1 - q_v), sites combined multiplicatively
pub fn prevalence_bayesian(variants: &[&Variant], population_count: usize, options: CalculationOptions) -> Vec<f64> {
    (0..=population_count)
        .map(|i| {
            let none_carried: f64 = variants
                .iter()
                .map(|v| 1.0 - variant_allele_frequency(v, i, options))
                .product();
            1.0 - none_carried
        })
        .collect()
}

/// Total effective allele count and mean allele number per index
pub fn carrier_frequency_raw_numbers(
    variants: &[&Variant],
    population_count: usize,
    options: CalculationOptions,
) -> Vec<RawNumbers> {
    (0..=population_count)
        .map(|i| {
            let (total_ac, total_an) = variants
                .iter()
                .filter_map(|v| effective_counts(v, i, options))
                .fold((0u64, 0u64), |(ac_sum, an_sum), (ac, an)| {
                    (ac_sum.saturating_add(ac), an_sum.saturating_add(an))
                });

            let average_an = if variants.is_empty() {
                0.0
            } else {
                total_an as f64 / variants.len() as f64
            };

            RawNumbers { total_ac, average_an }
        })
        .collect()
}

/// Run every estimator over one variant set
pub fn estimate(variants: &[&Variant], population_count: usize, options: CalculationOptions) -> FrequencyEstimates {
    let allele_frequency = allele_frequencies(variants, population_count, options);

    FrequencyEstimates {
        carrier_frequency: allele_frequency.iter().map(|q| 2.0 * q * (1.0 - q)).collect(),
        carrier_frequency_simplified: allele_frequency.iter().map(|q| 2.0 * q).collect(),
        prevalence: allele_frequency.iter().map(|q| q * q).collect(),
        prevalence_bayesian: prevalence_bayesian(variants, population_count, options),
        carrier_frequency_raw_numbers: carrier_frequency_raw_numbers(variants, population_count, options),
        allele_frequency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn round_trip_variants() -> Vec<Variant> {
        vec![
            Variant::new("1-100-A-C").with_counts(vec![4, 2], vec![2000, 1000]),
            Variant::new("1-200-A-C").with_counts(vec![0, 0], vec![2000, 1000]),
        ]
    }

    #[test]
    fn test_round_trip_scenario() {
        let variants = round_trip_variants();
        let refs: Vec<&Variant> = variants.iter().collect();
        let estimates = estimate(&refs, 1, CalculationOptions::default());

        assert!((estimates.allele_frequency[0] - 0.002).abs() < EPSILON);
        assert!((estimates.carrier_frequency[0] - 0.003992).abs() < EPSILON);
        assert!((estimates.prevalence[0] - 0.000004).abs() < EPSILON);
        assert!((estimates.carrier_frequency_simplified[0] - 0.004).abs() < EPSILON);

        // 2 / 1000 in the single population
        assert!((estimates.allele_frequency[1] - 0.002).abs() < EPSILON);

        assert_eq!(estimates.carrier_frequency_raw_numbers[0].total_ac, 4);
        assert!((estimates.carrier_frequency_raw_numbers[0].average_an - 2000.0).abs() < EPSILON);
    }

    #[test]
    fn test_zero_allele_number_is_zero_not_nan() {
        let variant = Variant::new("1-100-A-C")
            .with_counts(vec![3, 3, 0], vec![1000, 0, 0])
            .with_homozygotes(vec![0, 0, 0]);
        let refs = vec![&variant];
        let estimates = estimate(&refs, 2, CalculationOptions::default());

        for i in 1..=2 {
            assert_eq!(estimates.allele_frequency[i], 0.0);
            assert_eq!(estimates.carrier_frequency[i], 0.0);
            assert_eq!(estimates.prevalence[i], 0.0);
            assert_eq!(estimates.prevalence_bayesian[i], 0.0);
        }
        assert!(estimates.carrier_frequency.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_missing_counts_contribute_nothing() {
        let counted = Variant::new("1-100-A-C").with_counts(vec![4], vec![2000]);
        let pending = Variant::new("1-300-G-T"); // Not yet computed
        let with_pending = allele_frequencies(&[&counted, &pending], 0, CalculationOptions::default());
        let without = allele_frequencies(&[&counted], 0, CalculationOptions::default());

        assert_eq!(with_pending, without);
    }

    #[test]
    fn test_empty_input_is_zero_filled() {
        let estimates = estimate(&[], 3, CalculationOptions::default());

        assert_eq!(estimates.carrier_frequency, vec![0.0; 4]);
        assert_eq!(estimates.prevalence, vec![0.0; 4]);
        assert_eq!(estimates.prevalence_bayesian, vec![0.0; 4]);
        assert_eq!(estimates.carrier_frequency_raw_numbers, vec![RawNumbers::default(); 4]);
    }

    #[test]
    fn test_homozygote_toggle_monotonicity() {
        let variants = vec![
            Variant::new("1-100-A-C")
                .with_counts(vec![10, 6], vec![2000, 1000])
                .with_homozygotes(vec![2, 1]),
            Variant::new("1-200-A-C")
                .with_counts(vec![5, 5], vec![2000, 1000])
                .with_homozygotes(vec![1, 1]),
        ];
        let refs: Vec<&Variant> = variants.iter().collect();

        let excluded = carrier_frequency(&refs, 1, CalculationOptions { include_homozygotes_in_calculations: false });
        let included = carrier_frequency(&refs, 1, CalculationOptions { include_homozygotes_in_calculations: true });

        for (without, with) in excluded.iter().zip(included.iter()) {
            assert!(without <= with);
        }
        // (10 - 4) / 2000 + (5 - 2) / 2000
        let q = allele_frequencies(&refs, 1, CalculationOptions::default());
        assert!((q[0] - 9.0 / 2000.0).abs() < EPSILON);
    }

    #[test]
    fn test_bayesian_prevalence_is_multiplicative() {
        let variants = vec![
            Variant::new("1-100-A-C").with_counts(vec![100], vec![1000]),
            Variant::new("1-200-A-C").with_counts(vec![200], vec![1000]),
        ];
        let refs: Vec<&Variant> = variants.iter().collect();
        let bayesian = prevalence_bayesian(&refs, 0, CalculationOptions::default());

        // 1 - 0.9 * 0.8
        assert!((bayesian[0] - 0.28).abs() < EPSILON);
    }

    #[test]
    fn test_single_estimators_agree_with_estimate() {
        let variants = round_trip_variants();
        let refs: Vec<&Variant> = variants.iter().collect();
        let options = CalculationOptions::default();
        let estimates = estimate(&refs, 1, options);

        assert_eq!(carrier_frequency(&refs, 1, options), estimates.carrier_frequency);
        assert_eq!(carrier_frequency_simplified(&refs, 1, options), estimates.carrier_frequency_simplified);
        assert_eq!(prevalence(&refs, 1, options), estimates.prevalence);
    }
}
