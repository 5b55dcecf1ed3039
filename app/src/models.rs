// ==============================================================================
// models.rs - Variant List & Shared Annotation Data Models
// ==============================================================================
// Description: Populations, variants, variant lists and shared annotations
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-14
// Version: 1.1.0
// ==============================================================================
// Indexing convention for AC / AN / homozygote_count arrays:
//   index 0     -> global (whole cohort)
//   index i + 1 -> metadata.populations[i]
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Key of the whole-cohort population
pub const GLOBAL_POPULATION: &str = "global";

/// Opaque population identifier (e.g. "afr", "nfe", "global")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationId(String);

impl PopulationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn global() -> Self {
        Self(GLOBAL_POPULATION.to_string())
    }

    pub fn is_global(&self) -> bool {
        self.0 == GLOBAL_POPULATION
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PopulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PopulationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where a variant's inclusion in a list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariantSource {
    /// Curated clinical-significance database (ClinVar)
    #[serde(rename = "ClinVar")]
    CuratedDatabase,
    /// Population database pLoF call (gnomAD)
    #[serde(rename = "gnomAD")]
    PopulationDatabase,
    /// Added by hand
    #[serde(rename = "Custom")]
    Custom,
}

/// Allele counts of one variant in one population
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// No data, or no called alleles (AN == 0)
    Uncovered,
    Covered { ac: u64, an: u64, homozygotes: u64 },
}

/// Single variant record as stored on a variant list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// chrom-pos-ref-alt, or a structural variant id
    pub id: String,

    /// Allele counts, index 0 = global
    #[serde(rename = "AC", default, skip_serializing_if = "Option::is_none")]
    pub ac: Option<Vec<u64>>,

    /// Allele numbers, index 0 = global
    #[serde(rename = "AN", default, skip_serializing_if = "Option::is_none")]
    pub an: Option<Vec<u64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homozygote_count: Option<Vec<u64>>,

    /// VEP major consequence term (e.g. "stop_gained")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_consequence: Option<String>,

    /// LOFTEE confidence ("HC" / "LC")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lof: Option<String>,

    /// ClinVar clinical significance labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clinical_significance: Vec<String>,

    /// Sources recorded when the variant was added to the list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<VariantSource>>,

    /// Informational flags ("not_found", "filtered", ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

impl Variant {
    /// Bare variant with no counts and no classification inputs
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ac: None,
            an: None,
            homozygote_count: None,
            major_consequence: None,
            lof: None,
            clinical_significance: Vec::new(),
            source: None,
            flags: Vec::new(),
        }
    }

    pub fn with_counts(mut self, ac: Vec<u64>, an: Vec<u64>) -> Self {
        self.ac = Some(ac);
        self.an = Some(an);
        self
    }

    pub fn with_homozygotes(mut self, homozygote_count: Vec<u64>) -> Self {
        self.homozygote_count = Some(homozygote_count);
        self
    }

    pub fn with_source(mut self, source: Vec<VariantSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Counts at a population index (0 = global)
    pub fn coverage(&self, index: usize) -> Coverage {
        let (Some(ac), Some(an)) = (self.ac.as_ref(), self.an.as_ref()) else {
            return Coverage::Uncovered;
        };

        match (ac.get(index), an.get(index)) {
            (Some(_), Some(0)) | (None, _) | (_, None) => Coverage::Uncovered,
            (Some(&ac), Some(&an)) => Coverage::Covered {
                ac,
                an,
                homozygotes: self
                    .homozygote_count
                    .as_ref()
                    .and_then(|h| h.get(index).copied())
                    .unwrap_or(0),
            },
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Processing status of a variant list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantListStatus {
    Queued,
    Processing,
    Ready,
    Error,
}

impl VariantListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantListStatus::Queued => "queued",
            VariantListStatus::Processing => "processing",
            VariantListStatus::Ready => "ready",
            VariantListStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "queued" => Some(VariantListStatus::Queued),
            "processing" => Some(VariantListStatus::Processing),
            "ready" => Some(VariantListStatus::Ready),
            "error" => Some(VariantListStatus::Error),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, VariantListStatus::Ready)
    }
}

/// ClinVar clinical significance categories a list can opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalSignificanceCategory {
    PathogenicOrLikelyPathogenic,
    ConflictingInterpretations,
}

impl ClinicalSignificanceCategory {
    /// Whether a ClinVar label falls into this category
    pub fn matches(&self, label: &str) -> bool {
        let normalized = label.trim().to_lowercase().replace('_', " ");
        match self {
            ClinicalSignificanceCategory::PathogenicOrLikelyPathogenic => matches!(
                normalized.as_str(),
                "pathogenic" | "likely pathogenic" | "pathogenic/likely pathogenic"
            ),
            ClinicalSignificanceCategory::ConflictingInterpretations => {
                normalized.starts_with("conflicting interpretations of pathogenicity")
                    || normalized.starts_with("conflicting classifications of pathogenicity")
            }
        }
    }
}

/// Variant list metadata: populations and inclusion configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantListMetadata {
    /// Populations in array-index order (global excluded)
    #[serde(default)]
    pub populations: Vec<PopulationId>,

    #[serde(default)]
    pub include_clinvar_clinical_significance: Vec<ClinicalSignificanceCategory>,

    #[serde(default)]
    pub include_gnomad_plof: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_genome: Option<String>,
}

/// Variant list aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantList {
    pub id: Uuid,
    #[serde(default)]
    pub label: String,
    pub status: VariantListStatus,
    #[serde(default)]
    pub metadata: VariantListMetadata,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl VariantList {
    pub fn populations(&self) -> &[PopulationId] {
        &self.metadata.populations
    }

    /// `[global, ...populations]`, aligned with AC/AN indices
    pub fn population_keys(&self) -> Vec<PopulationId> {
        std::iter::once(PopulationId::global())
            .chain(self.metadata.populations.iter().cloned())
            .collect()
    }

    pub fn variant_ids(&self) -> BTreeSet<String> {
        self.variants.iter().map(|v| v.id.clone()).collect()
    }

    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }
}

/// Which variants count towards calculations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing explicitly chosen; every variant counts
    All,
    Subset(BTreeSet<String>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::All
    }
}

impl Selection {
    /// Build from stored ids; an empty set means nothing was chosen yet
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let ids: BTreeSet<String> = ids.into_iter().collect();
        if ids.is_empty() {
            Selection::All
        } else {
            Selection::Subset(ids)
        }
    }

    pub fn contains(&self, variant_id: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Subset(ids) => ids.contains(variant_id),
        }
    }

    /// Stored form: `All` is written as an empty list
    pub fn to_ids(&self) -> Vec<String> {
        match self {
            Selection::All => Vec::new(),
            Selection::Subset(ids) => ids.iter().cloned().collect(),
        }
    }

    /// Variants of `list` this selection includes, in list order
    pub fn resolve<'a>(&self, list: &'a VariantList) -> Vec<&'a Variant> {
        list.variants
            .iter()
            .filter(|v| self.contains(&v.id))
            .collect()
    }
}

/// Shared annotation of a variant list, as held by the remote store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedAnnotation {
    #[serde(default)]
    pub selected_variants: Vec<String>,

    #[serde(default)]
    pub variant_notes: BTreeMap<String, String>,

    #[serde(default)]
    pub include_homozygotes_in_calculations: bool,

    /// Raw so that records written before calculations were persisted can be told apart
    #[serde(default)]
    pub variant_calculations: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update of a shared annotation; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_variants: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_notes: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_homozygotes_in_calculations: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_calculations: Option<serde_json::Value>,
}

impl AnnotationPatch {
    pub fn is_empty(&self) -> bool {
        self.selected_variants.is_none()
            && self.variant_notes.is_none()
            && self.include_homozygotes_in_calculations.is_none()
            && self.variant_calculations.is_none()
    }

    /// Apply onto an existing annotation
    pub fn apply_to(&self, annotation: &mut SharedAnnotation) {
        if let Some(selected) = &self.selected_variants {
            annotation.selected_variants = selected.clone();
        }
        if let Some(notes) = &self.variant_notes {
            annotation.variant_notes = notes.clone();
        }
        if let Some(include) = self.include_homozygotes_in_calculations {
            annotation.include_homozygotes_in_calculations = include;
        }
        if let Some(calculations) = &self.variant_calculations {
            annotation.variant_calculations = Some(calculations.clone());
        }
    }
}
