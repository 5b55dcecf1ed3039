// ==============================================================================
// annotation_session.rs - Shared Annotation Session Integration Tests
// ==============================================================================
// Description: End-to-end session scenarios against the in-memory store
// Author: Matt Barham
// Created: 2026-10-10
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use std::sync::Arc;
use std::time::Duration;

use prevalence_core::annotation::{AnnotationSession, LoadState};
use prevalence_core::calculations::CalculationResult;
use prevalence_core::config::SessionConfig;
use prevalence_core::models::{
    PopulationId, Selection, SharedAnnotation, Variant, VariantList, VariantListMetadata, VariantListStatus,
};
use prevalence_core::store::{AnnotationStore, InMemoryStore};
use uuid::Uuid;

fn round_trip_list(status: VariantListStatus) -> VariantList {
    VariantList {
        id: Uuid::new_v4(),
        label: "round trip".to_string(),
        status,
        metadata: VariantListMetadata {
            populations: vec![PopulationId::new("afr")],
            ..Default::default()
        },
        variants: vec![
            Variant::new("1-100-A-C").with_counts(vec![4, 2], vec![2000, 1000]),
            Variant::new("1-200-A-C").with_counts(vec![0, 0], vec![2000, 1000]),
        ],
    }
}

fn open(list: VariantList, store: &Arc<InMemoryStore>) -> AnnotationSession {
    let store: Arc<dyn AnnotationStore> = store.clone();
    AnnotationSession::new(list, store, &SessionConfig::default())
}

#[tokio::test(start_paused = true)]
async fn round_trip_numbers_through_session() {
    let store = Arc::new(InMemoryStore::new());
    let session = open(round_trip_list(VariantListStatus::Ready), &store);

    session.load().await.unwrap();

    let result = session.calculations().get().unwrap();
    let global = PopulationId::global();
    assert!((result.carrier_frequency[&global] - 0.003992).abs() < 1e-12);
    assert!((result.prevalence[&global] - 0.000004).abs() < 1e-15);
    assert_eq!(result.carrier_frequency_raw_numbers[&global].total_ac, 4);
    assert_eq!(result.carrier_frequency_raw_numbers[&global].average_an, 2000.0);

    // afr: 2 / 1000
    let afr = PopulationId::new("afr");
    assert!((result.carrier_frequency_simplified[&afr] - 0.004).abs() < 1e-12);
}

#[tokio::test(start_paused = true)]
async fn no_calculation_for_unready_statuses() {
    for status in [VariantListStatus::Queued, VariantListStatus::Processing, VariantListStatus::Error] {
        let store = Arc::new(InMemoryStore::new());
        let session = open(round_trip_list(status), &store);

        assert!(session.load().await.is_err());
        session.set_selected_variants(vec!["1-100-A-C".to_string()]);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(session.calculations().get().is_none(), "computed while {:?}", status);
        assert_eq!(store.load_count(), 0);
        assert_eq!(store.save_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn saved_state_is_picked_up_by_the_next_session() {
    let list = round_trip_list(VariantListStatus::Ready);
    let store = Arc::new(InMemoryStore::new());

    {
        let session = open(list.clone(), &store);
        session.load().await.unwrap();

        session.set_include_homozygotes(true);
        session.set_selected_variants(vec!["1-100-A-C".to_string()]);
        session.set_variant_note("1-100-A-C", "confirmed by Sanger").await.unwrap();
        session.flush().await;
    }
    assert_eq!(store.save_count(), 2);

    let stored = store.annotation(list.id).unwrap();
    assert_eq!(stored.selected_variants, vec!["1-100-A-C".to_string()]);
    assert!(stored.include_homozygotes_in_calculations);
    assert_eq!(stored.variant_notes["1-100-A-C"], "confirmed by Sanger");
    let persisted = CalculationResult::from_persisted(stored.variant_calculations.as_ref().unwrap()).unwrap();

    let session = open(list, &store);
    session.load().await.unwrap();

    assert_eq!(session.load_state().get(), LoadState::Loaded);
    assert!(session.include_homozygotes().get());
    assert!(session.selection().get().contains("1-100-A-C"));
    assert!(!session.selection().get().contains("1-200-A-C"));
    assert_eq!(session.notes().get().len(), 1);
    assert_eq!(session.calculations().get(), Some(persisted));

    // Complete record: nothing to migrate
    assert_eq!(store.save_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn legacy_migration_scenarios() {
    let list = round_trip_list(VariantListStatus::Ready);
    let legacy_calculations = serde_json::json!({
        "carrierFrequency": {"global": 0.003992},
        "carrierFrequencyRawNumbers": {"global": {"totalAc": 4, "averageAn": 2000.0}},
        "prevalence": {"global": 0.000004},
        "prevalenceBayesian": {"global": 0.002}
    });

    let curated = Arc::new(InMemoryStore::new());
    curated.insert_annotation(
        list.id,
        SharedAnnotation {
            selected_variants: vec!["1-100-A-C".to_string()],
            variant_calculations: Some(legacy_calculations.clone()),
            ..Default::default()
        },
    );
    open(list.clone(), &curated).load().await.unwrap();
    assert_eq!(curated.save_count(), 1);
    let migrated = curated.annotation(list.id).unwrap().variant_calculations.unwrap();
    assert!(migrated.get("carrierFrequencySimplified").is_some());

    let untouched = Arc::new(InMemoryStore::new());
    untouched.insert_annotation(
        list.id,
        SharedAnnotation {
            variant_calculations: Some(legacy_calculations),
            ..Default::default()
        },
    );
    let session = open(list, &untouched);
    session.load().await.unwrap();
    assert_eq!(untouched.save_count(), 0);
    assert_eq!(session.selection().get(), Selection::All);
    assert!(session.calculations().get().is_some());
}
