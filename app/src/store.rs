// ==============================================================================
// store.rs - Variant List & Shared Annotation Stores
// ==============================================================================
// Description: Remote store interfaces plus in-memory and PostgreSQL backends
// Author: Matt Barham
// Created: 2026-10-06
// Modified: 2026-10-15
// Version: 1.2.0
// ==============================================================================
// Write semantics: last write wins. There is no version token, so two sessions
// editing the same list overwrite each other field by field.
// ==============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{AnnotationPatch, SharedAnnotation, VariantList, VariantListMetadata, VariantListStatus};
use crate::validator::{validate_variant_list, ValidationError};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Variant list not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid variant list: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to variant lists
#[async_trait]
pub trait VariantListSource: Send + Sync {
    async fn get_variant_list(&self, list_id: Uuid) -> Result<VariantList, StoreError>;
}

/// Shared annotation key-value store
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Missing records come back as `SharedAnnotation::default()`
    async fn load_annotation(&self, list_id: Uuid) -> Result<SharedAnnotation, StoreError>;

    /// Write only the fields present in `patch`
    async fn save_annotation(&self, list_id: Uuid, patch: &AnnotationPatch) -> Result<(), StoreError>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

/// Mutex-guarded store for tests and offline use
#[derive(Default)]
pub struct InMemoryStore {
    variant_lists: Mutex<HashMap<Uuid, VariantList>>,
    annotations: Mutex<HashMap<Uuid, SharedAnnotation>>,
    save_calls: Mutex<Vec<(Uuid, AnnotationPatch)>>,
    load_calls: Mutex<Vec<Uuid>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_variant_list(&self, list: VariantList) {
        self.variant_lists
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(list.id, list);
    }

    pub fn insert_annotation(&self, list_id: Uuid, annotation: SharedAnnotation) {
        self.annotations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(list_id, annotation);
    }

    /// Stored annotation, if any
    pub fn annotation(&self, list_id: Uuid) -> Option<SharedAnnotation> {
        self.annotations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&list_id)
            .cloned()
    }

    /// Every save attempted, failed ones included
    pub fn save_calls(&self) -> Vec<(Uuid, AnnotationPatch)> {
        self.save_calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn save_count(&self) -> usize {
        self.save_calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn load_count(&self) -> usize {
        self.load_calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VariantListSource for InMemoryStore {
    async fn get_variant_list(&self, list_id: Uuid) -> Result<VariantList, StoreError> {
        self.variant_lists
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&list_id)
            .cloned()
            .ok_or(StoreError::NotFound(list_id))
    }
}

#[async_trait]
impl AnnotationStore for InMemoryStore {
    async fn load_annotation(&self, list_id: Uuid) -> Result<SharedAnnotation, StoreError> {
        self.load_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(list_id);

        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("annotation load refused".to_string()));
        }

        Ok(self.annotation(list_id).unwrap_or_default())
    }

    async fn save_annotation(&self, list_id: Uuid, patch: &AnnotationPatch) -> Result<(), StoreError> {
        self.save_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((list_id, patch.clone()));

        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("annotation save refused".to_string()));
        }

        let mut annotations = self.annotations.lock().unwrap_or_else(|e| e.into_inner());
        let annotation = annotations.entry(list_id).or_default();
        patch.apply_to(annotation);
        annotation.updated_at = Some(Utc::now());

        Ok(())
    }
}

// ==============================================================================
// POSTGRESQL STORE
// ==============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS variant_lists (
    id UUID PRIMARY KEY,
    label TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    variants JSONB NOT NULL DEFAULT '[]'::jsonb,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS variant_list_shared_annotations (
    variant_list_id UUID PRIMARY KEY REFERENCES variant_lists(id) ON DELETE CASCADE,
    selected_variants JSONB NOT NULL DEFAULT '[]'::jsonb,
    variant_notes JSONB NOT NULL DEFAULT '{}'::jsonb,
    variant_calculations JSONB,
    include_homozygotes_in_calculations BOOLEAN NOT NULL DEFAULT FALSE,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        info!("Connected to PostgreSQL (max {} connections)", config.max_connections);

        Ok(Self { pool })
    }

    /// Create tables if missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        // Note: raw_sql allows the multi-statement schema in a single round trip
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("Store schema ensured");
        Ok(())
    }
}

#[async_trait]
impl VariantListSource for PgStore {
    async fn get_variant_list(&self, list_id: Uuid) -> Result<VariantList, StoreError> {
        let row: Option<(Uuid, String, String, serde_json::Value, serde_json::Value)> = sqlx::query_as(
            "SELECT id, label, status, metadata, variants FROM variant_lists WHERE id = $1",
        )
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?;

        let (id, label, status, metadata, variants) = row.ok_or(StoreError::NotFound(list_id))?;

        let status = VariantListStatus::parse(&status)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown variant list status '{}'", status)))?;
        let metadata: VariantListMetadata = serde_json::from_value(metadata)?;

        let list = VariantList {
            id,
            label,
            status,
            metadata,
            variants: serde_json::from_value(variants)?,
        };

        validate_variant_list(&list)?;

        debug!("Loaded variant list {} ({}, {} variants)", list.id, status.as_str(), list.variants.len());

        Ok(list)
    }
}

#[async_trait]
impl AnnotationStore for PgStore {
    async fn load_annotation(&self, list_id: Uuid) -> Result<SharedAnnotation, StoreError> {
        let row: Option<(serde_json::Value, serde_json::Value, Option<serde_json::Value>, bool, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT selected_variants, variant_notes, variant_calculations,
                        include_homozygotes_in_calculations, updated_at
                 FROM variant_list_shared_annotations
                 WHERE variant_list_id = $1",
            )
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some((selected, notes, calculations, include_homozygotes, updated_at)) = row else {
            debug!("No shared annotation for variant list {}", list_id);
            return Ok(SharedAnnotation::default());
        };

        Ok(SharedAnnotation {
            selected_variants: serde_json::from_value(selected)?,
            variant_notes: serde_json::from_value(notes)?,
            include_homozygotes_in_calculations: include_homozygotes,
            variant_calculations: calculations.filter(|c| !c.is_null()),
            updated_at: Some(updated_at),
        })
    }

    async fn save_annotation(&self, list_id: Uuid, patch: &AnnotationPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }

        let selected = patch.selected_variants.as_ref().map(serde_json::to_value).transpose()?;
        let notes = patch.variant_notes.as_ref().map(serde_json::to_value).transpose()?;

        // COALESCE keeps the stored column for every field the patch leaves out
        sqlx::query(
            r#"
            INSERT INTO variant_list_shared_annotations (
                variant_list_id, selected_variants, variant_notes,
                variant_calculations, include_homozygotes_in_calculations, updated_at
            ) VALUES (
                $1, COALESCE($2, '[]'::jsonb), COALESCE($3, '{}'::jsonb),
                $4, COALESCE($5, FALSE), NOW()
            )
            ON CONFLICT (variant_list_id) DO UPDATE SET
                selected_variants = COALESCE($2, variant_list_shared_annotations.selected_variants),
                variant_notes = COALESCE($3, variant_list_shared_annotations.variant_notes),
                variant_calculations = COALESCE($4, variant_list_shared_annotations.variant_calculations),
                include_homozygotes_in_calculations = COALESCE(
                    $5, variant_list_shared_annotations.include_homozygotes_in_calculations
                ),
                updated_at = NOW()
            "#,
        )
        .bind(list_id)
        .bind(selected)
        .bind(notes)
        .bind(patch.variant_calculations.clone())
        .bind(patch.include_homozygotes_in_calculations)
        .execute(&self.pool)
        .await?;

        debug!("Saved shared annotation for variant list {}", list_id);

        Ok(())
    }
}
