// ==============================================================================
// annotation.rs - Shared Annotation Session
// ==============================================================================
// Description: Per-list state manager that loads, edits, recomputes and saves
//              the shared annotation of a variant list
// Author: Matt Barham
// Created: 2026-10-08
// Modified: 2026-10-18
// Version: 1.4.0
// ==============================================================================
// Flow:
//   load()                      -> fetch annotation, migrate legacy calculations
//   set_selected_variants()     -> local update, debounced save
//   set_include_homozygotes()   -> local update, debounced save
//   set_variant_note()          -> local update, immediate save
//   update_variant_list()       -> Ready transition resets the selection
//
// Store failures never abort the session: local state is kept and the error
// is published on the notification observable. Nothing is retried.
// No write reaches the store until a load has succeeded.
// ==============================================================================

use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::calculations::{self, CalculationResult};
use crate::config::SessionConfig;
use crate::debounce::{DebouncedAction, Debouncer};
use crate::frequency::CalculationOptions;
use crate::models::{AnnotationPatch, Selection, VariantList, VariantListStatus};
use crate::observable::Observable;
use crate::store::{AnnotationStore, StoreError};

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Variant list is not ready (status: {})", .0.as_str())]
    NotReady(VariantListStatus),

    #[error("Shared annotation has not been loaded")]
    NotLoaded,

    #[error("Failed to load shared annotation: {0}")]
    Load(#[source] StoreError),

    #[error("Failed to save shared annotation: {0}")]
    Save(#[source] StoreError),
}

/// Lifecycle of the remote annotation fetch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Uninitialized,
    Loading,
    Loaded,
    LoadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    LoadFailed,
    SaveFailed,
}

/// User-facing error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

struct SessionInner {
    store: Arc<dyn AnnotationStore>,
    variant_list: Observable<VariantList>,
    calculations: Observable<Option<CalculationResult>>,
    selection: Observable<Selection>,
    notes: Observable<BTreeMap<String, String>>,
    include_homozygotes: Observable<bool>,
    load_state: Observable<LoadState>,
    is_loading: Observable<bool>,
    notification: Observable<Option<Notification>>,
}

impl SessionInner {
    fn set_load_state(&self, state: LoadState) {
        self.is_loading.set(state == LoadState::Loading);
        self.load_state.set(state);
    }

    fn notify(&self, kind: NotificationKind, message: String) {
        self.notification.set(Some(Notification { kind, message }));
    }

    /// Writes before a successful load would replace remote data with defaults
    fn ensure_loaded(&self) -> Result<(), SessionError> {
        match self.load_state.get() {
            LoadState::Loaded => Ok(()),
            state => {
                debug!("Annotation write refused in state {:?}", state);
                Err(SessionError::NotLoaded)
            }
        }
    }

    fn options(&self) -> CalculationOptions {
        CalculationOptions {
            include_homozygotes_in_calculations: self.include_homozygotes.get(),
        }
    }

    /// Recompute over the current selection and publish the result
    fn recompute(&self, list: &VariantList) -> CalculationResult {
        let selection = self.selection.get();
        let variants = selection.resolve(list);
        let result = calculations::calculate(list, &variants, self.options());

        debug!(
            "Recomputed calculations for list {} over {} of {} variants",
            list.id,
            variants.len(),
            list.variants.len()
        );

        self.calculations.set(Some(result.clone()));
        result
    }

    /// Write selection, options and calculations in one patch
    async fn persist(&self, list_id: Uuid, result: &CalculationResult) -> Result<(), SessionError> {
        let patch = AnnotationPatch {
            selected_variants: Some(self.selection.get().to_ids()),
            include_homozygotes_in_calculations: Some(self.include_homozygotes.get()),
            variant_calculations: Some(result.to_json()),
            ..Default::default()
        };

        self.write(list_id, &patch).await
    }

    async fn write(&self, list_id: Uuid, patch: &AnnotationPatch) -> Result<(), SessionError> {
        match self.store.save_annotation(list_id, patch).await {
            Ok(()) => {
                debug!("Shared annotation saved for list {}", list_id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to save shared annotation for list {}: {}", list_id, e);
                self.notify(
                    NotificationKind::SaveFailed,
                    format!("Unable to save annotation changes: {}", e),
                );
                Err(SessionError::Save(e))
            }
        }
    }

    /// Body of the debounced save; reads state as of now, not as of the trigger
    async fn save_selection_state(&self) -> Result<(), SessionError> {
        let list = self.variant_list.get();
        if !list.is_ready() {
            debug!("Skipping save for list {}: status {}", list.id, list.status.as_str());
            return Err(SessionError::NotReady(list.status));
        }
        self.ensure_loaded()?;

        let result = self.recompute(&list);
        self.persist(list.id, &result).await
    }
}

/// Shared annotation state for one variant list
pub struct AnnotationSession {
    inner: Arc<SessionInner>,
    debouncer: Debouncer,
}

impl AnnotationSession {
    /// Create a session; must be called within a tokio runtime
    pub fn new(list: VariantList, store: Arc<dyn AnnotationStore>, config: &SessionConfig) -> Self {
        let inner = Arc::new(SessionInner {
            store,
            variant_list: Observable::new(list),
            calculations: Observable::new(None),
            selection: Observable::new(Selection::All),
            notes: Observable::new(BTreeMap::new()),
            include_homozygotes: Observable::new(false),
            load_state: Observable::new(LoadState::Uninitialized),
            is_loading: Observable::new(false),
            notification: Observable::new(None),
        });

        let action_inner = Arc::clone(&inner);
        let action: DebouncedAction = Arc::new(move || {
            let inner = Arc::clone(&action_inner);
            async move {
                if let Err(e) = inner.save_selection_state().await {
                    debug!("Debounced save did not complete: {}", e);
                }
            }
            .boxed()
        });

        let debouncer = Debouncer::new(config.save_debounce, action);

        Self { inner, debouncer }
    }

    pub fn list_id(&self) -> Uuid {
        self.inner.variant_list.with(|list| list.id)
    }

    pub fn variant_list(&self) -> VariantList {
        self.inner.variant_list.get()
    }

    /// Fetch the shared annotation and bring persisted calculations up to date
    pub async fn load(&self) -> Result<(), SessionError> {
        self.fetch(true).await
    }

    /// `migrate` controls the write-back of recomputed legacy calculations
    async fn fetch(&self, migrate: bool) -> Result<(), SessionError> {
        let list = self.inner.variant_list.get();
        if !list.is_ready() {
            debug!("Not loading annotation for list {}: status {}", list.id, list.status.as_str());
            return Err(SessionError::NotReady(list.status));
        }

        self.inner.set_load_state(LoadState::Loading);

        let annotation = match self.inner.store.load_annotation(list.id).await {
            Ok(annotation) => annotation,
            Err(e) => {
                warn!("Failed to load shared annotation for list {}: {}", list.id, e);
                self.inner.set_load_state(LoadState::LoadFailed(e.to_string()));
                self.inner.notify(
                    NotificationKind::LoadFailed,
                    format!("Unable to load shared annotation: {}", e),
                );
                return Err(SessionError::Load(e));
            }
        };

        let had_selection = !annotation.selected_variants.is_empty();
        self.inner
            .selection
            .set(Selection::from_ids(annotation.selected_variants));
        self.inner.notes.set(annotation.variant_notes);
        self.inner
            .include_homozygotes
            .set(annotation.include_homozygotes_in_calculations);

        let persisted = annotation
            .variant_calculations
            .as_ref()
            .and_then(CalculationResult::from_persisted);

        match persisted {
            Some(result) => {
                debug!("Using persisted calculations for list {}", list.id);
                self.inner.calculations.set(Some(result));
            }
            None => {
                let result = self.inner.recompute(&list);

                // Only lists someone has already curated are written back
                if migrate && had_selection {
                    info!("Migrating legacy calculations for list {}", list.id);
                    if let Err(e) = self.inner.persist(list.id, &result).await {
                        warn!("Legacy calculation migration for list {} failed: {}", list.id, e);
                    }
                }
            }
        }

        self.inner.set_load_state(LoadState::Loaded);
        info!("Shared annotation loaded for list {}", list.id);

        Ok(())
    }

    /// Replace the selection; saved after the quiet period
    pub fn set_selected_variants<I>(&self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.inner.selection.set(Selection::from_ids(ids));
        self.debouncer.trigger();
    }

    pub fn set_include_homozygotes(&self, include: bool) {
        self.inner.include_homozygotes.set(include);
        self.debouncer.trigger();
    }

    /// Set or clear (empty text) the note on a variant; saved immediately
    pub async fn set_variant_note(&self, variant_id: &str, note: &str) -> Result<(), SessionError> {
        // The patch carries the whole notes map
        self.inner.ensure_loaded()?;

        let notes = self.inner.notes.update(|notes| {
            if note.is_empty() {
                notes.remove(variant_id);
            } else {
                notes.insert(variant_id.to_string(), note.to_string());
            }
            notes.clone()
        });

        let patch = AnnotationPatch {
            variant_notes: Some(notes),
            ..Default::default()
        };

        self.inner.write(self.list_id(), &patch).await
    }

    /// Swap in a new revision of the variant list
    pub async fn update_variant_list(&self, list: VariantList) {
        let previous = self.inner.variant_list.with(|current| current.status);
        let became_ready = !previous.is_ready() && list.is_ready();
        self.inner.variant_list.set(list);

        if !became_ready {
            return;
        }

        info!("Variant list {} became ready", self.list_id());

        // The selection is replaced below, so a legacy record is not migrated
        if self.inner.load_state.get() != LoadState::Loaded {
            if let Err(e) = self.fetch(false).await {
                warn!("Keeping selection for list {}: {}", self.list_id(), e);
                return;
            }
        }

        // The variant set may have changed; start from every current variant
        let list = self.inner.variant_list.get();
        self.inner.selection.set(Selection::from_ids(list.variant_ids()));
        self.inner.recompute(&list);
        self.debouncer.trigger();
    }

    /// Run any pending debounced save now
    pub async fn flush(&self) {
        self.debouncer.flush().await;
    }

    pub fn dismiss_notification(&self) {
        self.inner.notification.set(None);
    }

    pub fn calculations(&self) -> &Observable<Option<CalculationResult>> {
        &self.inner.calculations
    }

    pub fn selection(&self) -> &Observable<Selection> {
        &self.inner.selection
    }

    pub fn notes(&self) -> &Observable<BTreeMap<String, String>> {
        &self.inner.notes
    }

    pub fn include_homozygotes(&self) -> &Observable<bool> {
        &self.inner.include_homozygotes
    }

    pub fn load_state(&self) -> &Observable<LoadState> {
        &self.inner.load_state
    }

    pub fn is_loading(&self) -> &Observable<bool> {
        &self.inner.is_loading
    }

    pub fn notification(&self) -> &Observable<Option<Notification>> {
        &self.inner.notification
    }
}
