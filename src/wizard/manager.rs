//! Wizard state manager: the single source of truth for a wizard session

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::autosave::{AutoSaveHandler, AutoSaveStatus, AutoSaver};
use super::history::History;
use super::types::{StepInfo, WizardKind, WizardState, GENERAL_ERROR};
use crate::drafts::{Draft, DraftRequest, DraftStore};
use crate::form::FormData;
use crate::validation::{StepRegistry, StepValidation, ValidationRules};

/// Default bound on undo history
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 50;

/// Called with the new form data after every change
pub type UpdateCallback = Box<dyn Fn(&FormData) + Send + Sync>;

/// Construction options for a wizard session
pub struct WizardOptions {
    pub max_history_size: usize,
    /// Zero disables auto-save
    pub auto_save_interval: Duration,
    pub auto_save: Option<Arc<dyn AutoSaveHandler>>,
    pub on_update: Option<UpdateCallback>,
    pub rules: ValidationRules,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            auto_save_interval: Duration::ZERO,
            auto_save: None,
            on_update: None,
            rules: ValidationRules::default(),
        }
    }
}

impl WizardOptions {
    pub fn with_max_history_size(mut self, size: usize) -> Self {
        self.max_history_size = size;
        self
    }

    pub fn with_auto_save(mut self, handler: Arc<dyn AutoSaveHandler>, interval: Duration) -> Self {
        self.auto_save = Some(handler);
        self.auto_save_interval = interval;
        self
    }

    pub fn with_on_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FormData) + Send + Sync + 'static,
    {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }
}

impl fmt::Debug for WizardOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardOptions")
            .field("max_history_size", &self.max_history_size)
            .field("auto_save_interval", &self.auto_save_interval)
            .field("auto_save", &self.auto_save.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("rules", &self.rules)
            .finish()
    }
}

/// Owns the form data, history, validation and flags of one wizard session
pub struct WizardStateManager {
    kind: WizardKind,
    registry: StepRegistry,
    state: WizardState,
    validation: BTreeMap<u8, StepValidation>,
    history: History,
    /// Bumped on every form data change
    revision: u64,
    auto_saver: Option<AutoSaver>,
    on_update: Option<UpdateCallback>,
    /// Whether `errors.general` currently holds an auto-save failure
    general_from_auto_save: bool,
}

impl WizardStateManager {
    /// Start a session with the built-in steps for `kind`
    ///
    /// `initial_data` (e.g. a loaded draft) is merged over the kind's empty
    /// defaults and does not count as an edit.
    pub fn new(kind: WizardKind, initial_data: Option<FormData>, options: WizardOptions) -> Self {
        let registry = StepRegistry::for_kind(kind, &options.rules);
        Self::with_registry(kind, registry, initial_data, options)
    }

    /// Start a session with custom step validators
    pub fn with_registry(
        kind: WizardKind,
        registry: StepRegistry,
        initial_data: Option<FormData>,
        options: WizardOptions,
    ) -> Self {
        let mut form_data = kind.defaults();
        if let Some(initial) = &initial_data {
            form_data.merge(initial);
        }

        let auto_saver = match options.auto_save {
            Some(handler) if !options.auto_save_interval.is_zero() => {
                Some(AutoSaver::new(handler, options.auto_save_interval))
            }
            _ => None,
        };

        let total_steps = registry.len().max(1);
        let mut manager = Self {
            kind,
            registry,
            state: WizardState {
                kind,
                current_step: 1,
                total_steps,
                form_data: Arc::new(form_data),
                is_valid: BTreeMap::new(),
                is_dirty: false,
                is_loading: false,
                errors: BTreeMap::new(),
                last_saved_at: None,
                draft_id: None,
            },
            validation: BTreeMap::new(),
            history: History::new(options.max_history_size),
            revision: 0,
            auto_saver,
            on_update: options.on_update,
            general_from_auto_save: false,
        };
        manager.revalidate();

        tracing::debug!(
            kind = %kind,
            total_steps,
            auto_save = manager.auto_saver.is_some(),
            "wizard session started"
        );
        manager
    }

    /// Resume a saved draft, advancing to its step as far as validation allows
    ///
    /// Steps are entered one at a time, so the session stops on the first
    /// invalid step before the saved one. An auto-save handler in `options`
    /// should already know `draft.id`, e.g. `StoreAutoSave::new(.., Some(id))`.
    pub fn from_draft(draft: Draft, options: WizardOptions) -> Self {
        let mut manager = Self::new(draft.kind, Some(draft.form_data), options);
        manager.state.draft_id = Some(draft.id);
        manager.state.last_saved_at = Some(draft.updated_at);
        let target = draft.step.min(manager.state.total_steps);
        while manager.state.current_step < target && manager.go_to_next_step() {}
        manager
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn kind(&self) -> WizardKind {
        self.kind
    }

    pub fn wizard_state(&self) -> &WizardState {
        &self.state
    }

    pub fn form_data(&self) -> &FormData {
        &self.state.form_data
    }

    pub fn current_step(&self) -> u8 {
        self.state.current_step
    }

    pub fn total_steps(&self) -> u8 {
        self.state.total_steps
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.state.errors
    }

    pub fn is_step_valid(&self, step: u8) -> bool {
        self.state.is_valid.get(&step).copied().unwrap_or(false)
    }

    /// Full validation result for a step
    pub fn step_validation(&self, step: u8) -> Option<&StepValidation> {
        self.validation.get(&step)
    }

    /// Completion percent per step, derived from the current data
    pub fn step_completion(&self) -> BTreeMap<u8, u8> {
        self.validation
            .iter()
            .map(|(step, v)| (*step, v.completion_percent))
            .collect()
    }

    /// Metadata and progress for every step
    pub fn steps(&self) -> Vec<StepInfo> {
        self.registry
            .steps()
            .iter()
            .map(|def| {
                let validation = self.validation.get(&def.number);
                StepInfo {
                    number: def.number,
                    key: def.key,
                    title: def.title,
                    valid: validation.is_some_and(|v| v.valid),
                    completion_percent: validation.map_or(0, |v| v.completion_percent),
                    current: def.number == self.state.current_step,
                }
            })
            .collect()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// True while an auto-save timer is waiting or a save is running
    pub fn auto_save_pending(&self) -> bool {
        self.auto_saver.as_ref().is_some_and(AutoSaver::is_pending)
    }

    // ─── Editing ────────────────────────────────────────────────────────────

    /// Shallow-merge `patch` into the form data
    ///
    /// Returns false when the patch changes nothing; such patches leave
    /// history, dirty state and auto-save untouched.
    pub fn update_form_data(&mut self, patch: FormData) -> bool {
        self.poll_auto_save();

        if self.state.form_data.is_noop_patch(&patch) {
            tracing::trace!("ignoring no-op form update");
            return false;
        }

        tracing::debug!(
            step = self.state.current_step,
            fields = ?self.state.form_data.changed_keys(&patch),
            "form data updated"
        );

        let before = Arc::clone(&self.state.form_data);
        Arc::make_mut(&mut self.state.form_data).merge(&patch);
        self.history.record(before, self.state.current_step);
        self.after_change();
        true
    }

    /// Restore the form data from before the last edit
    pub fn undo(&mut self) -> bool {
        self.poll_auto_save();
        match self.history.undo(&mut self.state.form_data) {
            Some(step) => {
                tracing::debug!(edited_on = step, "undo");
                self.after_change();
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone edit
    pub fn redo(&mut self) -> bool {
        self.poll_auto_save();
        match self.history.redo(&mut self.state.form_data) {
            Some(step) => {
                tracing::debug!(edited_on = step, "redo");
                self.after_change();
                true
            }
            None => false,
        }
    }

    fn after_change(&mut self) {
        self.revision += 1;
        self.state.is_dirty = true;
        self.revalidate();

        if let Some(callback) = &self.on_update {
            callback(&self.state.form_data);
        }

        if let Some(saver) = self.auto_saver.as_mut() {
            saver.schedule(
                Arc::clone(&self.state.form_data),
                self.state.current_step,
                self.revision,
            );
        }
    }

    fn revalidate(&mut self) {
        self.validation = self.registry.validate_all(&self.state.form_data);
        self.state.is_valid = self
            .validation
            .iter()
            .map(|(step, v)| (*step, v.valid))
            .collect();
    }

    // ─── Navigation ─────────────────────────────────────────────────────────

    /// Move to `step`
    ///
    /// Going back is always allowed. Going forward requires every step from
    /// the current one up to (not including) the target to be valid. Returns
    /// whether `step` is now the current step; out-of-range requests are
    /// ignored.
    pub fn go_to_step(&mut self, step: u8) -> bool {
        if step < 1 || step > self.state.total_steps {
            tracing::trace!(step, "ignoring out-of-range step");
            return false;
        }

        let current = self.state.current_step;
        if step > current {
            if let Some(blocked) = (current..step).find(|s| !self.is_step_valid(*s)) {
                tracing::debug!(from = current, to = step, blocked, "navigation blocked");
                return false;
            }
        }

        if step != current {
            tracing::debug!(from = current, to = step, "step changed");
            self.state.current_step = step;
        }
        true
    }

    pub fn go_to_next_step(&mut self) -> bool {
        let current = self.state.current_step;
        if !self.is_step_valid(current) {
            return false;
        }
        self.go_to_step(current.saturating_add(1))
    }

    pub fn go_to_previous_step(&mut self) -> bool {
        self.go_to_step(self.state.current_step.saturating_sub(1))
    }

    // ─── Flags ──────────────────────────────────────────────────────────────

    pub fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }

    pub fn set_errors(&mut self, errors: BTreeMap<String, String>) {
        self.general_from_auto_save = false;
        self.state.errors = errors;
    }

    /// Mark the current data as saved without touching history
    pub fn clear_dirty_state(&mut self) {
        self.state.is_dirty = false;
    }

    fn set_general_error(&mut self, message: String) {
        self.state.errors.insert(GENERAL_ERROR.to_string(), message);
    }

    fn clear_general_error(&mut self) {
        self.state.errors.remove(GENERAL_ERROR);
        self.general_from_auto_save = false;
    }

    // ─── Collaborators ──────────────────────────────────────────────────────

    /// Fold the latest auto-save outcome into the state
    ///
    /// A failure is reported under `errors.general`. A success clears the
    /// dirty flag only if nothing was edited after the snapshot was taken.
    pub fn poll_auto_save(&mut self) -> Option<AutoSaveStatus> {
        let status = self.auto_saver.as_mut()?.take_status()?;
        match &status {
            AutoSaveStatus::Saved {
                revision,
                at,
                draft_id,
            } => {
                self.state.last_saved_at = Some(*at);
                if self.state.draft_id.is_none() {
                    self.state.draft_id.clone_from(draft_id);
                }
                if *revision == self.revision {
                    self.state.is_dirty = false;
                }
                if self.general_from_auto_save {
                    self.clear_general_error();
                }
            }
            AutoSaveStatus::Failed { message, .. } => {
                self.set_general_error(message.clone());
                self.general_from_auto_save = true;
            }
            AutoSaveStatus::Idle => {}
        }
        Some(status)
    }

    /// Cancel a waiting auto-save or let a running one finish, then fold
    /// its outcome in so the draft id it created is reused
    async fn settle_auto_save(&mut self) {
        if let Some(saver) = self.auto_saver.as_mut() {
            saver.settle().await;
        }
        self.poll_auto_save();
    }

    fn draft_request(&self) -> DraftRequest {
        DraftRequest {
            id: self.state.draft_id.clone(),
            kind: self.kind,
            step: self.state.current_step,
            form_data: Arc::clone(&self.state.form_data),
        }
    }

    /// Save the current data as a draft
    ///
    /// Takes `&mut self`, so saves on one session never overlap. A failure
    /// is written verbatim to `errors.general` and None is returned.
    pub async fn save_draft(&mut self, store: &dyn DraftStore) -> Option<String> {
        // This save covers any edit a waiting auto-save would have written
        self.settle_auto_save().await;
        self.state.is_loading = true;

        let result = store.save_draft(self.draft_request()).await;
        self.state.is_loading = false;

        match result {
            Ok(id) => {
                tracing::info!(id = %id, kind = %self.kind, "draft saved");
                if let Some(handler) = self.auto_saver.as_ref().map(AutoSaver::handler) {
                    handler.adopt_draft_id(&id).await;
                }
                self.state.draft_id = Some(id.clone());
                self.state.last_saved_at = Some(Utc::now());
                self.state.is_dirty = false;
                self.clear_general_error();
                Some(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "draft save failed");
                self.set_general_error(err.to_string());
                self.general_from_auto_save = false;
                None
            }
        }
    }

    /// Publish the listing once every step is valid
    pub async fn complete(&mut self, store: &dyn DraftStore) -> bool {
        self.poll_auto_save();

        if let Some(invalid) = (1..=self.state.total_steps).find(|s| !self.is_step_valid(*s)) {
            tracing::debug!(step = invalid, "publish refused, step invalid");
            self.set_general_error(format!("Step {invalid} is incomplete"));
            self.general_from_auto_save = false;
            return false;
        }

        self.settle_auto_save().await;

        self.state.is_loading = true;
        let result = store.complete(self.draft_request()).await;
        self.state.is_loading = false;

        match result {
            Ok(()) => {
                tracing::info!(kind = %self.kind, "listing published");
                self.state.last_saved_at = Some(Utc::now());
                self.state.is_dirty = false;
                self.clear_general_error();
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "publish failed");
                self.set_general_error(err.to_string());
                self.general_from_auto_save = false;
                false
            }
        }
    }
}

impl fmt::Debug for WizardStateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardStateManager")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("history", &self.history)
            .field("revision", &self.revision)
            .field("auto_saver", &self.auto_saver)
            .finish_non_exhaustive()
    }
}
