//! Multi-step listing wizard: form state, history, navigation gating and auto-save

pub mod autosave;
pub mod history;
mod manager;
pub mod types;

pub use autosave::{AutoSaveHandler, AutoSaveStatus, AutoSaver, StoreAutoSave};
pub use history::{History, HistoryEntry};
pub use manager::{UpdateCallback, WizardOptions, WizardStateManager, DEFAULT_MAX_HISTORY_SIZE};
pub use types::*;
