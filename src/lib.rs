//! Listing wizard - state management for multi-step real-estate listing forms
//!
//! The core is [`wizard::WizardStateManager`]: one session's form data, undo
//! history, per-step validation, navigation gating and debounced auto-save.
//! Around it sit draft persistence, CSV bulk import, listing templates and
//! publish previews, all usable from the `listing-wizard` CLI.

pub mod config;
pub mod drafts;
pub mod form;
pub mod import;
pub mod logging;
pub mod preview;
pub mod session;
pub mod templates;
pub mod validation;
pub mod wizard;

pub use form::FormData;
pub use wizard::{WizardKind, WizardOptions, WizardState, WizardStateManager};
