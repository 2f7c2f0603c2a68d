//! Scripted wizard sessions
//!
//! A script is a JSON array of operations replayed against a
//! [`WizardStateManager`], e.g.
//!
//! ```json
//! [
//!   {"op": "update", "data": {"title": "Villa en Cap Cana"}},
//!   {"op": "undo"},
//!   {"op": "goto", "step": 2},
//!   {"op": "save"}
//! ]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::drafts::DraftStore;
use crate::form::FormData;
use crate::wizard::WizardStateManager;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionOp {
    Update { data: FormData },
    Undo,
    Redo,
    Next,
    Previous,
    Goto { step: u8 },
    ClearDirty,
    Save,
    Complete,
}

/// What one operation did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpOutcome {
    pub index: usize,
    pub op: SessionOp,
    /// Whether the operation took effect
    pub applied: bool,
    pub current_step: u8,
    pub is_dirty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn load_script(path: &Path) -> Result<Vec<SessionOp>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid session script {}", path.display()))
}

/// Run `ops` in order; collaborator failures are recorded, not returned
pub async fn replay(
    manager: &mut WizardStateManager,
    ops: Vec<SessionOp>,
    store: &dyn DraftStore,
) -> Vec<OpOutcome> {
    let mut outcomes = Vec::with_capacity(ops.len());
    for (index, op) in ops.into_iter().enumerate() {
        let applied = match &op {
            SessionOp::Update { data } => manager.update_form_data(data.clone()),
            SessionOp::Undo => manager.undo(),
            SessionOp::Redo => manager.redo(),
            SessionOp::Next => manager.go_to_next_step(),
            SessionOp::Previous => manager.go_to_previous_step(),
            SessionOp::Goto { step } => manager.go_to_step(*step),
            SessionOp::ClearDirty => {
                manager.clear_dirty_state();
                true
            }
            SessionOp::Save => manager.save_draft(store).await.is_some(),
            SessionOp::Complete => manager.complete(store).await,
        };

        let error = match op {
            SessionOp::Save | SessionOp::Complete if !applied => {
                manager.errors().get(crate::wizard::GENERAL_ERROR).cloned()
            }
            _ => None,
        };
        tracing::debug!(index, applied, step = manager.current_step(), "session op replayed");
        outcomes.push(OpOutcome {
            index,
            op,
            applied,
            current_step: manager.current_step(),
            is_dirty: manager.is_dirty(),
            error,
        });
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::FileDraftStore;
    use crate::wizard::{WizardKind, WizardOptions};
    use tempfile::TempDir;

    #[test]
    fn test_script_parses() {
        let ops: Vec<SessionOp> = serde_json::from_str(
            r#"[{"op": "update", "data": {"price": 5}}, {"op": "goto", "step": 3}, {"op": "clear_dirty"}]"#,
        )
        .unwrap();
        assert_eq!(ops[1], SessionOp::Goto { step: 3 });
        assert_eq!(ops[2], SessionOp::ClearDirty);
    }

    #[tokio::test]
    async fn test_replay_records_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDraftStore::new(temp_dir.path());
        let mut manager = WizardStateManager::new(WizardKind::Property, None, WizardOptions::default());

        let ops = vec![
            SessionOp::Update {
                data: FormData::new().with("title", "Casa en Constanza"),
            },
            SessionOp::Next,
            SessionOp::Undo,
            SessionOp::Save,
            SessionOp::Complete,
        ];
        let outcomes = replay(&mut manager, ops, &store).await;

        assert!(outcomes[0].applied);
        assert!(!outcomes[1].applied);
        assert!(outcomes[2].applied);
        assert!(outcomes[3].applied);
        assert!(!outcomes[3].is_dirty);
        assert!(!outcomes[4].applied);
        assert_eq!(outcomes[4].error.as_deref(), Some("Step 1 is incomplete"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
