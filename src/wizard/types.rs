//! Type definitions for the listing wizards

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use ts_rs::TS;

use crate::form::FormData;

/// Which wizard a session belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum WizardKind {
    #[default]
    Property,
    Land,
    Blog,
}

impl WizardKind {
    pub fn all() -> &'static [WizardKind] {
        &[WizardKind::Property, WizardKind::Land, WizardKind::Blog]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WizardKind::Property => "property",
            WizardKind::Land => "land",
            WizardKind::Blog => "blog",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WizardKind::Property => "Property listing",
            WizardKind::Land => "Land listing",
            WizardKind::Blog => "Blog post",
        }
    }

    pub fn from_key(key: &str) -> Option<WizardKind> {
        match key.trim().to_lowercase().as_str() {
            "property" => Some(WizardKind::Property),
            "land" => Some(WizardKind::Land),
            "blog" => Some(WizardKind::Blog),
            _ => None,
        }
    }

    /// Empty values every new session starts from
    pub fn defaults(&self) -> FormData {
        let empty_address = json!({"street": "", "city": "", "province": ""});
        match self {
            WizardKind::Property => FormData::new()
                .with("title", "")
                .with("description", "")
                .with("price", 0)
                .with("surface", 0)
                .with("propertyType", "")
                .with("characteristics", json!([]))
                .with("address", empty_address)
                .with("images", json!([])),
            WizardKind::Land => FormData::new()
                .with("title", "")
                .with("description", "")
                .with("price", 0)
                .with("surface", 0)
                .with("landType", "")
                .with("address", empty_address)
                .with("images", json!([])),
            WizardKind::Blog => FormData::new()
                .with("title", "")
                .with("content", "")
                .with("category", "")
                .with("coverImage", "")
                .with("metaTitle", "")
                .with("metaDescription", "")
                .with("slug", ""),
        }
    }
}

impl std::fmt::Display for WizardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a wizard session handed to the host view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WizardState {
    pub kind: WizardKind,
    /// 1-indexed, within `1..=total_steps`
    pub current_step: u8,
    pub total_steps: u8,
    #[ts(type = "Record<string, unknown>")]
    pub form_data: Arc<FormData>,
    /// Last computed validity per step
    pub is_valid: BTreeMap<u8, bool>,
    /// Form data changed since the last save/load checkpoint
    pub is_dirty: bool,
    /// A save or publish is in flight
    pub is_loading: bool,
    /// Messages keyed by field, or "general" for operation failures
    pub errors: BTreeMap<String, String>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub last_saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub draft_id: Option<String>,
}

/// Key under which operation failures are reported
pub const GENERAL_ERROR: &str = "general";

/// Step metadata for rendering a progress indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    pub number: u8,
    pub key: &'static str,
    pub title: &'static str,
    pub valid: bool,
    pub completion_percent: u8,
    pub current: bool,
}
