//! Per-step validation for the listing wizards
//!
//! Each step owns a pure function `(&FormData) -> StepValidation`. The
//! wizard manager never hardcodes field rules; it looks the validator up in a
//! [`StepRegistry`] by step number and runs it against the current data.

pub mod blog;
pub mod land;
pub mod location;
pub mod property;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::form::FormData;
use crate::wizard::WizardKind;

pub use location::CountryBounds;

/// Outcome of validating one step against the current form data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StepValidation {
    pub valid: bool,
    /// Share of the step's required checks that pass, 0 to 100
    pub completion_percent: u8,
    /// First failing message per field
    pub field_errors: BTreeMap<String, String>,
}

impl StepValidation {
    /// Combine several step results into one, as the preview step does
    pub fn combine(parts: &[StepValidation]) -> StepValidation {
        if parts.is_empty() {
            return StepValidation::default();
        }

        let mut field_errors = BTreeMap::new();
        for part in parts {
            for (field, message) in &part.field_errors {
                field_errors
                    .entry(field.clone())
                    .or_insert_with(|| message.clone());
            }
        }

        let total: u32 = parts.iter().map(|p| u32::from(p.completion_percent)).sum();
        StepValidation {
            valid: parts.iter().all(|p| p.valid),
            completion_percent: (total / parts.len() as u32) as u8,
            field_errors,
        }
    }
}

/// Accumulates rule outcomes for one step
#[derive(Debug, Default)]
pub struct Checks {
    required: u32,
    passed: u32,
    failed_optional: bool,
    field_errors: BTreeMap<String, String>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// A required rule; counts toward completion
    pub fn require(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        self.required += 1;
        if ok {
            self.passed += 1;
        } else {
            self.field_errors
                .entry(field.to_string())
                .or_insert_with(|| message.into());
        }
        self
    }

    /// A constraint on an optional field; only fails the step when violated
    pub fn reject_if(&mut self, field: &str, bad: bool, message: impl Into<String>) -> &mut Self {
        if bad {
            self.failed_optional = true;
            self.field_errors
                .entry(field.to_string())
                .or_insert_with(|| message.into());
        }
        self
    }

    pub fn finish(&mut self) -> StepValidation {
        let completion_percent = if self.required == 0 {
            100
        } else {
            (self.passed * 100 / self.required) as u8
        };
        StepValidation {
            valid: self.passed == self.required && !self.failed_optional,
            completion_percent,
            field_errors: std::mem::take(&mut self.field_errors),
        }
    }
}

/// Character count of a trimmed text value
pub(crate) fn text_len(data: &FormData, key: &str) -> usize {
    data.text(key).chars().count()
}

pub(crate) fn len_between(data: &FormData, key: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&text_len(data, key))
}

pub(crate) fn positive(data: &FormData, key: &str) -> bool {
    data.get_f64(key).is_some_and(|n| n > 0.0)
}

/// Rule parameters that come from configuration rather than the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Bounding box listings must fall inside
    pub bounds: CountryBounds,
    /// Upper bound on gallery size
    pub max_images: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            bounds: CountryBounds::default(),
            max_images: 30,
        }
    }
}

pub type ValidateFn = Arc<dyn Fn(&FormData) -> StepValidation + Send + Sync>;

/// A wizard step and the validator that gates it
#[derive(Clone)]
pub struct StepDefinition {
    /// 1-indexed step number
    pub number: u8,
    /// Stable key (e.g., "general", "location")
    pub key: &'static str,
    /// Human-readable title
    pub title: &'static str,
    validate: ValidateFn,
}

impl StepDefinition {
    pub fn new<F>(number: u8, key: &'static str, title: &'static str, validate: F) -> Self
    where
        F: Fn(&FormData) -> StepValidation + Send + Sync + 'static,
    {
        Self {
            number,
            key,
            title,
            validate: Arc::new(validate),
        }
    }

    pub fn validate(&self, data: &FormData) -> StepValidation {
        (self.validate)(data)
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("number", &self.number)
            .field("key", &self.key)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Ordered step validators for one wizard kind
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl StepRegistry {
    /// Build a registry; steps are renumbered 1..=n in the given order
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, mut step)| {
                step.number = (i + 1) as u8;
                step
            })
            .collect();
        Self { steps }
    }

    /// Built-in steps for a wizard kind
    pub fn for_kind(kind: WizardKind, rules: &ValidationRules) -> Self {
        match kind {
            WizardKind::Property => property::registry(rules),
            WizardKind::Land => land::registry(rules),
            WizardKind::Blog => blog::registry(),
        }
    }

    pub fn len(&self) -> u8 {
        self.steps.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, step: u8) -> Option<&StepDefinition> {
        if step == 0 {
            return None;
        }
        self.steps.get(usize::from(step) - 1)
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Validate one step; unknown steps are reported invalid and empty
    pub fn validate(&self, step: u8, data: &FormData) -> StepValidation {
        self.get(step)
            .map(|def| def.validate(data))
            .unwrap_or_default()
    }

    /// Validate every step, keyed by step number
    pub fn validate_all(&self, data: &FormData) -> BTreeMap<u8, StepValidation> {
        self.steps
            .iter()
            .map(|def| (def.number, def.validate(data)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks_completion_counts_required_rules_only() {
        let result = Checks::new()
            .require("a", true, "a")
            .require("b", false, "b is required")
            .reject_if("c", false, "never")
            .finish();

        assert!(!result.valid);
        assert_eq!(result.completion_percent, 50);
        assert_eq!(result.field_errors.get("b").unwrap(), "b is required");
        assert!(!result.field_errors.contains_key("c"));
    }

    #[test]
    fn test_optional_violation_fails_step_without_changing_completion() {
        let result = Checks::new()
            .require("a", true, "a")
            .reject_if("c", true, "c is malformed")
            .finish();

        assert!(!result.valid);
        assert_eq!(result.completion_percent, 100);
    }

    #[test]
    fn test_first_message_per_field_wins() {
        let result = Checks::new()
            .require("title", false, "first")
            .require("title", false, "second")
            .finish();
        assert_eq!(result.field_errors["title"], "first");
    }

    #[test]
    fn test_combine_averages_completion() {
        let a = Checks::new().require("x", true, "").finish();
        let b = Checks::new().require("y", false, "y missing").finish();
        let combined = StepValidation::combine(&[a, b]);

        assert!(!combined.valid);
        assert_eq!(combined.completion_percent, 50);
        assert_eq!(combined.field_errors.len(), 1);
    }

    #[test]
    fn test_registry_renumbers_and_rejects_unknown_steps() {
        let registry = StepRegistry::new(vec![
            StepDefinition::new(9, "one", "One", |_| StepValidation::default()),
            StepDefinition::new(9, "two", "Two", |_| Checks::new().finish()),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(2).unwrap().key, "two");
        assert!(registry.get(0).is_none());
        assert!(registry.get(3).is_none());
        assert!(registry.validate(2, &FormData::new()).valid);
        assert!(!registry.validate(7, &FormData::new()).valid);
    }
}
