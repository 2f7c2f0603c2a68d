//! Listing templates
//!
//! A template pre-fills common fields for a kind of listing and renders a
//! starter title and description from what the user has entered so far.
//! Built-in templates are embedded; user templates are `*.yaml` files in the
//! configured templates directory and override built-ins with the same key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::form::fields::{Characteristic, PropertyType};
use crate::form::text::format_amount;
use crate::form::FormData;
use crate::wizard::WizardKind;

const BUILTIN_TEMPLATES: &str = include_str!("builtin.yaml");

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("template '{key}' is for {template_kind} listings, not {wizard_kind}")]
    KindMismatch {
        key: String,
        template_kind: WizardKind,
        wizard_kind: WizardKind,
    },

    #[error("failed to parse templates in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid template syntax: {0}")]
    Syntax(#[from] handlebars::TemplateError),

    #[error("failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Pre-filled values and text templates for one kind of listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingTemplate {
    pub key: String,
    pub name: String,
    pub kind: WizardKind,
    /// When to use this template
    #[serde(default)]
    pub description: String,
    /// Values applied to fields the user has left empty
    #[serde(default)]
    pub defaults: FormData,
    #[serde(default)]
    pub title_template: Option<String>,
    #[serde(default)]
    pub description_template: Option<String>,
}

/// Templates by key, user files layered over built-ins
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, ListingTemplate>,
}

impl TemplateRegistry {
    /// Only the embedded templates
    pub fn builtin() -> Result<Self, TemplateError> {
        let mut registry = Self::default();
        registry.add_all(parse_templates(BUILTIN_TEMPLATES, "built-in templates")?);
        Ok(registry)
    }

    /// Built-ins plus every `*.yaml` file in `dir`, if it exists
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut registry = Self::builtin()?;
        registry.load_dir(dir)?;
        Ok(registry)
    }

    /// Layer the templates in `dir` over the current set
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no user templates directory");
            return Ok(0);
        }

        let pattern = dir.join("*.yaml");
        let paths = glob::glob(&pattern.to_string_lossy())
            .map(|paths| paths.filter_map(Result::ok).collect::<Vec<_>>())
            .unwrap_or_default();

        let mut loaded = 0;
        for path in paths {
            let contents = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            let templates = parse_templates(&contents, &path.display().to_string())?;
            for template in &templates {
                if self.templates.contains_key(&template.key) {
                    tracing::info!(key = %template.key, path = %path.display(), "user template overrides existing");
                }
            }
            loaded += templates.len();
            self.add_all(templates);
        }
        tracing::debug!(loaded, dir = %dir.display(), "user templates loaded");
        Ok(loaded)
    }

    fn add_all(&mut self, templates: Vec<ListingTemplate>) {
        for template in templates {
            self.templates.insert(template.key.clone(), template);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ListingTemplate> {
        self.templates.get(key)
    }

    /// All templates, sorted by key
    pub fn all(&self) -> impl Iterator<Item = &ListingTemplate> {
        self.templates.values()
    }

    pub fn for_kind(&self, kind: WizardKind) -> Vec<&ListingTemplate> {
        self.templates.values().filter(|t| t.kind == kind).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Look up `key` and build its patch for a `kind` wizard holding `data`
    pub fn apply(&self, key: &str, kind: WizardKind, data: &FormData) -> Result<FormData, TemplateError> {
        let template = self
            .get(key)
            .ok_or_else(|| TemplateError::NotFound(key.to_string()))?;
        if template.kind != kind {
            return Err(TemplateError::KindMismatch {
                key: key.to_string(),
                template_kind: template.kind,
                wizard_kind: kind,
            });
        }
        apply(template, data)
    }
}

/// Accepts either a YAML list of templates or a single template
fn parse_templates(contents: &str, origin: &str) -> Result<Vec<ListingTemplate>, TemplateError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(contents).map_err(|source| TemplateError::Parse {
            origin: origin.to_string(),
            source,
        })?;
    let parsed = if value.is_sequence() {
        serde_yaml::from_value(value)
    } else {
        serde_yaml::from_value(value).map(|t| vec![t])
    };
    parsed.map_err(|source| TemplateError::Parse {
        origin: origin.to_string(),
        source,
    })
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Render a template string against form data without HTML escaping
pub fn render_template(template: &str, data: &FormData) -> Result<String, TemplateError> {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_template_string("listing", template)?;
    let rendered = hb.render("listing", &render_context(data))?;
    Ok(collapse_whitespace(&rendered))
}

/// Form data plus derived display values
fn render_context(data: &FormData) -> Value {
    let mut context = data.clone().into_value();
    let address = data.get_object("address");
    let address_part = |key: &str| {
        address
            .and_then(|a| a.get(key))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };
    let property_type_name = PropertyType::from_key(data.text("propertyType"))
        .map(|t| t.display_name().to_lowercase())
        .unwrap_or_else(|| "property".to_string());
    let price_formatted = data
        .get_f64("price")
        .filter(|p| *p > 0.0)
        .map(format_amount)
        .unwrap_or_default();

    if let Value::Object(map) = &mut context {
        map.insert("city".to_string(), json!(address_part("city")));
        map.insert("province".to_string(), json!(address_part("province")));
        map.insert("propertyTypeName".to_string(), json!(property_type_name));
        map.insert("priceFormatted".to_string(), json!(price_formatted));
        map.insert(
            "features".to_string(),
            json!(Characteristic::selected_names(data, "characteristics").join(", ")),
        );
    }
    context
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Patch that fills the template's defaults into empty fields and renders
/// the title and description when the user has not written them yet
pub fn apply(template: &ListingTemplate, data: &FormData) -> Result<FormData, TemplateError> {
    let mut patch = FormData::new();
    for (key, value) in template.defaults.iter() {
        if is_blank(data.get(key)) {
            patch.insert(key.clone(), value.clone());
        }
    }

    // Render against what the form will hold once the defaults land
    let preview = data.merged(&patch);
    if let Some(title) = &template.title_template {
        if is_blank(data.get("title")) {
            patch.insert("title", render_template(title, &preview)?);
        }
    }
    if let Some(description) = &template.description_template {
        let field = if template.kind == WizardKind::Blog { "content" } else { "description" };
        if is_blank(data.get(field)) {
            patch.insert(field, render_template(description, &preview)?);
        }
    }

    tracing::debug!(template = %template.key, fields = patch.len(), "template applied");
    Ok(patch)
}
