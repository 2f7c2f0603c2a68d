//! Export TypeScript bindings and JSON schemas for host applications
//!
//! Usage: `cargo run --bin generate_types [out_dir]` (default: `bindings/`)

use anyhow::{Context, Result};
use schemars::schema_for;
use std::path::{Path, PathBuf};
use ts_rs::TS;

use listing_wizard::config::Config;
use listing_wizard::form::{LandType, PropertyType};
use listing_wizard::validation::StepValidation;
use listing_wizard::wizard::{WizardKind, WizardState};

fn write(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("  {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bindings"));
    let ts_dir = out_dir.join("ts");
    let schema_dir = out_dir.join("schemas");
    std::fs::create_dir_all(&ts_dir).context("Failed to create TypeScript output directory")?;
    std::fs::create_dir_all(&schema_dir).context("Failed to create schema output directory")?;

    println!("TypeScript bindings:");
    let bindings = [
        ("WizardKind.ts", WizardKind::export_to_string()),
        ("WizardState.ts", WizardState::export_to_string()),
        ("StepValidation.ts", StepValidation::export_to_string()),
        ("PropertyType.ts", PropertyType::export_to_string()),
        ("LandType.ts", LandType::export_to_string()),
    ];
    for (name, binding) in bindings {
        let binding = binding.with_context(|| format!("Failed to export {name}"))?;
        write(&ts_dir, name, &binding)?;
    }

    println!("JSON schemas:");
    let schemas = [
        ("config.schema.json", serde_json::to_string_pretty(&schema_for!(Config))?),
        ("wizard-state.schema.json", serde_json::to_string_pretty(&schema_for!(WizardState))?),
        ("step-validation.schema.json", serde_json::to_string_pretty(&schema_for!(StepValidation))?),
    ];
    for (name, schema) in schemas {
        write(&schema_dir, name, &schema)?;
    }

    Ok(())
}
