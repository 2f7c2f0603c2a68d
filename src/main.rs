use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use listing_wizard::config::Config;
use listing_wizard::drafts::{DraftRequest, DraftStore, FileDraftStore};
use listing_wizard::form::FormData;
use listing_wizard::import::CsvImporter;
use listing_wizard::logging;
use listing_wizard::preview::{self, market};
use listing_wizard::session;
use listing_wizard::templates::TemplateRegistry;
use listing_wizard::validation::StepRegistry;
use listing_wizard::wizard::{StoreAutoSave, WizardKind, WizardStateManager};

fn parse_kind(s: &str) -> Result<WizardKind, String> {
    WizardKind::from_key(&s.to_lowercase()).ok_or_else(|| {
        let keys: Vec<&str> = WizardKind::all().iter().map(|k| k.as_str()).collect();
        format!("unknown kind '{}', expected one of: {}", s, keys.join(", "))
    })
}

#[derive(Parser)]
#[command(name = "listing-wizard")]
#[command(about = "Validate, import and preview real-estate listings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a listing JSON file step by step
    Validate {
        file: PathBuf,

        /// Wizard kind (property, land, blog)
        #[arg(short, long, default_value = "property", value_parser = parse_kind)]
        kind: WizardKind,
    },

    /// Replay a scripted wizard session against a listing
    Session {
        /// Initial form data (JSON)
        file: PathBuf,

        /// JSON array of operations to replay
        #[arg(short, long)]
        script: PathBuf,

        #[arg(short, long, default_value = "property", value_parser = parse_kind)]
        kind: WizardKind,

        /// Auto-save into the drafts directory while replaying
        #[arg(long)]
        auto_save: bool,
    },

    /// Import listings from CSV files
    Import {
        /// File or glob pattern, e.g. 'exports/*.csv'
        pattern: String,

        #[arg(short, long, default_value = "property", value_parser = parse_kind)]
        kind: WizardKind,

        /// Save every imported record as a draft
        #[arg(long)]
        save: bool,
    },

    /// Show the SEO snippet and social card for a listing
    Preview {
        file: PathBuf,

        #[arg(short, long, default_value = "property", value_parser = parse_kind)]
        kind: WizardKind,
    },

    /// Compare a listing's price per m² with comparables from a CSV file
    Compare {
        file: PathBuf,

        #[arg(long)]
        comparables: PathBuf,
    },

    /// List templates, or apply one to a listing file
    Templates {
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<WizardKind>,

        /// Template key to apply
        #[arg(long, requires = "to")]
        apply: Option<String>,

        /// Listing file the template is applied to (rewritten in place)
        #[arg(long)]
        to: Option<PathBuf>,
    },

    /// Write the effective configuration to .listing-wizard/config.toml
    Init {
        /// Overwrite an existing project config
        #[arg(long)]
        force: bool,
    },

    /// Inspect saved drafts
    Drafts {
        #[command(subcommand)]
        command: Option<DraftsCommand>,
    },
}

#[derive(Subcommand)]
enum DraftsCommand {
    /// List drafts, newest first
    List,
    /// Print one draft as JSON
    Show { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = logging::init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Validate { file, kind } => cmd_validate(&config, &file, kind)?,
        Commands::Session {
            file,
            script,
            kind,
            auto_save,
        } => cmd_session(&config, &file, &script, kind, auto_save).await?,
        Commands::Import {
            pattern,
            kind,
            save,
        } => cmd_import(&config, &pattern, kind, save).await?,
        Commands::Preview { file, kind } => cmd_preview(&config, &file, kind)?,
        Commands::Compare { file, comparables } => cmd_compare(&config, &file, &comparables)?,
        Commands::Templates { kind, apply, to } => cmd_templates(&config, kind, apply, to)?,
        Commands::Init { force } => cmd_init(&config, force)?,
        Commands::Drafts { command } => {
            cmd_drafts(&config, command.unwrap_or(DraftsCommand::List)).await?
        }
    }

    if let Some(log_path) = logging_handle.log_file_path {
        if log_path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            eprintln!("Session log: {}", log_path.display());
        }
    }

    Ok(())
}

fn read_form(path: &Path) -> Result<FormData> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match FormData::from_value(value) {
        Some(data) => Ok(data),
        None => bail!("{} must contain a JSON object", path.display()),
    }
}

fn write_form(path: &Path, data: &FormData) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize form data")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn cmd_validate(config: &Config, file: &Path, kind: WizardKind) -> Result<()> {
    let data = kind.defaults().merged(&read_form(file)?);
    let registry = StepRegistry::for_kind(kind, &config.validation_rules());
    let results = registry.validate_all(&data);

    println!("{} listing: {}", kind.display_name(), file.display());
    println!("{}", "─".repeat(60));

    for step in registry.steps() {
        let Some(result) = results.get(&step.number) else {
            continue;
        };
        let icon = if result.valid { "✓" } else { "✗" };
        println!(
            "{} {}. {:<14} {:>3}%",
            icon, step.number, step.title, result.completion_percent
        );
        for (field, message) in &result.field_errors {
            println!("      {}: {}", field, message);
        }
    }

    if results.values().any(|r| !r.valid) {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_session(
    config: &Config,
    file: &Path,
    script: &Path,
    kind: WizardKind,
    auto_save: bool,
) -> Result<()> {
    let initial = read_form(file)?;
    let ops = session::load_script(script)?;
    let store = Arc::new(FileDraftStore::new(config.drafts_path()));

    let mut options = config.wizard_options();
    if auto_save {
        let handler = Arc::new(StoreAutoSave::new(store.clone(), kind, None));
        options = options.with_auto_save(handler, config.auto_save_interval());
    }

    let mut manager = WizardStateManager::new(kind, Some(initial), options);
    let outcomes = session::replay(&mut manager, ops, store.as_ref()).await;

    // Let a pending auto-save land before the manager is dropped
    if manager.auto_save_pending() {
        tokio::time::sleep(config.auto_save_interval() + Duration::from_millis(250)).await;
        manager.poll_auto_save();
    }

    for outcome in &outcomes {
        let op = serde_json::to_value(&outcome.op)?;
        let name = op.get("op").and_then(|v| v.as_str()).unwrap_or("?");
        let mark = if outcome.applied { "✓" } else { "·" };
        print!(
            "{} #{:<3} {:<12} step {} {}",
            mark,
            outcome.index,
            name,
            outcome.current_step,
            if outcome.is_dirty { "(dirty)" } else { "" }
        );
        match &outcome.error {
            Some(err) => println!("  error: {}", err),
            None => println!(),
        }
    }

    println!();
    println!("{}", serde_json::to_string_pretty(manager.wizard_state())?);
    Ok(())
}

async fn cmd_import(config: &Config, pattern: &str, kind: WizardKind, save: bool) -> Result<()> {
    let paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid pattern '{}'", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    if paths.is_empty() {
        println!("No files match '{}'", pattern);
        return Ok(());
    }

    let importer = CsvImporter::new(config.import_options(kind)?);
    let store = FileDraftStore::new(config.drafts_path());
    let total_steps = StepRegistry::for_kind(kind, &config.validation_rules()).len();

    for path in paths {
        let report = importer
            .import_path(&path)
            .with_context(|| format!("Failed to import {}", path.display()))?;

        println!(
            "{}: {} records ({} complete), {} errors",
            path.display(),
            report.records.len(),
            report.complete_count(),
            report.errors.len()
        );
        if !report.unknown_headers.is_empty() {
            println!("  ignored columns: {}", report.unknown_headers.join(", "));
        }
        if report.truncated {
            println!("  stopped at {} rows", importer.options().max_rows);
        }
        for error in &report.errors {
            println!("  line {}: {}", error.row, error.message);
        }

        if save {
            for record in report.records {
                // Resume at the first step that still needs input
                let step = record
                    .invalid_steps()
                    .first()
                    .copied()
                    .unwrap_or(total_steps);
                let id = store
                    .save_draft(DraftRequest {
                        id: None,
                        kind,
                        step,
                        form_data: Arc::new(record.data),
                    })
                    .await
                    .with_context(|| format!("Failed to save line {} as a draft", record.row))?;
                println!("  line {} -> draft {}", record.row, id);
            }
        }
    }
    Ok(())
}

fn cmd_preview(config: &Config, file: &Path, kind: WizardKind) -> Result<()> {
    let data = read_form(file)?;
    let preview = preview::build(kind, &data, &config.seo);

    let seo = &preview.seo;
    println!("SEO (score {}/100)", seo.score);
    println!("{}", "─".repeat(60));
    println!("  {}", seo.title);
    println!("  {}", seo.canonical_url);
    println!("  {}", seo.description);
    if !seo.keywords.is_empty() {
        println!("  keywords: {}", seo.keywords.join(", "));
    }
    for issue in &seo.issues {
        println!("  ! {}", issue);
    }

    println!();
    println!("Social card");
    println!("{}", "─".repeat(60));
    for (property, content) in preview.social.meta_tags() {
        println!("  {:<22} {}", property, content);
    }
    Ok(())
}

fn cmd_compare(config: &Config, file: &Path, comparables: &Path) -> Result<()> {
    let subject = read_form(file)?;
    let importer = CsvImporter::new(config.import_options(WizardKind::Property)?);
    let report = importer
        .import_path(comparables)
        .with_context(|| format!("Failed to read comparables from {}", comparables.display()))?;
    let listings: Vec<FormData> = report.records.into_iter().map(|r| r.data).collect();

    let comparison = market::compare(&subject, &listings)?;
    let scope = match comparison.scope {
        market::ComparisonScope::SameCity => "same type and city",
        market::ComparisonScope::PropertyType => "same type, all cities",
    };

    println!("Price per m²:   {:.0}", comparison.price_per_m2);
    println!(
        "Market median:  {:.0} ({} comparables, {})",
        comparison.median_price_per_m2, comparison.comparable_count, scope
    );
    println!("Market mean:    {:.0}", comparison.mean_price_per_m2);
    println!(
        "Difference:     {:+.1}% ({})",
        comparison.percent_diff, comparison.position
    );
    Ok(())
}

fn cmd_templates(
    config: &Config,
    kind: Option<WizardKind>,
    apply: Option<String>,
    to: Option<PathBuf>,
) -> Result<()> {
    let registry = TemplateRegistry::load(&config.templates_path())?;

    if let (Some(key), Some(path)) = (apply, to) {
        let kind = match kind {
            Some(kind) => kind,
            None => match registry.get(&key) {
                Some(template) => template.kind,
                None => bail!("Template '{}' not found", key),
            },
        };
        let data = read_form(&path)?;
        let patch = registry.apply(&key, kind, &data)?;
        write_form(&path, &data.merged(&patch))?;
        println!(
            "Applied '{}' to {} ({} fields)",
            key,
            path.display(),
            patch.len()
        );
        return Ok(());
    }

    let templates: Vec<_> = match kind {
        Some(kind) => registry.for_kind(kind),
        None => registry.all().collect(),
    };
    if templates.is_empty() {
        println!("No templates");
        return Ok(());
    }
    for template in templates {
        println!(
            "{:<18} {:<9} {}",
            template.key,
            template.kind.as_str(),
            template.description
        );
    }
    Ok(())
}

fn cmd_init(config: &Config, force: bool) -> Result<()> {
    let path = Config::project_config_path();
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let path = config.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn cmd_drafts(config: &Config, command: DraftsCommand) -> Result<()> {
    let store = FileDraftStore::new(config.drafts_path());
    match command {
        DraftsCommand::List => {
            let drafts = store.list().await?;
            if drafts.is_empty() {
                println!("No drafts in {}", store.dir().display());
                return Ok(());
            }
            println!("Drafts ({})", drafts.len());
            println!("{}", "─".repeat(60));
            for draft in drafts {
                println!(
                    "{} {:<9} step {} {}  {}",
                    if draft.published { "●" } else { "○" },
                    draft.kind.as_str(),
                    draft.step,
                    draft.updated_at.format("%Y-%m-%d %H:%M"),
                    draft.id
                );
                if !draft.title.is_empty() {
                    println!("    {}", draft.title);
                }
            }
        }
        DraftsCommand::Show { id } => {
            let draft = store.load(&id).await?;
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
    }
    Ok(())
}
