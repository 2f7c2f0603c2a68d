use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::import::{ImportOptions, DEFAULT_MAX_ROWS};
use crate::preview::PreviewSettings;
use crate::validation::{CountryBounds, ValidationRules};
use crate::wizard::{WizardKind, WizardOptions, DEFAULT_MAX_HISTORY_SIZE};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub wizard: WizardConfig,
    /// Bounding box listings must fall inside
    #[serde(default)]
    pub location: CountryBounds,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub seo: PreviewSettings,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WizardConfig {
    /// Undo steps kept per session (0 disables undo)
    #[serde(default = "default_max_history_size")]
    pub max_history_size: usize,
    /// Quiet period before an auto-save, in milliseconds (0 disables auto-save)
    #[serde(default = "default_auto_save_interval_ms")]
    pub auto_save_interval_ms: u64,
    /// Upper bound on gallery size
    #[serde(default = "default_max_images")]
    pub max_images: usize,
}

fn default_max_history_size() -> usize {
    DEFAULT_MAX_HISTORY_SIZE
}

fn default_auto_save_interval_ms() -> u64 {
    2000
}

fn default_max_images() -> usize {
    30
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            max_history_size: default_max_history_size(),
            auto_save_interval_ms: default_auto_save_interval_ms(),
            max_images: default_max_images(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportConfig {
    /// `,`, `;` or `tab`; detected from the header line when unset
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_rows: default_max_rows(),
        }
    }
}

impl ImportConfig {
    pub fn delimiter_byte(&self) -> Result<Option<u8>> {
        let Some(raw) = self.delimiter.as_deref() else {
            return Ok(None);
        };
        match raw {
            "" | "auto" => Ok(None),
            "tab" | "\\t" | "\t" => Ok(Some(b'\t')),
            s if s.len() == 1 && s.is_ascii() => Ok(Some(s.as_bytes()[0])),
            other => bail!("Invalid import delimiter '{}': expected a single character or 'tab'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PathsConfig {
    /// Root for drafts, user templates and logs
    #[serde(default = "default_state_path")]
    pub state: String,
    /// Overrides `<state>/drafts`
    #[serde(default)]
    pub drafts: Option<String>,
    /// Overrides `<state>/templates`
    #[serde(default)]
    pub templates: Option<String>,
}

fn default_state_path() -> String {
    ".listing-wizard".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_path(),
            drafts: None,
            templates: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to `<state>/logs` instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

fn absolute(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

impl Config {
    /// Path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".listing-wizard/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the wizard works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/listing-wizard/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("listing-wizard").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LISTING_WIZARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .listing-wizard/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::project_config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        absolute(&self.paths.state)
    }

    pub fn drafts_path(&self) -> PathBuf {
        match &self.paths.drafts {
            Some(path) => absolute(path),
            None => self.state_path().join("drafts"),
        }
    }

    pub fn templates_path(&self) -> PathBuf {
        match &self.paths.templates {
            Some(path) => absolute(path),
            None => self.state_path().join("templates"),
        }
    }

    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_millis(self.wizard.auto_save_interval_ms)
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            bounds: self.location.clone(),
            max_images: self.wizard.max_images,
        }
    }

    /// Session options without collaborators; attach auto-save separately
    pub fn wizard_options(&self) -> WizardOptions {
        WizardOptions::default()
            .with_max_history_size(self.wizard.max_history_size)
            .with_rules(self.validation_rules())
    }

    pub fn import_options(&self, kind: WizardKind) -> Result<ImportOptions> {
        Ok(ImportOptions {
            kind,
            delimiter: self.import.delimiter_byte()?,
            max_rows: self.import.max_rows,
            rules: self.validation_rules(),
        })
    }
}
