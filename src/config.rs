use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ingestion::wargaming::{EditionProfile, LookupContext};
use crate::ingestion::Result;

const APP_DIR: &str = "rulebook-extract";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// What to extract and with which heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Built-in edition id ("hh1", "hh2").
    pub edition: String,
    /// TOML edition profile that replaces the built-in one.
    pub edition_file: Option<PathBuf>,
    /// JSON lookup context with catalogue rule/wargear/category ids.
    pub lookup_file: Option<PathBuf>,
    /// Number of the first page in the text dump.
    pub first_page: u32,
    /// Pages holding FAQ/errata entries.
    pub faq_pages: Vec<u32>,
}

/// Report output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pretty: bool,
    /// Write reports here instead of stdout.
    pub directory: Option<PathBuf>,
}

/// Logging setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Override the default log directory.
    pub directory: Option<PathBuf>,
    /// Also write JSON logs to a daily rolling file.
    pub json_file: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            edition: "hh2".to_string(),
            edition_file: None,
            lookup_file: None,
            first_page: 1,
            faq_pages: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            directory: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            json_file: false,
        }
    }
}

impl AppConfig {
    /// Read configuration from `path`. A missing file is `Ok(None)`; an
    /// unreadable or unparseable one is an error.
    pub fn try_load_from(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// `~/.config/rulebook-extract/config.toml`, or `config.toml` when there
    /// is no user config directory.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

impl ExtractionConfig {
    /// The edition profile file if one is configured, else the built-in preset.
    pub fn edition_profile(&self) -> Result<EditionProfile> {
        match &self.edition_file {
            Some(path) => EditionProfile::from_toml_file(path),
            None => EditionProfile::for_id(&self.edition),
        }
    }

    /// The configured lookup context, or an empty one.
    pub fn lookup_context(&self) -> Result<LookupContext> {
        match &self.lookup_file {
            Some(path) => LookupContext::from_json_file(path),
            None => Ok(LookupContext::new()),
        }
    }
}

impl OutputConfig {
    /// Where the report for `input` goes, or `None` for stdout.
    pub fn report_path(&self, input: &Path) -> Option<PathBuf> {
        let stem = input.file_stem()?.to_string_lossy();
        self.directory
            .as_ref()
            .map(|dir| dir.join(format!("{stem}.json")))
    }
}

impl LoggingConfig {
    /// Resolved log directory (override or XDG data default).
    pub fn log_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_DIR).join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }
}
