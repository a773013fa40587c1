use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::InvoiceDocument;

pub const DEFAULT_PROMPT: &str =
    "Extract all visible invoice data from this image. Map it to the provided JSON structure.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not serialize to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Where exported HTML invoices are written. `~` is expanded.
    pub output_dir: String,
    /// Document used for new sessions and "Reset to Default".
    pub default_document: Option<String>,
    pub extraction: ExtractionSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            output_dir: "~/Documents/Invoices".to_string(),
            default_document: None,
            extraction: ExtractionSettings::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExtractionSettings {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub prompt: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        ExtractionSettings {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl AppSettings {
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.output_dir))
    }

    /// The configured default document, or the built-in one.
    pub fn default_document(&self) -> Result<InvoiceDocument, ConfigError> {
        match &self.default_document {
            Some(path) => load_document(Path::new(&expand_home_dir(path))),
            None => Ok(InvoiceDocument::default()),
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "invoice-designer", "app") {
        return proj_dirs.config_dir().join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

/// Missing file means defaults; a file that exists must parse.
pub fn load_settings_from(path: &Path) -> Result<AppSettings, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "No settings file, using defaults");
        return Ok(AppSettings::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_settings() -> Result<AppSettings, ConfigError> {
    load_settings_from(&config_path())
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let toml_str = toml::to_string_pretty(settings)?;
    fs::write(path, toml_str).map_err(io_err)?;
    info!(path = %path.display(), "Settings saved");
    Ok(())
}

/// Reads a document from `.json`, or TOML for any other extension.
pub fn load_document(path: &Path) -> Result<InvoiceDocument, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Writes a document as JSON or TOML, chosen by extension like [`load_document`].
pub fn save_document(path: &Path, doc: &InvoiceDocument) -> Result<(), ConfigError> {
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let content = if is_json {
        serde_json::to_string_pretty(doc).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::to_string_pretty(doc)?
    };
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
