// ============================================================
// Layer 6 — Settings
// ============================================================
// Two sources, read once at startup and then passed around by
// reference:
//
//   1. Folders      — environment variables (a `.env` file in the
//                     working directory is honoured), each with a
//                     default derived from MAIN_FOLDER:
//
//        MAIN_FOLDER           current directory
//        OUTPUTS_FOLDER        <main>/outputs
//        DATASETS_FOLDER       <main>/datasets
//        PATH_CUSTOM_SETTINGS  <main>/configuration.json
//
//   2. CustomSettings — the JSON document at PATH_CUSTOM_SETTINGS.
//      Known sections are typed; every other key is kept verbatim
//      in `extra` so a snapshot reproduces the whole document.
//
// A missing document falls back to a small built-in mapping and
// logs a warning. A document that exists but does not parse is an
// error.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::descriptor::{
    AugmentationDescriptor, ComponentDescriptor, EncoderDescriptor, SslFrameworkDescriptor,
};

// ─── Folders ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folders {
    pub main:            PathBuf,
    pub outputs:         PathBuf,
    pub datasets:        PathBuf,
    pub custom_settings: PathBuf,
}

impl Folders {
    /// Read the folders from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
        Ok(Self::from_lookup(|key| std::env::var(key).ok(), cwd))
    }

    /// Resolve the folders through `lookup`, defaulting MAIN_FOLDER to `default_main`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, default_main: PathBuf) -> Self {
        let main = lookup("MAIN_FOLDER").map(PathBuf::from).unwrap_or(default_main);
        let path_or = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Self {
            outputs:         path_or("OUTPUTS_FOLDER", main.join("outputs")),
            datasets:        path_or("DATASETS_FOLDER", main.join("datasets")),
            custom_settings: path_or("PATH_CUSTOM_SETTINGS", main.join("configuration.json")),
            main,
        }
    }

    /// Where SSL pre-training runs are written.
    pub fn component_output(&self) -> PathBuf {
        self.outputs.join("ssl_training")
    }
}

// ─── Typed sections ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupConfig {
    pub batch_size: usize,
    pub epochs:     usize,
    #[serde(default = "default_lr")]
    pub lr:         f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreProcessingConfig {
    /// Clip length in seconds
    pub max_length: f64,
    pub target_sr:  u32,
}

/// Training-loop settings of the SSL pre-training run. The batch
/// size lives on the framework descriptor (`ssl_model.ssl.batch_size`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SslConfig {
    pub epochs: usize,
    #[serde(default = "default_lr")]
    pub lr: f64,
    #[serde(default = "default_patience")]
    pub patience: usize,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SslModelConfig {
    pub encoder: EncoderDescriptor,
    pub ssl:     SslFrameworkDescriptor,
}

fn default_lr() -> f64 {
    1e-3
}

fn default_patience() -> usize {
    15
}

fn default_num_workers() -> usize {
    2
}

// ─── CustomSettings ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sup_config: Option<SupConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_processing_config: Option<PreProcessingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<ComponentDescriptor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augmentations: Option<Vec<AugmentationDescriptor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_config: Option<SslConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_model: Option<SslModelConfig>,

    /// Every key without a typed section above (`pre_processing`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CustomSettings {
    /// The mapping used when no settings document exists.
    fn default() -> Self {
        let mut extra = Map::new();
        extra.insert("key".into(), json!({ "default": "value" }));
        extra.insert(
            "pre_processing".into(),
            json!({ "some_config_preprocessing": "values" }),
        );

        Self {
            sup_config:            None,
            pre_processing_config: None,
            transforms:            None,
            augmentations:         None,
            ssl_config:            None,
            ssl_model:             None,
            extra,
        }
    }
}

impl CustomSettings {
    /// Parse the document at `path`, or fall back to the default mapping
    /// when there is no file there.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                "No settings document at '{}', using the built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read settings '{}'", path.display()))?;
        let settings = serde_json::from_str(&json)
            .with_context(|| format!("Malformed settings document '{}'", path.display()))?;

        tracing::info!("Loaded settings from '{}'", path.display());
        Ok(settings)
    }

    pub fn sup_config(&self) -> Result<&SupConfig> {
        self.sup_config.as_ref().context("Settings have no 'sup_config' section")
    }

    pub fn pre_processing_config(&self) -> Result<&PreProcessingConfig> {
        self.pre_processing_config
            .as_ref()
            .context("Settings have no 'pre_processing_config' section")
    }

    pub fn ssl_config(&self) -> Result<&SslConfig> {
        self.ssl_config.as_ref().context("Settings have no 'ssl_config' section")
    }

    pub fn ssl_model(&self) -> Result<&SslModelConfig> {
        self.ssl_model.as_ref().context("Settings have no 'ssl_model' section")
    }
}

// ─── Settings ─────────────────────────────────────────────────────────────────
/// Everything a run reads from its environment.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub folders: Folders,
    pub custom:  CustomSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_folders(Folders::from_env()?)
    }

    pub fn from_folders(folders: Folders) -> Result<Self> {
        let custom = CustomSettings::load_or_default(&folders.custom_settings)?;
        Ok(Self { folders, custom })
    }

    /// Resolve a path from the settings against the main folder.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.folders.main.join(path)
        }
    }
}

/// Timestamped identifier naming one run directory.
pub fn generate_experiment_id(prefix: &str) -> String {
    let ts = Local::now().format("%Y%m%d_%H%M%S_%3f");
    if prefix.is_empty() {
        ts.to_string()
    } else {
        format!("{prefix}_{ts}")
    }
}
