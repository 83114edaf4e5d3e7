//! Configuration for asr-review.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ASR_REVIEW_API_URL, ASR_REVIEW_MODEL, ASR_REVIEW_EXPORT_DIR)
//! 2. Config file (.asr-review/config.yaml)
//! 3. Defaults (http://localhost:5000, randomized order, built-in taxonomy)
//!
//! Config file discovery:
//! - Searches current directory and parents for .asr-review/config.yaml
//! - Falls back to the user config directory (asr-review/config.yaml)
//! - Paths in config file are relative to the directory holding .asr-review/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Categories offered when the config file names none
pub const DEFAULT_TAXONOMY: &[&str] = &[
    "meaning",
    "fluency",
    "grammar",
    "named_entity",
    "number",
    "medication",
    "negation",
    "hallucination",
    "other",
];

const CONFIG_DIR: &str = ".asr-review";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub taxonomy: Option<Vec<String>>,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Model reviewed when none is given on the command line
    pub model: Option<String>,
    pub randomize: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportConfig {
    /// Export directory (relative to config file)
    pub dir: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base_url: String,
    pub model: Option<String>,
    pub randomize: bool,
    pub taxonomy: Vec<String>,
    pub export_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    let user_config = dirs::config_dir()?.join("asr-review").join(CONFIG_FILE);
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Merge a parsed config file with environment overrides and defaults
fn resolve_config(
    file: Option<(&Path, ConfigFile)>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let current_dir = std::env::current_dir().context("Failed to determine current directory")?;

    let (config_file, config, base_dir) = match file {
        Some((path, config)) => {
            // Base directory is the parent of .asr-review/
            let base_dir = path
                .parent()
                .and_then(|p| p.parent())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| current_dir.clone());
            (Some(path.to_path_buf()), Some(config), base_dir)
        }
        None => (None, None, current_dir.clone()),
    };

    let api_base_url = env("ASR_REVIEW_API_URL")
        .or_else(|| config.as_ref().and_then(|c| c.api.base_url.clone()))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let model = env("ASR_REVIEW_MODEL")
        .or_else(|| config.as_ref().and_then(|c| c.session.model.clone()));

    let randomize = config
        .as_ref()
        .and_then(|c| c.session.randomize)
        .unwrap_or(true);

    let taxonomy = config
        .as_ref()
        .and_then(|c| c.taxonomy.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TAXONOMY.iter().map(|s| s.to_string()).collect());

    let export_dir = if let Some(dir) = env("ASR_REVIEW_EXPORT_DIR") {
        PathBuf::from(dir)
    } else if let Some(dir) = config.as_ref().and_then(|c| c.export.dir.as_deref()) {
        resolve_path(&base_dir, dir)
    } else {
        current_dir
    };

    Ok(ResolvedConfig {
        api_base_url,
        model,
        randomize,
        taxonomy,
        export_dir,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

    match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            resolve_config(Some((&path, config)), &env)
        }
        None => resolve_config(None, &env),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Read the configuration again and return it.
///
/// The cached value behind [`config`] is left as it was; callers that want
/// the fresh values must use the returned config.
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
