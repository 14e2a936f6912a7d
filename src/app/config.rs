use crate::app::models::BatchPolicy;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "local";
pub const DEFAULT_ENGINE: &str = "ollama";
pub const DEFAULT_SELECTOR: &str = "fzf";
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Well-known locations under the LocalMind home directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
}

impl Paths {
    /// `$LOCALMIND_HOME` if set, otherwise `~/.localmind`.
    pub fn discover() -> Result<Self> {
        if let Some(home) = env::var_os("LOCALMIND_HOME").filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(home)));
        }
        let user_home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::at(user_home.join(".localmind")))
    }

    pub fn at(home: PathBuf) -> Self {
        Self { home }
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// JSON config written by earlier releases; no longer read.
    pub fn legacy_config_file(&self) -> PathBuf {
        self.home.join("config.json")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.home.join("state")
    }
}

/// Typed view of the config document with every default applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_model: String,
    pub outputs_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub recent_files_limit: usize,
    pub engine: String,
    pub selector: String,
    pub batch_policy: BatchPolicy,
}

impl Settings {
    pub fn defaults(paths: &Paths) -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            outputs_dir: paths.home.join("outputs"),
            prompts_dir: paths.home.join("prompts"),
            recent_files_limit: DEFAULT_RECENT_LIMIT,
            engine: DEFAULT_ENGINE.to_string(),
            selector: DEFAULT_SELECTOR.to_string(),
            batch_policy: BatchPolicy::AbortOnFirst,
        }
    }
}

/// Reads the flat `config.toml` mapping. Every call goes back to disk.
pub struct ConfigProvider {
    paths: Paths,
}

impl ConfigProvider {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Missing or unparsable documents degrade to an empty table.
    pub fn load(&self) -> toml::Table {
        let config_path = self.paths.config_file();
        if !config_path.exists() {
            if let Some(legacy) = self.unread_legacy_config() {
                log::warn!(
                    "Found {} but settings are now read from {}; using defaults",
                    legacy.display(),
                    config_path.display()
                );
            } else {
                log::debug!("No config at {}, using defaults", config_path.display());
            }
            return toml::Table::new();
        }
        match read_table(&config_path) {
            Ok(table) => table,
            Err(err) => {
                log::warn!("Ignoring config: {:#}", err);
                toml::Table::new()
            }
        }
    }

    /// A `config.json` that is ignored because no `config.toml` exists.
    pub fn unread_legacy_config(&self) -> Option<PathBuf> {
        let legacy = self.paths.legacy_config_file();
        (legacy.exists() && !self.paths.config_file().exists()).then_some(legacy)
    }

    pub fn settings(&self) -> Settings {
        resolve_settings(&self.load(), &self.paths)
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read config at {:?}", path))?;
    toml::from_str(&content).context(format!("Failed to parse {:?}", path))
}

pub fn resolve_settings(table: &toml::Table, paths: &Paths) -> Settings {
    let mut settings = Settings::defaults(paths);

    if let Some(model) = string_key(table, "default_model").filter(|m| !m.trim().is_empty()) {
        settings.default_model = model;
    }
    if let Some(dir) = string_key(table, "outputs_dir") {
        settings.outputs_dir = expand_tilde(&dir);
    }
    if let Some(dir) = string_key(table, "prompts_dir") {
        settings.prompts_dir = expand_tilde(&dir);
    }
    if let Some(engine) = string_key(table, "engine") {
        settings.engine = engine;
    }
    if let Some(selector) = string_key(table, "selector") {
        settings.selector = selector;
    }

    match table.get("recent_files_limit") {
        None => {}
        Some(value) => match value.as_integer() {
            Some(limit) if limit > 0 => settings.recent_files_limit = limit as usize,
            _ => log::warn!(
                "recent_files_limit must be a positive integer, using {}",
                DEFAULT_RECENT_LIMIT
            ),
        },
    }

    match table.get("continue_on_error") {
        None => {}
        Some(value) => match value.as_bool() {
            Some(true) => settings.batch_policy = BatchPolicy::ContinueOnError,
            Some(false) => settings.batch_policy = BatchPolicy::AbortOnFirst,
            None => log::warn!("continue_on_error must be a boolean, ignoring"),
        },
    }

    settings
}

fn string_key(table: &toml::Table, key: &str) -> Option<String> {
    let value = table.get(key)?;
    match value.as_str() {
        Some(s) => Some(s.to_string()),
        None => {
            log::warn!("Config key '{}' must be a string, using default", key);
            None
        }
    }
}

pub fn expand_tilde(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}
