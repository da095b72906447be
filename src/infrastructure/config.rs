use crate::domain::error::IqmsError;
use crate::domain::model::QueryClass;
use crate::domain::role::{ActiveRole, Level, Module};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub classes: ClassesConfig,
    #[serde(default)]
    pub role: ActiveRole,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// How a data class talks to the server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Offset-paginated GET, one page at a time
    Incremental,
    /// Single POST returning the full result set
    Batch,
}

/// Where a data class is persisted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON document per namespace
    File,
    /// SQLite rows with compressed payloads, for large classes
    Sqlite,
    /// Process memory only
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ClassSettings {
    pub strategy: FetchStrategy,
    pub store: StoreBackend,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClassesConfig {
    #[serde(default = "default_small_class")]
    pub pending: ClassSettings,
    #[serde(default = "default_small_class")]
    pub transferred: ClassSettings,
    #[serde(default = "default_large_class")]
    pub replied: ClassSettings,
}

impl ClassesConfig {
    pub fn settings(&self, class: QueryClass) -> ClassSettings {
        match class {
            QueryClass::Pending => self.pending,
            QueryClass::Transferred => self.transferred,
            QueryClass::Replied => self.replied,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_enable")]
    pub enable: bool,
    pub path: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enable: true,
            path: None,
            level: "WARN".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for ClassesConfig {
    fn default() -> Self {
        Self {
            pending: default_small_class(),
            transferred: default_small_class(),
            replied: default_large_class(),
        }
    }
}

impl Default for ActiveRole {
    fn default() -> Self {
        Self {
            subsection: "pay-accounts".to_string(),
            module: Module::Pay,
            level: Level::Creator,
            cells: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            retry: RetryConfig::default(),
            classes: ClassesConfig::default(),
            role: ActiveRole::default(),
            logging: Logging::default(),
        }
    }
}

// Defaults
fn default_theme() -> String {
    "plain".to_string()
}
fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_small_class() -> ClassSettings {
    ClassSettings {
        strategy: FetchStrategy::Incremental,
        store: StoreBackend::File,
    }
}
fn default_large_class() -> ClassSettings {
    ClassSettings {
        strategy: FetchStrategy::Incremental,
        store: StoreBackend::Sqlite,
    }
}
fn default_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "WARN".to_string()
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("iqms").join("config.toml"))
}

/// Directory holding cache files, the SQLite store and the active role
pub fn get_data_dir(config: &Config) -> PathBuf {
    if let Some(dir) = config.storage.data_dir.as_deref() {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iqms")
}

pub fn get_database_path(config: &Config) -> PathBuf {
    get_data_dir(config).join("iqms.db")
}

pub fn load_config() -> Result<Config, IqmsError> {
    if let Some(path) = get_config_path() {
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            return Ok(parse_config(&content));
        }
    }

    Ok(Config::default())
}

/// Parse TOML config, falling back to defaults on malformed input
pub fn parse_config(content: &str) -> Config {
    match toml::from_str::<Config>(content) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to parse config file: {}. Using defaults.",
                e
            );
            Config::default()
        }
    }
}

pub fn generate_config_sample() -> Result<(), IqmsError> {
    let config_path = get_config_path();

    if let Some(path) = config_path {
        if path.exists() {
            eprintln!("Config file already exists at: {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let sample = Config::default();
        let toml_content = toml::to_string_pretty(&sample)
            .map_err(|e| IqmsError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, toml_content)
            .map_err(|e| IqmsError::Config(format!("Failed to write config file: {}", e)))?;
        println!("Generated config file at: {}", path.display());
    } else {
        return Err(IqmsError::Config(
            "Cannot determine config directory".to_string(),
        ));
    }

    Ok(())
}

fn active_role_path(config: &Config) -> PathBuf {
    get_data_dir(config).join("active_role.json")
}

/// The role persisted by the last switch, or the configured role
pub fn load_active_role(config: &Config) -> ActiveRole {
    let path = active_role_path(config);
    let Ok(content) = fs::read_to_string(&path) else {
        return config.role.clone();
    };
    match serde_json::from_str(&content) {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!("ignoring unreadable active role at {}: {}", path.display(), e);
            config.role.clone()
        }
    }
}

pub fn save_active_role(config: &Config, role: &ActiveRole) -> Result<(), IqmsError> {
    let path = active_role_path(config);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_vec_pretty(role)?)?;
    Ok(())
}
