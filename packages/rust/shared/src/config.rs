//! Application configuration for contentseed.
//!
//! User config lives at `~/.contentseed/contentseed.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ContentSeedError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contentseed.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contentseed";

/// Environment used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "master";

/// Content Management API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.contentful.com";

// ---------------------------------------------------------------------------
// Config structs (matching contentseed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote API settings.
    #[serde(default)]
    pub contentful: ContentfulConfig,

    /// Creation defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Asset processing poll settings.
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// `[contentful]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentfulConfig {
    /// Name of the env var holding the management token (never store the token itself).
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Target space.
    #[serde(default)]
    pub space_id: String,

    /// Target environment inside the space.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout. Unset means requests may wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ContentfulConfig {
    fn default() -> Self {
        Self {
            access_token_env: default_access_token_env(),
            space_id: String::new(),
            environment: default_environment(),
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

fn default_access_token_env() -> String {
    "CONTENTFUL_MANAGEMENT_TOKEN".into()
}
fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.into()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Build payloads without writing anything remotely.
    #[serde(default)]
    pub dry_run: bool,

    /// Publish created entities. Unset means "publish unless dry-running".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<bool>,

    /// Default template file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<String>,
}

/// `[processing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Delay between asset processing status checks.
    #[serde(default = "default_check_wait_ms")]
    pub check_wait_ms: u64,

    /// Number of status checks before giving up.
    #[serde(default = "default_check_retries")]
    pub check_retries: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            check_wait_ms: default_check_wait_ms(),
            check_retries: default_check_retries(),
        }
    }
}

fn default_check_wait_ms() -> u64 {
    500
}
fn default_check_retries() -> u32 {
    5
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime factory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryOptions {
    pub space_id: String,
    pub environment: String,
    pub dry_run: bool,
    /// Explicit publish choice. Unset publishes unless dry-running.
    pub publish: Option<bool>,
}

impl FactoryOptions {
    /// Options for `space_id` with the defaults: `master`, live run, publishing.
    pub fn new(space_id: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            environment: DEFAULT_ENVIRONMENT.into(),
            dry_run: false,
            publish: None,
        }
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Toggle dry run. Publishing follows it unless set explicitly.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn publish(mut self, publish: bool) -> Self {
        self.publish = Some(publish);
        self
    }

    /// Whether created entities get published.
    pub fn publishes(&self) -> bool {
        self.publish.unwrap_or(!self.dry_run)
    }
}

impl From<&AppConfig> for FactoryOptions {
    fn from(config: &AppConfig) -> Self {
        let dry_run = config.defaults.dry_run;
        Self {
            space_id: config.contentful.space_id.clone(),
            environment: config.contentful.environment.clone(),
            dry_run,
            publish: config.defaults.publish,
        }
    }
}

/// Runtime HTTP client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    pub access_token: String,
    pub base_url: String,
    pub request_timeout: Option<Duration>,
    pub processing_check_wait: Duration,
    pub processing_check_retries: u32,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("processing_check_wait", &self.processing_check_wait)
            .field("processing_check_retries", &self.processing_check_retries)
            .finish()
    }
}

impl ClientConfig {
    /// Client config for `access_token` against the public API with default polling.
    pub fn new(access_token: impl Into<String>) -> Self {
        let processing = ProcessingConfig::default();
        Self {
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: None,
            processing_check_wait: Duration::from_millis(processing.check_wait_ms),
            processing_check_retries: processing.check_retries,
        }
    }

    /// Build from the app config, reading the token from its env var.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            access_token: resolve_access_token(config)?,
            base_url: config.contentful.base_url.clone(),
            request_timeout: config
                .contentful
                .request_timeout_secs
                .map(Duration::from_secs),
            processing_check_wait: Duration::from_millis(config.processing.check_wait_ms),
            processing_check_retries: config.processing.check_retries,
        })
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contentseed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContentSeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contentseed/contentseed.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentSeedError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ContentSeedError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContentSeedError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContentSeedError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContentSeedError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the management token from the env var named in the config.
pub fn resolve_access_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.contentful.access_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ContentSeedError::config(format!(
            "management token not found. Set the {var_name} environment variable."
        ))),
    }
}
