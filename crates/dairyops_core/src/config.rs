//! Process-wide planner configuration.
//!
//! # Responsibility
//! - Hold the values every client handle is built from.
//! - Load them from TOML, then let `DAIRYOPS_*` environment variables win.
//!
//! # Invariants
//! - A config that passed [`PlannerConfig::validate`] yields a usable window,
//!   a non-blank app id and a valid default plan id.
//! - Blank environment values are ignored rather than clearing a field.

use crate::model::plan::{PlanId, PlanIdError, DEFAULT_PLAN_ID};
use crate::timeline::geometry::{TimeWindow, WindowError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_APP_ID: &str = "dairy-planner-production";
pub const DEFAULT_ANONYMOUS_USER_ID: &str = "local-operator";
pub const DEFAULT_SAVE_INDICATOR_FLOOR_MS: u64 = 800;
const DATABASE_FILE_NAME: &str = "dairyops.sqlite3";

pub const ENV_APP_ID: &str = "DAIRYOPS_APP_ID";
pub const ENV_PLAN_ID: &str = "DAIRYOPS_PLAN_ID";
pub const ENV_AUTH_TOKEN: &str = "DAIRYOPS_AUTH_TOKEN";
pub const ENV_DB_PATH: &str = "DAIRYOPS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DAIRYOPS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DAIRYOPS_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Namespace segment of every document path.
    pub app_id: String,
    pub default_plan_id: String,
    pub window: TimeWindow,
    /// Minimum time the saving indicator stays lit after a write settles.
    pub save_indicator_floor_ms: u64,
    /// Custom identity token; absent means the anonymous identity.
    pub auth_token: Option<String>,
    pub anonymous_user_id: String,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            default_plan_id: DEFAULT_PLAN_ID.to_string(),
            window: TimeWindow::default(),
            save_indicator_floor_ms: DEFAULT_SAVE_INDICATOR_FLOOR_MS,
            auth_token: None,
            anonymous_user_id: DEFAULT_ANONYMOUS_USER_ID.to_string(),
            database_path: None,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    BlankField(&'static str),
    Window(WindowError),
    PlanId(PlanIdError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config file `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::BlankField(field) => write!(f, "config field `{field}` cannot be blank"),
            Self::Window(err) => write!(f, "invalid window: {err}"),
            Self::PlanId(err) => write!(f, "invalid default_plan_id: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Window(err) => Some(err),
            Self::PlanId(err) => Some(err),
            Self::BlankField(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<WindowError> for ConfigError {
    fn from(value: WindowError) -> Self {
        Self::Window(value)
    }
}

impl From<PlanIdError> for ConfigError {
    fn from(value: PlanIdError) -> Self {
        Self::PlanId(value)
    }
}

impl PlannerConfig {
    /// Parses TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, applies process environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `lookup(DAIRYOPS_*)`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read(ENV_APP_ID) {
            self.app_id = value;
        }
        if let Some(value) = read(ENV_PLAN_ID) {
            self.default_plan_id = value;
        }
        if let Some(value) = read(ENV_AUTH_TOKEN) {
            self.auth_token = Some(value);
        }
        if let Some(value) = read(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            self.log_level = Some(value);
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::BlankField("app_id"));
        }
        if self.anonymous_user_id.trim().is_empty() {
            return Err(ConfigError::BlankField("anonymous_user_id"));
        }
        PlanId::new(&self.default_plan_id)?;
        self.window.validate()?;
        Ok(())
    }

    /// Plan activated at startup. Falls back to the built-in default when
    /// the configured id is invalid.
    pub fn plan_id(&self) -> PlanId {
        PlanId::new(&self.default_plan_id).unwrap_or_default()
    }

    pub fn save_indicator_floor(&self) -> Duration {
        Duration::from_millis(self.save_indicator_floor_ms)
    }

    /// Configured database file, or one in the system temp directory.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DATABASE_FILE_NAME))
    }
}
