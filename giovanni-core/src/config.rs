use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    ffi::OsString,
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use crate::error::FetchError;

/// Environment variable holding the Earthdata bearer token.
pub const TOKEN_VAR: &str = "EARTHDATA_API_TOKEN";

pub const DEFAULT_ENDPOINT: &str = "https://api.giovanni.earthdata.nasa.gov/timeseries";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Earthdata API token. Guaranteed non-blank; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(raw: impl Into<String>) -> Result<Self, FetchError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(FetchError::Configuration(format!(
                "{TOKEN_VAR} is empty.\n\
                 Hint: set it in the environment or in a .env file next to the binary."
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// Snapshot of the process environment plus an optional `.env` file.
///
/// Nothing is written back into the process environment. A variable set in
/// the process wins over the same key in the file. Process variables whose
/// value isn't Unicode are remembered by name only.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    process: HashMap<String, String>,
    not_unicode: HashSet<String>,
    dotenv: HashMap<String, String>,
}

impl EnvSource {
    pub fn new(
        process: impl IntoIterator<Item = (String, String)>,
        dotenv: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            process: process.into_iter().collect(),
            not_unicode: HashSet::new(),
            dotenv: dotenv.into_iter().collect(),
        }
    }

    /// Capture `std::env::vars_os()` and, if it exists, the file at `dotenv_path`.
    pub fn capture(dotenv_path: &Path) -> Result<Self> {
        let dotenv = if dotenv_path.exists() {
            read_dotenv(dotenv_path)?
        } else {
            debug!(path = %dotenv_path.display(), "no .env file, using process environment only");
            HashMap::new()
        };

        Ok(Self::from_os(std::env::vars_os(), dotenv))
    }

    fn from_os(
        process: impl IntoIterator<Item = (OsString, OsString)>,
        dotenv: HashMap<String, String>,
    ) -> Self {
        let mut vars = HashMap::new();
        let mut not_unicode = HashSet::new();

        for (key, value) in process {
            // Keys that aren't Unicode can't name anything we look up.
            let Ok(key) = key.into_string() else { continue };
            match value.into_string() {
                Ok(value) => {
                    vars.insert(key, value);
                }
                Err(_) => {
                    not_unicode.insert(key);
                }
            }
        }

        Self { process: vars, not_unicode, dotenv }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.process.get(key).or_else(|| self.dotenv.get(key)).map(String::as_str)
    }

    /// True if the process has `key` set to a value that isn't valid Unicode.
    pub fn is_not_unicode(&self, key: &str) -> bool {
        self.not_unicode.contains(key)
    }
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("Failed to open env file: {}", path.display()))?;

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) =
            item.with_context(|| format!("Failed to parse env file: {}", path.display()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Optional on-disk settings.
///
/// Example TOML:
/// endpoint = "https://api.giovanni.earthdata.nasa.gov/timeseries"
/// timeout_secs = 30
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Load settings from the platform config dir, or defaults if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_or_default(Self::config_file_path().as_deref())
    }

    fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("no platform config directory, using default settings");
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Path to the config file, if the platform has a config directory.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "giovanni-fetch", "giovanni-cli")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        if self.timeout_secs == 0 {
            return Err(FetchError::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(FetchError::Configuration("endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything needed to talk to Giovanni, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: ApiToken,
    pub settings: Settings,
}

impl Config {
    /// Read the environment (plus `dotenv_path`, if present) and the settings file.
    pub fn load(dotenv_path: &Path) -> Result<Self> {
        let env = EnvSource::capture(dotenv_path)?;
        let settings = Settings::load()?;
        Ok(Self::from_parts(&env, settings)?)
    }

    pub fn from_parts(env: &EnvSource, settings: Settings) -> Result<Self, FetchError> {
        if env.is_not_unicode(TOKEN_VAR) {
            return Err(FetchError::Configuration(format!(
                "{TOKEN_VAR} is set but is not valid UTF-8"
            )));
        }

        let raw = env.get(TOKEN_VAR).ok_or_else(|| {
            FetchError::Configuration(format!(
                "{TOKEN_VAR} is not set.\n\
                 Hint: export it or add `{TOKEN_VAR}=<token>` to a .env file."
            ))
        })?;

        settings.validate()?;

        Ok(Self { token: ApiToken::new(raw)?, settings })
    }
}
