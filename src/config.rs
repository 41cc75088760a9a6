use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::warn;

/// Flat `key=value` mapping, used for the env file and request parameters.
pub type Params = BTreeMap<String, String>;

pub const DEFAULT_ENV_FILE: &str = "env";

#[derive(Clone)]
pub struct AppConfig {
    pub login_id: String,
    pub login_password: String,
    pub client_id: String,
    pub client_secret: String,
    pub base_server: String,
    pub api_server: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("login_id", &self.login_id)
            .field("client_id", &self.client_id)
            .field("base_server", &self.base_server)
            .field("api_server", &self.api_server)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_params(env: &Params) -> Result<Self> {
        let get = |key: &str| -> Result<String> {
            env.get(key)
                .filter(|value| !value.is_empty())
                .cloned()
                .with_context(|| format!("`{key}` is missing from the env file"))
        };

        Ok(Self {
            login_id: get("LOGIN_ID")?,
            login_password: get("LOGIN_PASSWORD")?,
            client_id: get("CLIENT_ID")?,
            client_secret: get("CLIENT_SECRET")?,
            base_server: get("BASE_SERVER")?,
            api_server: get("API_SERVER")?,
        })
    }
}

/// Parses `key=value` lines.
///
/// Only lines containing exactly one `=` are kept, so values cannot contain
/// `=`. Keys and values are trimmed, lines starting with `#` and empty keys are
/// skipped, and a repeated key keeps its last value.
pub fn parse_kv(text: &str) -> Params {
    let mut params = Params::new();
    for line in text.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let mut parts = line.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        params.insert(key.to_string(), value.trim().to_string());
    }
    params
}

/// Loads request parameters; a missing file means "no parameters".
pub fn load_params(path: &Path) -> Result<Params> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_kv(&text)),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "parameter file not found, sending no parameters");
            Ok(Params::new())
        }
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read parameter file {}", path.display()))
        }
    }
}

/// Resolves the env file: explicit path, then `./env`, then the config dir.
pub fn env_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from(DEFAULT_ENV_FILE);
    if local.exists() {
        return Ok(local);
    }

    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("nebroker")
        .join(DEFAULT_ENV_FILE))
}

pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = env_path(explicit)?;

    if !path.exists() {
        anyhow::bail!(
            "Env file not found at {}\n\n\
            Please create it with the following format:\n\n\
            LOGIN_ID=...\n\
            LOGIN_PASSWORD=...\n\
            CLIENT_ID=...\n\
            CLIENT_SECRET=...\n\
            BASE_SERVER=https://base.example.com/\n\
            API_SERVER=https://api.example.com/",
            path.display()
        );
    }

    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read env file {}", path.display()))?;
    AppConfig::from_params(&parse_kv(&text))
        .with_context(|| format!("Invalid env file {}", path.display()))
}
