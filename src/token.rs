use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    /// Builds a pair only when both tokens are present and non-empty.
    pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Option<Self> {
        match (access_token, refresh_token) {
            (Some(access_token), Some(refresh_token))
                if !access_token.is_empty() && !refresh_token.is_empty() =>
            {
                Some(Self {
                    access_token,
                    refresh_token,
                })
            }
            _ => None,
        }
    }
}

/// Default cache location, `~/.cache/nebroker/token.json` on Linux.
pub fn default_token_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("nebroker/token.json"))
        .unwrap_or_else(|| PathBuf::from("tmp/token"))
}

/// Single-record on-disk store for the current [`TokenPair`].
///
/// The file existing is the only signal that tokens are available.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<TokenPair> {
        let content =
            fs::read_to_string(&self.path).map_err(|err| Error::io(&self.path, err))?;
        let token: TokenPair = serde_json::from_str(&content)?;
        Ok(token)
    }

    pub fn save(&self, token: &TokenPair) -> Result<()> {
        let json = serde_json::to_string_pretty(token)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }

        // Staged then renamed: readers only ever see a complete record.
        let staging = self.staging_path();
        let mut file = fs::File::create(&staging).map_err(|err| Error::io(&staging, err))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|err| Error::io(&staging, err))?;
        drop(file);
        fs::rename(&staging, &self.path).map_err(|err| Error::io(&self.path, err))?;
        debug!(path = %self.path.display(), "saved token cache");
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed token cache");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(&self.path, err)),
        }
    }
}
