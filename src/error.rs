use reqwest::StatusCode;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of the login chain, the token cache and the API gateway.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The login page no longer carries the hidden authenticity token.
    #[error("authenticity token not found on login page {url} (HTTP {status}); the page URL or markup has changed")]
    Scrape {
        url: String,
        status: StatusCode,
        body: String,
    },

    /// The credential submission did not land on a URL carrying `uid` and `state`.
    #[error("uid/state missing from login redirect {url}; login failed")]
    Login { url: String, body: String },

    #[error("access_token/refresh_token missing from token exchange response (HTTP {status})")]
    Exchange { status: StatusCode, body: String },

    /// The API kept rejecting tokens after a fresh login.
    #[error("API still reports invalid tokens after re-authenticating")]
    TokenRejected { body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid token cache contents: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Raw response body attached to the failure, if the server sent one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Scrape { body, .. }
            | Self::Login { body, .. }
            | Self::Exchange { body, .. }
            | Self::TokenRejected { body } => Some(body),
            _ => None,
        }
    }
}
