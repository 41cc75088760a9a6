//! Login chain that turns credentials into a fresh [`TokenPair`].
//!
//! The sequence is strictly ordered: fetch the sign-in page, scrape its
//! authenticity token, post the credentials, read `uid` and `state` from the
//! URL the login redirects to, then exchange those for access and refresh
//! tokens. Any missing piece aborts the chain before the cache is touched.

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    error::{Error, Result},
    scrape::extract_form_field,
    token::{TokenCache, TokenPair},
    transport::Transport,
};

pub const AUTHENTICITY_TOKEN_FIELD: &str = "authenticity_token";
pub const EXCHANGE_PATH: &str = "api_neauth";

/// Short-lived parameters handed over by the post-login redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHandoff {
    pub uid: String,
    pub state: String,
}

#[derive(Deserialize)]
struct HandoffQuery {
    uid: Option<String>,
    state: Option<String>,
}

impl AuthorizationHandoff {
    /// Reads `uid` and `state` from the query string; both must be non-empty.
    pub fn from_url(url: &Url) -> Option<Self> {
        let query: HandoffQuery = serde_urlencoded::from_str(url.query()?).ok()?;
        match (query.uid, query.state) {
            (Some(uid), Some(state)) if !uid.is_empty() && !state.is_empty() => {
                Some(Self { uid, state })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExchangeResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl ExchangeResponse {
    pub fn into_token_pair(self) -> Option<TokenPair> {
        TokenPair::from_parts(self.access_token, self.refresh_token)
    }
}

pub fn sign_in_url(config: &AppConfig) -> Result<Url> {
    let base = format!("{}/users/sign_in", config.base_server.trim_end_matches('/'));
    Ok(Url::parse_with_params(&base, &[("client_id", &config.client_id)])?)
}

pub fn api_url(config: &AppConfig, path: &str) -> Result<Url> {
    let url = format!(
        "{}/{}",
        config.api_server.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&url)?)
}

/// Runs the login chain and overwrites the cache with the new tokens.
pub async fn authenticate(
    config: &AppConfig,
    transport: &Transport,
    cache: &TokenCache,
) -> Result<TokenPair> {
    let token = acquire_tokens(config, transport).await?;
    cache.save(&token)?;
    info!("obtained new access and refresh tokens");
    Ok(token)
}

/// Runs the login chain without persisting anything.
pub async fn acquire_tokens(config: &AppConfig, transport: &Transport) -> Result<TokenPair> {
    let handoff = login(config, transport).await?;
    exchange(config, transport, &handoff).await
}

async fn fetch_authenticity_token(transport: &Transport, sign_in: &Url) -> Result<String> {
    debug!(url = %sign_in, "fetching login page");
    let page = transport.get(sign_in.clone()).await?;

    match extract_form_field(&page.body, AUTHENTICITY_TOKEN_FIELD) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::Scrape {
            url: sign_in.to_string(),
            status: page.status,
            body: page.body,
        }),
    }
}

async fn login(config: &AppConfig, transport: &Transport) -> Result<AuthorizationHandoff> {
    let sign_in = sign_in_url(config)?;
    let authenticity_token = fetch_authenticity_token(transport, &sign_in).await?;

    debug!(login_id = %config.login_id, "submitting credentials");
    let form = [
        ("user[login_code]", config.login_id.as_str()),
        ("user[password]", config.login_password.as_str()),
        (AUTHENTICITY_TOKEN_FIELD, authenticity_token.as_str()),
    ];
    let res = transport.post_form(sign_in, &form).await?;

    AuthorizationHandoff::from_url(&res.url).ok_or_else(|| Error::Login {
        url: res.url.to_string(),
        body: res.body,
    })
}

async fn exchange(
    config: &AppConfig,
    transport: &Transport,
    handoff: &AuthorizationHandoff,
) -> Result<TokenPair> {
    debug!("exchanging uid/state for tokens");
    let form = [
        ("uid", handoff.uid.as_str()),
        ("state", handoff.state.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];
    let res = transport
        .post_form(api_url(config, EXCHANGE_PATH)?, &form)
        .await?;

    serde_json::from_str::<ExchangeResponse>(&res.body)
        .ok()
        .and_then(ExchangeResponse::into_token_pair)
        .ok_or(Error::Exchange {
            status: res.status,
            body: res.body,
        })
}
