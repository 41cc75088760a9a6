use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    auth::{api_url, authenticate},
    config::{AppConfig, Params},
    error::{Error, Result},
    token::{TokenCache, TokenPair},
    transport::Transport,
};

/// Response `code` the API uses for expired or revoked tokens.
pub const TOKEN_INVALID_CODE: &str = "002002";

/// Fresh logins allowed per call after the API rejects the tokens.
pub const MAX_REAUTH_ATTEMPTS: u32 = 1;

#[derive(Debug, PartialEq, Eq)]
pub enum ApiCallResult {
    TokenInvalid,
    Completed {
        body: String,
        tokens: Option<TokenPair>,
    },
}

#[derive(Deserialize)]
struct ApiEnvelope {
    code: Option<serde_json::Value>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl ApiCallResult {
    pub fn classify(body: String) -> Self {
        let Ok(envelope) = serde_json::from_str::<ApiEnvelope>(&body) else {
            return Self::Completed { body, tokens: None };
        };

        if envelope.code.as_ref().and_then(|c| c.as_str()) == Some(TOKEN_INVALID_CODE) {
            return Self::TokenInvalid;
        }

        Self::Completed {
            body,
            tokens: TokenPair::from_parts(envelope.access_token, envelope.refresh_token),
        }
    }
}

/// Strips surrounding whitespace and slashes from a request path.
pub fn normalize_path(path: &str) -> &str {
    path.trim_matches(|c: char| c.is_whitespace() || c == '/' || c == '\0')
}

/// Caller parameters with the token fields applied on top.
pub fn request_form(params: &Params, token: &TokenPair) -> Params {
    let mut form = params.clone();
    for key in ["access_token", "refresh_token"] {
        if form.contains_key(key) {
            warn!(key, "parameter file value overridden by cached token");
        }
    }
    form.insert("access_token".to_string(), token.access_token.clone());
    form.insert("refresh_token".to_string(), token.refresh_token.clone());
    form
}

/// Cached tokens, or a fresh login when the cache is absent or unreadable.
pub async fn current_tokens(
    config: &AppConfig,
    transport: &Transport,
    cache: &TokenCache,
) -> Result<TokenPair> {
    if !cache.exists() {
        info!("no cached tokens, logging in");
        return authenticate(config, transport, cache).await;
    }

    match cache.load() {
        Ok(token) => {
            debug!(path = %cache.path().display(), "using cached tokens");
            Ok(token)
        }
        Err(Error::Json(err)) => {
            warn!(path = %cache.path().display(), "token cache is corrupt ({err}), logging in");
            authenticate(config, transport, cache).await
        }
        Err(err) => Err(err),
    }
}

/// Posts `params` to `{api_server}/{path}` with the current tokens attached.
///
/// When the API answers with [`TOKEN_INVALID_CODE`] the cookie jar and token
/// cache are cleared and the call is repeated after a fresh login, at most
/// [`MAX_REAUTH_ATTEMPTS`] times. Returns the raw response body.
pub async fn call_api(
    config: &AppConfig,
    transport: &mut Transport,
    cache: &TokenCache,
    path: &str,
    params: &Params,
) -> Result<String> {
    let url = api_url(config, normalize_path(path))?;
    let mut reauth_attempts = 0;

    loop {
        let token = current_tokens(config, transport, cache).await?;
        info!(%url, "requesting");
        let res = transport
            .post_form(url.clone(), &request_form(params, &token))
            .await?;

        match ApiCallResult::classify(res.body.clone()) {
            ApiCallResult::TokenInvalid if reauth_attempts < MAX_REAUTH_ATTEMPTS => {
                reauth_attempts += 1;
                info!("token rejected by API, logging in again");
                transport.reset_session()?;
                cache.clear()?;
            }
            ApiCallResult::TokenInvalid => {
                return Err(Error::TokenRejected { body: res.body });
            }
            ApiCallResult::Completed { body, tokens } => {
                match tokens {
                    Some(tokens) => cache.save(&tokens)?,
                    None => debug!("response carries no tokens, cache left as is"),
                }
                return Ok(body);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_code_is_token_invalid() {
        assert_eq!(
            ApiCallResult::classify(r#"{"result":"error","code":"002002"}"#.into()),
            ApiCallResult::TokenInvalid
        );
    }

    #[test]
    fn numeric_or_other_codes_complete() {
        for body in [r#"{"code":2002}"#, r#"{"code":"002001"}"#, "not json", "[]"] {
            assert!(matches!(
                ApiCallResult::classify(body.into()),
                ApiCallResult::Completed { tokens: None, .. }
            ));
        }
    }

    #[test]
    fn completed_response_carries_rotated_tokens() {
        let body = r#"{"result":"success","access_token":"a2","refresh_token":"r2"}"#;
        assert_eq!(
            ApiCallResult::classify(body.into()),
            ApiCallResult::Completed {
                body: body.into(),
                tokens: Some(TokenPair {
                    access_token: "a2".into(),
                    refresh_token: "r2".into(),
                }),
            }
        );
    }

    #[test]
    fn path_is_trimmed() {
        assert_eq!(normalize_path(" /api_v1_master_goods/search/ \n"), "api_v1_master_goods/search");
    }

    #[test]
    fn token_fields_override_parameters() {
        let mut params = Params::new();
        params.insert("fields".into(), "goods_id".into());
        params.insert("access_token".into(), "stale".into());
        let token = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };

        let form = request_form(&params, &token);
        assert_eq!(form.get("access_token").map(String::as_str), Some("a"));
        assert_eq!(form.get("refresh_token").map(String::as_str), Some("r"));
        assert_eq!(form.get("fields").map(String::as_str), Some("goods_id"));
    }
}
