#![allow(dead_code)]

use mockito::{Matcher, Mock, ServerGuard};
use nebroker::{
    config::AppConfig,
    token::{TokenCache, TokenPair},
    transport::{Transport, TransportSettings},
};
use serde_json::json;
use tempfile::TempDir;

pub const CSRF: &str = "csrf-token+1==";

pub fn login_page(token: &str) -> String {
    format!(
        r#"<html><body><form action="/users/sign_in" method="post">
        <input type="hidden" name="authenticity_token" value="{token}">
        <input type="text" name="user[login_code]">
        </form></body></html>"#
    )
}

pub fn config(server: &ServerGuard) -> AppConfig {
    AppConfig {
        login_id: "user@example.com".into(),
        login_password: "hunter2".into(),
        client_id: "cid".into(),
        client_secret: "csecret".into(),
        base_server: format!("{}/", server.url()),
        api_server: format!("{}/", server.url()),
    }
}

pub fn transport() -> Transport {
    Transport::new(TransportSettings::default()).expect("transport")
}

pub fn cache() -> (TempDir, TokenCache) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = TokenCache::new(dir.path().join("token.json"));
    (dir, cache)
}

pub fn pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.into(),
        refresh_token: refresh.into(),
    }
}

/// Mocks for one full login: page, credentials, redirect target and exchange.
///
/// The sign-in page only answers requests that carry no cookies, so every
/// login has to start from an empty cookie jar.
pub struct LoginMocks {
    pub page: Mock,
    pub submit: Mock,
    pub callback: Mock,
    pub exchange: Mock,
}

impl LoginMocks {
    pub async fn assert(&self) {
        self.page.assert_async().await;
        self.submit.assert_async().await;
        self.callback.assert_async().await;
        self.exchange.assert_async().await;
    }
}

pub async fn mock_login(server: &mut ServerGuard, tokens: &TokenPair, hits: usize) -> LoginMocks {
    let client_query = Matcher::UrlEncoded("client_id".into(), "cid".into());

    let page = server
        .mock("GET", "/users/sign_in")
        .match_query(client_query.clone())
        .match_header("cookie", Matcher::Missing)
        .with_status(200)
        .with_header("set-cookie", "_session=abc123; Path=/")
        .with_body(login_page(CSRF))
        .expect(hits)
        .create_async()
        .await;

    let callback_url = format!("{}/callback?uid=u-1&state=s-1", server.url());
    let submit = server
        .mock("POST", "/users/sign_in")
        .match_query(client_query)
        .match_header("cookie", Matcher::Regex("_session=abc123".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("user[login_code]".into(), "user@example.com".into()),
            Matcher::UrlEncoded("user[password]".into(), "hunter2".into()),
            Matcher::UrlEncoded("authenticity_token".into(), CSRF.into()),
        ]))
        .with_status(302)
        .with_header("location", callback_url.as_str())
        .expect(hits)
        .create_async()
        .await;

    let callback = server
        .mock("GET", "/callback")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("uid".into(), "u-1".into()),
            Matcher::UrlEncoded("state".into(), "s-1".into()),
        ]))
        .with_status(200)
        .with_body("logged in")
        .expect(hits)
        .create_async()
        .await;

    let exchange = server
        .mock("POST", "/api_neauth")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("uid".into(), "u-1".into()),
            Matcher::UrlEncoded("state".into(), "s-1".into()),
            Matcher::UrlEncoded("client_id".into(), "cid".into()),
            Matcher::UrlEncoded("client_secret".into(), "csecret".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "result": "success",
                "access_token": tokens.access_token,
                "refresh_token": tokens.refresh_token,
            })
            .to_string(),
        )
        .expect(hits)
        .create_async()
        .await;

    LoginMocks {
        page,
        submit,
        callback,
        exchange,
    }
}
