use reqwest::{cookie::Jar, redirect::Policy, Client, IntoUrl, StatusCode, Url};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::debug;

use crate::error::Result;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Accept self-signed and otherwise invalid certificates.
    pub accept_invalid_certs: bool,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Response body together with the URL reached after following redirects.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub url: Url,
    pub body: String,
}

/// HTTP client that keeps cookies across calls until [`Transport::reset_session`].
pub struct Transport {
    settings: TransportSettings,
    client: Client,
}

impl Transport {
    pub fn new(settings: TransportSettings) -> Result<Self> {
        let client = build_client(&settings)?;
        Ok(Self { settings, client })
    }

    /// Drops every cookie collected so far.
    pub fn reset_session(&mut self) -> Result<()> {
        self.client = build_client(&self.settings)?;
        debug!("cookie jar cleared");
        Ok(())
    }

    pub async fn get(&self, url: impl IntoUrl) -> Result<HttpResponse> {
        let res = self.client.get(url).send().await?;
        read_response(res).await
    }

    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        url: impl IntoUrl,
        form: &T,
    ) -> Result<HttpResponse> {
        let res = self.client.post(url).form(form).send().await?;
        read_response(res).await
    }
}

fn build_client(settings: &TransportSettings) -> Result<Client> {
    let client = Client::builder()
        .cookie_provider(Arc::new(Jar::default()))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.timeout)
        .user_agent(concat!("nebroker/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

async fn read_response(res: reqwest::Response) -> Result<HttpResponse> {
    let status = res.status();
    let url = res.url().clone();
    let body = res.text().await?;
    debug!(%status, %url, "received response");
    Ok(HttpResponse { status, url, body })
}
