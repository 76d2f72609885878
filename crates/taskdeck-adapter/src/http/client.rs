/*
[INPUT]:  HTTP configuration (base URL, API key, timeouts) and the shared session holder
[OUTPUT]: Configured reqwest client ready for auth, rest and storage calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::auth::{Session, SessionHolder};
use crate::http::{BackendError, Result};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Renews an expired session before a data request goes out.
///
/// Returns the session to authorize with, or `None` when the session had to
/// be dropped.
#[async_trait]
pub(crate) trait SessionRefresher: fmt::Debug + Send + Sync {
    async fn refresh_expired(&self, client: &BackendClient, expired: Session) -> Option<Session>;
}

type RefresherSlot = Arc<RwLock<Option<Arc<dyn SessionRefresher>>>>;

/// Main HTTP client for the hosted backend.
///
/// Cloning is cheap; every clone shares the connection pool and the session
/// holder, so a sign-in through one clone authorizes requests made by all.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http_client: Client,
    base_url: Url,
    api_key: String,
    session: SessionHolder,
    refresher: RefresherSlot,
}

impl BackendClient {
    /// Create a new client with default configuration
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, api_key, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(
        base_url: &str,
        api_key: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BackendError::Config("API key must not be empty".to_string()));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
            api_key,
            session: SessionHolder::new(),
            refresher: RefresherSlot::default(),
        })
    }

    /// Base URL every endpoint is resolved against (always ends with `/`)
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Public API key sent with every request
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Session shared by every clone of this client
    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    /// Resolve an endpoint relative to the base URL.
    ///
    /// Endpoints are written without a leading slash so that a base URL with a
    /// path prefix keeps it.
    pub fn url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Build request builder carrying only the `apikey` header
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self.request_url(method, url))
    }

    pub(crate) fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.api_key)
    }

    /// Install the hook that renews expired sessions for every clone
    pub(crate) fn set_refresher(&self, refresher: Arc<dyn SessionRefresher>) {
        let mut slot = self.refresher.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(refresher);
    }

    /// Access token of the current session, renewed first when it has expired
    pub(crate) async fn fresh_access_token(&self) -> Option<String> {
        let session = self.session.get()?;
        if !session.is_expired() {
            return Some(session.access_token);
        }

        let refresher = self
            .refresher
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match refresher {
            Some(refresher) => refresher
                .refresh_expired(self, session)
                .await
                .map(|session| session.access_token),
            None => Some(session.access_token),
        }
    }

    /// Build request builder for data endpoints.
    ///
    /// The bearer is the session access token, or the API key when signed out.
    pub(crate) async fn authed_request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self.authed_request_url(method, url).await)
    }

    pub(crate) async fn authed_request_url(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .fresh_access_token()
            .await
            .unwrap_or_else(|| self.api_key.clone());
        self.request_url(method, url).bearer_auth(bearer)
    }

    /// Send a request and decode a JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.send_text(builder).await?;
        serde_json::from_str(&body).map_err(BackendError::from)
    }

    /// Send a request whose response body is not needed
    pub(crate) async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.send_text(builder).await.map(|_| ())
    }

    async fn send_text(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), path = %url, "backend request failed");
            return Err(BackendError::from_response(status, &body));
        }

        debug!(status = status.as_u16(), path = %url, bytes = body.len(), "backend request ok");
        Ok(body)
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(BackendError::Config("backend URL must not be empty".to_string()));
    }

    let mut url = Url::parse(trimmed)?;
    if url.cannot_be_a_base() {
        return Err(BackendError::Config(format!("backend URL cannot be a base: {trimmed}")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_keeps_path_prefix() {
        let client = BackendClient::new("http://localhost:54321/proxy", "anon").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:54321/proxy/");

        let url = client.url("/rest/v1/tasks?select=*&order=id.desc").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:54321/proxy/rest/v1/tasks?select=*&order=id.desc"
        );
    }

    #[test]
    fn test_rejects_empty_settings() {
        assert!(matches!(
            BackendClient::new("", "anon"),
            Err(BackendError::Config(_))
        ));
        assert!(matches!(
            BackendClient::new("https://project.supabase.co", "  "),
            Err(BackendError::Config(_))
        ));
        assert!(matches!(
            BackendClient::new("not a url", "anon"),
            Err(BackendError::UrlParse(_))
        ));
    }

    #[test]
    fn test_clones_share_session() {
        let client = BackendClient::new("https://project.supabase.co", "anon").unwrap();
        let clone = client.clone();
        assert!(clone.session().get().is_none());

        client.session().set(crate::auth::session::tests_support::session("a@b.c"));
        assert_eq!(clone.session().access_token().as_deref(), Some("access-a@b.c"));
    }
}
