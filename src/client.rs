//! HTTP client for the ANT REST API.
//!
//! The [`AntClient`] struct wraps [`reqwest::Client`] with the bearer token
//! header and provides a typed `get` helper. Endpoint methods are added to
//! `AntClient` via `impl` blocks in the [`crate::api`] module.

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::constants::API_BASE_URL;
use crate::error::{ApiErrorBody, FeedError, Result};
use crate::provider::TokenProvider;

/// HTTP client for the ANT REST API.
///
/// The `Authorization` header value is built once at construction time.
///
/// # Example
///
/// ```no_run
/// use ant_feed::client::AntClient;
/// use ant_feed::types::Exchange;
///
/// # #[tokio::main]
/// # async fn main() -> ant_feed::error::Result<()> {
/// let client = AntClient::new("your-access-token")?;
/// let contracts = client.get_master_contracts(Exchange::NSE).await?;
/// println!("{} segments", contracts.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AntClient {
    http: reqwest::Client,
    access_token: String,
    /// Base URL for REST requests (defaults to [`API_BASE_URL`]).
    base_url: String,
    auth_header: HeaderValue,
}

impl AntClient {
    /// Create a client against the default API base URL.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(access_token, API_BASE_URL)
    }

    /// Create a client pointing at a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .default_headers(Self::default_headers())
            .build()?;

        let access_token = access_token.into();
        let auth_header = Self::bearer(&access_token)?;

        Ok(Self {
            http,
            access_token,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth_header,
        })
    }

    /// Returns the current access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Replace the access token (e.g. after a fresh login).
    pub fn set_access_token(&mut self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        self.auth_header = Self::bearer(&token)?;
        self.access_token = token;
        Ok(())
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a GET request with query parameters and deserialize the JSON
    /// response.
    pub async fn get<R: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<R> {
        let url = self.url(path);
        tracing::debug!(%url, ?query, "GET");

        let resp = self
            .http
            .get(&url)
            .query(query)
            .header(header::AUTHORIZATION, self.auth_header.clone())
            .send()
            .await?;

        self.handle_response(resp).await
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn bearer(token: &str) -> Result<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            FeedError::InvalidArgument("access token contains invalid header characters".into())
        })
    }

    async fn handle_response<R: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<R> {
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(FeedError::Json)
        } else {
            let body = String::from_utf8_lossy(&bytes);
            Err(Self::parse_error_body(status, &body))
        }
    }

    /// Try to parse the API's JSON error structure; fall back to a raw HTTP
    /// status error.
    pub(crate) fn parse_error_body(status: reqwest::StatusCode, body: &str) -> FeedError {
        if let Ok(api_err) = serde_json::from_str::<ApiErrorBody>(body) {
            if api_err.message.is_some() {
                return FeedError::Api(api_err);
            }
        }
        FeedError::HttpStatus {
            status,
            body: body.to_owned(),
        }
    }
}

/// The client's own token, for setups where login happens elsewhere.
impl TokenProvider for AntClient {
    async fn current_token(&self) -> Result<String> {
        if self.access_token.is_empty() {
            return Err(FeedError::Auth("client has no access token".into()));
        }
        Ok(self.access_token.clone())
    }
}
