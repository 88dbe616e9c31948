//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`. It adds middleware
//! with exponential backoff retries for transient failures, a per-request
//! timeout, and standardized JSON response handling.
//!
//! Paths are joined onto the base URL, so a base with a path prefix
//! (`http://node/helipad/`) keeps that prefix for relative paths such as
//! `api/v1/boosts`.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Serialize, de::DeserializeOwned};

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction, such as status codes and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Tunables for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Upper bound for a single attempt. A timeout counts as transient.
    pub timeout: Duration,
    /// Retries on transient failures before giving up.
    pub max_retries: u32,
    /// Sent with every request.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            user_agent: concat!("boostwatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs,
/// authentication tokens, and automatic retries.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// Plain client sharing the same connection pool, for raw downloads.
    raw: reqwest::Client,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
    /// An optional Bearer token used for authorization.
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ApiClient` with default options.
    ///
    /// # Errors
    /// Fails if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, auth_token: Option<String>) -> anyhow::Result<Self> {
        Self::with_options(base_url, auth_token, ClientOptions::default())
    }

    /// Creates a new `ApiClient` with a retry policy and timeout.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL (e.g., "http://node.local:2112/").
    /// * `auth_token` - An optional string for the Authorization header.
    /// * `options` - Timeout, retry budget and user agent.
    pub fn with_options(
        base_url: &str,
        auth_token: Option<String>,
        options: ClientOptions,
    ) -> anyhow::Result<Self> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let raw = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
        let client = ClientBuilder::new(raw.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            raw,
            base_url: url,
            auth_token,
        })
    }

    /// The normalized base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The plain client without retry middleware.
    pub fn raw_client(&self) -> reqwest::Client {
        self.raw.clone()
    }

    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> anyhow::Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn builder(&self, method: Method, path: &str) -> anyhow::Result<RequestBuilder> {
        let mut req = self.inner.request(method, self.url(path)?);
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok(req)
    }

    /// Performs a generic HTTP request with an optional JSON body.
    ///
    /// # Errors
    /// Returns an `anyhow::Error` if URL joining, network execution, or
    /// decoding of a successful body fails. Non-2xx statuses are not errors;
    /// they come back with `success == false`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        headers: Option<HeaderMap>,
        body: Option<B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let mut req = self.builder(method, path)?;
        if let Some(h) = headers {
            req = req.headers(h);
        }
        if let Some(b) = body {
            let json_body = serde_json::to_string(&b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }
        Self::execute(req).await
    }

    /// `GET` with query parameters.
    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let req = self.builder(Method::GET, path)?.query(query);
        Self::execute(req).await
    }

    /// `POST` with a form-encoded body.
    pub async fn post_form<T, F>(&self, path: &str, form: &F) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let req = self.builder(Method::POST, path)?.form(form);
        Self::execute(req).await
    }

    async fn execute<T: DeserializeOwned>(req: RequestBuilder) -> anyhow::Result<ApiResponse<T>> {
        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_relative_base_url() {
        assert!(ApiClient::new("not a url", None).is_err());
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let client = ApiClient::new("http://node.local/helipad", None).unwrap();
        assert_eq!(client.base_url().as_str(), "http://node.local/helipad/");
        assert_eq!(
            client.url("api/v1/index").unwrap().as_str(),
            "http://node.local/helipad/api/v1/index"
        );
    }

    #[tokio::test]
    async fn get_json_sends_query_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/boosts"))
            .and(query_param("index", "5"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2])))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Some("s3cret".into())).unwrap();
        let resp: ApiResponse<Vec<u32>> = client
            .get_json("api/v1/boosts", &[("index", "5")])
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.data, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/reply"))
            .and(body_string_contains("sats=21"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), None).unwrap();
        let resp: ApiResponse<serde_json::Value> = client
            .post_form("api/v1/reply", &[("sats", "21")])
            .await
            .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.status, 403);
        assert_eq!(resp.error_body.as_deref(), Some("denied"));
    }
}
