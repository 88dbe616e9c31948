//! # Feed API
//!
//! Typed access to the feed server endpoints on top of [`ApiClient`].
//!
//! ## Key Design Principles:
//! - **Typed Failures**: transport, decode and status failures come back as
//!   [`FeedError`] variants so the caller can tell a skipped tick from a hard
//!   authorization failure.
//! - **Authorization Is Final**: HTTP 403 always maps to
//!   [`FeedError::Unauthorized`]; the retry middleware never retries it and
//!   callers are expected to stop, not try again.
//! - **Raw Readings**: index and balance are returned as raw JSON values so
//!   non-numeric sentinels reach the session logic instead of failing here.

use std::collections::HashMap;

use reqwest_middleware::Error as MiddlewareError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::ky_http::{ApiClient, ApiResponse};
use crate::feed::BoostEvent;
use crate::numerology::{NumerologyMatcher, parse_rules};

/// Status the server answers with when the session is not logged in.
const STATUS_FORBIDDEN: u16 = 403;

/// Failures talking to the feed server.
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP 403: hard redirect to login, never retried.
    #[error("authorization denied")]
    Unauthorized,
    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// Connection, timeout, or other transport trouble.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The body did not have the expected shape.
    #[error("unexpected payload: {0}")]
    Decode(String),
    /// A URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl FeedError {
    /// Whether the next tick may simply try again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FeedError::Unauthorized | FeedError::InvalidUrl(_))
    }
}

impl From<anyhow::Error> for FeedError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<reqwest::Error>() {
            if e.is_decode() {
                return FeedError::Decode(e.to_string());
            }
        }
        if let Some(MiddlewareError::Reqwest(e)) = err.downcast_ref::<MiddlewareError>() {
            if e.is_decode() {
                return FeedError::Decode(e.to_string());
            }
        }
        if err.downcast_ref::<serde_json::Error>().is_some() {
            return FeedError::Decode(err.to_string());
        }
        if err.downcast_ref::<url::ParseError>().is_some() {
            return FeedError::InvalidUrl(err.to_string());
        }
        FeedError::Transport(format!("{:#}", err))
    }
}

/// Which page of a feed to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    /// Cursor index.
    pub index: u64,
    /// Maximum number of events.
    pub count: u32,
    /// Historical fetch: events at or below `index` instead of at or above.
    /// The server treats any `old` parameter as true, so it is only sent
    /// when set.
    #[serde(skip_serializing_if = "is_false")]
    pub old: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Metadata for one app in `/apps.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Icon name or URL.
    pub icon: String,
    /// App homepage.
    pub url: Option<String>,
}

/// Body of `POST /api/v1/reply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRequest {
    /// Event being replied to.
    pub index: u64,
    /// Amount to send.
    pub sats: u64,
    /// Name to send as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Reply text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyBody {
    success: bool,
    message: Option<String>,
    data: Option<BoostEvent>,
}

/// What the server said about a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    /// Whether the payment went through.
    pub success: bool,
    /// Server message, usually set on failure.
    pub message: Option<String>,
    /// Index of the event the reply was recorded against.
    pub reply_to_idx: Option<u64>,
}

/// # Feed API
///
/// One instance per server; the paths are relative to the client's base URL.
#[derive(Clone)]
pub struct FeedApi {
    client: ApiClient,
}

impl FeedApi {
    /// Wraps a configured client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Underlying HTTP client.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn unwrap_response<T>(resp: ApiResponse<T>) -> Result<T, FeedError> {
        if resp.status == STATUS_FORBIDDEN {
            return Err(FeedError::Unauthorized);
        }
        if !resp.success {
            return Err(FeedError::Http {
                status: resp.status,
                body: resp.error_body.unwrap_or_default(),
            });
        }
        resp.data
            .ok_or_else(|| FeedError::Decode("empty response body".to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FeedError> {
        let resp = self.client.get_json::<T, [(&str, &str)]>(path, &[]).await?;
        Self::unwrap_response(resp)
    }

    /// `GET <feed>?index=&count=&old=`
    pub async fn fetch_page(&self, path: &str, page: PageQuery) -> Result<Vec<BoostEvent>, FeedError> {
        debug!(path, index = page.index, count = page.count, old = page.old, "fetching page");
        let resp = self.client.get_json(path, &page).await?;
        Self::unwrap_response(resp)
    }

    /// `GET <index-endpoint>`, returned raw.
    pub async fn fetch_current_index(&self, path: &str) -> Result<Value, FeedError> {
        self.get(path).await
    }

    /// `GET /api/v1/balance`, returned raw.
    pub async fn fetch_balance(&self) -> Result<Value, FeedError> {
        self.get("api/v1/balance").await
    }

    /// `GET /apps.json`
    pub async fn fetch_apps(&self) -> Result<HashMap<String, AppInfo>, FeedError> {
        self.get("apps.json").await
    }

    /// `GET /numerology.json`, compiled into a matcher.
    pub async fn fetch_numerology(&self) -> Result<NumerologyMatcher, FeedError> {
        let raw: Value = self.get("numerology.json").await?;
        let rules = parse_rules(&raw.to_string()).map_err(|e| FeedError::Decode(e.to_string()))?;
        Ok(NumerologyMatcher::new(rules))
    }

    /// `POST /api/v1/reply`
    pub async fn send_reply(&self, request: &ReplyRequest) -> Result<ReplyOutcome, FeedError> {
        let resp = self.client.post_form("api/v1/reply", request).await?;
        let body: ReplyBody = Self::unwrap_response(resp)?;
        let reply_to_idx = body
            .data
            .as_ref()
            .and_then(|event| event.payment_info.as_ref())
            .and_then(|info| info.reply_to_idx);
        Ok(ReplyOutcome {
            success: body.success,
            message: body.message,
            reply_to_idx,
        })
    }
}
