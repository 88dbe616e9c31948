//! # Retrieve
//!
//! HTTP access to the feed server: a retrying JSON client and the typed
//! endpoint wrappers built on it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Typed feed server endpoints.
pub mod feed_api;
/// Retrying HTTP client.
pub mod ky_http;

pub use feed_api::{AppInfo, FeedApi, FeedError, PageQuery, ReplyOutcome, ReplyRequest};
pub use ky_http::{ApiClient, ApiResponse, ClientOptions};
