//! Posting client for the X API v2, with thread support.
//!
//! Every call to create a post goes through `PostTransport`. `XApiClient`
//! retries rate limits and server errors with exponential backoff; other
//! failures surface immediately. `post_thread` chains replies and stops at
//! the first failure so a thread is never posted out of order.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::layout::weighted_length;

use super::oauth1::OAuth1Credentials;

const X_API_URL: &str = "https://api.x.com/2/tweets";
const STATUS_URL_PREFIX: &str = "https://twitter.com/i/web/status/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const MAX_RETRIES: u32 = 3;
const RATE_LIMIT_BASE_DELAY: Duration = Duration::from_secs(5);
const SERVER_ERROR_BASE_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_THREAD_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("X API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("X API response carried no post id")]
    MissingId,

    #[error("OAuth signing failed: {0}")]
    Signing(String),

    #[error(
        "Posting is not configured \
         (set X_CLIENT_ID, X_CLIENT_SECRET, X_ACCESS_TOKEN and X_ACCESS_TOKEN_SECRET)"
    )]
    NotConfigured,
}

impl TransportError {
    /// HTTP status behind the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Api { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait PostTransport: Send + Sync {
    /// Creates one post, optionally as a reply, and returns its id.
    async fn create_post(&self, text: &str, reply_to: Option<&str>)
        -> Result<String, TransportError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────────────

/// Wait before retry number `retry` (0-based) of a request that failed with
/// `status`, or `None` when the failure is final.
pub fn retry_delay(status: Option<u16>, retry: u32) -> Option<Duration> {
    if retry >= MAX_RETRIES {
        return None;
    }
    let base = match status? {
        429 => RATE_LIMIT_BASE_DELAY,
        500..=599 => SERVER_ERROR_BASE_DELAY,
        _ => return None,
    };
    Some(base * 2u32.pow(retry))
}

/// Runs `attempt` until it succeeds or `retry_delay` gives up.
pub async fn with_retries<F, Fut>(mut attempt: F) -> Result<String, TransportError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<String, TransportError>>,
{
    let mut retry = 0;
    loop {
        match attempt().await {
            Ok(id) => return Ok(id),
            Err(e) => match retry_delay(e.status(), retry) {
                Some(delay) => {
                    warn!(
                        "Post attempt {}/{} failed ({e}), retrying after {}ms...",
                        retry + 1,
                        MAX_RETRIES + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                None => return Err(e),
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// XApiClient
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplySettings<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplySettings<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    data: Option<CreatedPost>,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Debug, Deserialize)]
struct XApiProblem {
    detail: Option<String>,
    title: Option<String>,
}

/// Posts as the user who owns the access token, signing each request with
/// OAuth 1.0a.
#[derive(Clone)]
pub struct XApiClient {
    client: Client,
    credentials: OAuth1Credentials,
}

impl XApiClient {
    pub fn new(credentials: OAuth1Credentials) -> Result<Self, TransportError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            credentials,
        })
    }

    async fn send_once(
        &self,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, TransportError> {
        let body = CreatePostRequest {
            text,
            reply: reply_to.map(|id| ReplySettings {
                in_reply_to_tweet_id: id,
            }),
        };

        // Signed per attempt so every retry carries a fresh nonce.
        let authorization = self.credentials.authorization_header("POST", X_API_URL)?;
        let response = self
            .client
            .post(X_API_URL)
            .header(AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<XApiProblem>(&body)
                .ok()
                .and_then(|p| p.detail.or(p.title))
                .unwrap_or(body);
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatePostResponse = response.json().await?;
        created
            .data
            .map(|post| post.id)
            .ok_or(TransportError::MissingId)
    }
}

#[async_trait]
impl PostTransport for XApiClient {
    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, TransportError> {
        let id = with_retries(move || self.send_once(text, reply_to)).await?;
        debug!(post_id = %id, "Post created");
        Ok(id)
    }
}

/// Stand-in used when no credentials are configured. Every call fails, which
/// routes the job into its mail fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredTransport;

#[async_trait]
impl PostTransport for UnconfiguredTransport {
    async fn create_post(
        &self,
        _text: &str,
        _reply_to: Option<&str>,
    ) -> Result<String, TransportError> {
        Err(TransportError::NotConfigured)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Threads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub post_ids: Vec<String>,
    pub first_post_url: Option<String>,
    /// Message of the failure that stopped the thread.
    pub error: Option<String>,
}

impl ThreadOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

pub fn post_url(post_id: &str) -> String {
    format!("{STATUS_URL_PREFIX}{post_id}")
}

/// Posts `posts` in order, each replying to the previous one, waiting `delay`
/// between posts. Stops at the first failure.
pub async fn post_thread(
    transport: &dyn PostTransport,
    posts: &[String],
    delay: Duration,
) -> ThreadOutcome {
    let mut outcome = ThreadOutcome::default();
    if posts.is_empty() {
        warn!("Thread has no posts");
        return outcome;
    }

    info!(posts = posts.len(), "Posting thread");
    let mut previous: Option<String> = None;

    for (i, text) in posts.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        info!(
            "Post {}/{} (weighted length {})",
            i + 1,
            posts.len(),
            weighted_length(text)
        );

        match transport.create_post(text, previous.as_deref()).await {
            Ok(id) => {
                info!(post_id = %id, "Post {}/{} succeeded", i + 1, posts.len());
                if i == 0 {
                    outcome.first_post_url = Some(post_url(&id));
                }
                outcome.succeeded += 1;
                outcome.post_ids.push(id.clone());
                previous = Some(id);
            }
            Err(e) => {
                error!("Post {}/{} failed, stopping thread: {e}", i + 1, posts.len());
                outcome.failed += 1;
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }

    info!(
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        first_post_url = outcome.first_post_url.as_deref().unwrap_or("-"),
        "Thread finished"
    );
    outcome
}
