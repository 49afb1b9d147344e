//! Event feed client.

use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{decode_events, Event, EventFeed};

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned status {status}")]
    Status { status: u16 },

    #[error("Feed reported success = false")]
    Unsuccessful,
}

/// Source of upcoming events. Held by the job context as `Arc<dyn EventSource>`.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<Event>, FeedError>;
}

/// Reads the calendar's JSON endpoint.
#[derive(Clone)]
pub struct HttpEventFeed {
    client: Client,
    url: String,
    tz: Tz,
}

impl HttpEventFeed {
    pub fn new(url: impl Into<String>, tz: Tz) -> Result<Self, FeedError> {
        Ok(Self {
            client: Client::builder().timeout(FEED_TIMEOUT).build()?,
            url: url.into(),
            tz,
        })
    }
}

#[async_trait]
impl EventSource for HttpEventFeed {
    async fn fetch_events(&self) -> Result<Vec<Event>, FeedError> {
        debug!(url = %self.url, "Fetching event feed");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let feed: EventFeed = response.json().await?;
        into_events(feed, self.tz)
    }
}

/// Validates the envelope and decodes its records.
pub fn into_events(feed: EventFeed, tz: Tz) -> Result<Vec<Event>, FeedError> {
    if !feed.success {
        return Err(FeedError::Unsuccessful);
    }
    let received = feed.events.len();
    let events = decode_events(feed.events, tz);
    info!(received, usable = events.len(), "Fetched events");
    Ok(events)
}

/// Fixed event list, for previews and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEventSource {
    events: Vec<Event>,
}

impl StaticEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventSource for StaticEventSource {
    async fn fetch_events(&self) -> Result<Vec<Event>, FeedError> {
        Ok(self.events.clone())
    }
}
