//! The log of events that have already been announced by the daily job.
//!
//! Stored entries are decoded leniently. `eventDate` may be a plain date or a
//! feed timestamp, and ids may be numbers. Entries that still fail to decode
//! are kept verbatim and written back on the next save, so a save never drops
//! stored data.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::event::{parse_event_date, value_text, Event};

/// One announcement. Identified by (event_id, event_date) OR (event_name, event_date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedRecord {
    pub event_id: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub posted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
}

impl PostedRecord {
    pub fn for_event(event: &Event, posted_at: DateTime<Utc>, post_id: Option<String>) -> Self {
        Self {
            event_id: event.id.clone(),
            event_name: event.name.clone(),
            event_date: event.event_date,
            posted_at,
            post_id,
        }
    }

    /// Decodes a stored entry. `eventDate` goes through the feed's date parser,
    /// so timestamps resolve to their calendar date in `tz`. Older logs call
    /// the post id `tweetId`.
    pub fn from_stored(entry: &Map<String, Value>, tz: Tz) -> Option<Self> {
        let text = |key: &str| entry.get(key).and_then(value_text);

        let event_date = text("eventDate").and_then(|raw| parse_event_date(&raw, tz))?;
        let posted_at = text("postedAt")
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())?
            .with_timezone(&Utc);
        let event_id = text("eventId").unwrap_or_default();
        let event_name = text("eventName").unwrap_or_default();
        if event_id.is_empty() && event_name.is_empty() {
            return None;
        }

        Some(Self {
            event_id,
            event_name,
            event_date,
            posted_at,
            post_id: text("postId").or_else(|| text("tweetId")),
        })
    }
}

/// Persisted shape of the log.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedLogDocument {
    pub last_updated: DateTime<Utc>,
    pub posted_events: Vec<PostedRecord>,
    /// First day of the month of the last write.
    pub reset_date: NaiveDate,
    /// Stored entries that did not decode, written back unchanged.
    pub retained: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDocument {
    last_updated: Option<DateTime<Utc>>,
    posted_events: Vec<Value>,
    reset_date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoredEntry<'a> {
    Raw(&'a Value),
    Record(&'a PostedRecord),
}

impl Serialize for PostedLogDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<StoredEntry<'_>> = self
            .retained
            .iter()
            .map(StoredEntry::Raw)
            .chain(self.posted_events.iter().map(StoredEntry::Record))
            .collect();

        let mut state = serializer.serialize_struct("PostedLogDocument", 3)?;
        state.serialize_field("lastUpdated", &self.last_updated)?;
        state.serialize_field("postedEvents", &entries)?;
        state.serialize_field("resetDate", &self.reset_date)?;
        state.end()
    }
}

impl PostedLogDocument {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            posted_events: Vec::new(),
            reset_date: first_of_month(now),
            retained: Vec::new(),
        }
    }

    /// Parses a stored document. Entries that fail to decode are retained
    /// as-is instead of invalidating the whole log.
    pub fn from_json(text: &str, now: DateTime<Utc>, tz: Tz) -> Result<Self, serde_json::Error> {
        let raw: RawDocument = serde_json::from_str(text)?;

        let mut posted_events = Vec::with_capacity(raw.posted_events.len());
        let mut retained = Vec::new();
        for value in raw.posted_events {
            match value.as_object().and_then(|entry| PostedRecord::from_stored(entry, tz)) {
                Some(record) => posted_events.push(record),
                None => retained.push(value),
            }
        }

        if !retained.is_empty() {
            warn!(
                retained = retained.len(),
                "Posted log contains entries that could not be decoded; keeping them unchanged"
            );
        }

        let last_updated = raw.last_updated.unwrap_or(now);
        Ok(Self {
            last_updated,
            posted_events,
            reset_date: raw
                .reset_date
                .unwrap_or_else(|| first_of_month(last_updated)),
            retained,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Appends a record and stamps the document with `now`.
    pub fn push(&mut self, record: PostedRecord, now: DateTime<Utc>) {
        self.posted_events.push(record);
        self.touch(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
        self.reset_date = first_of_month(now);
    }
}

fn first_of_month(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive().with_day(1).unwrap_or_else(|| now.date_naive())
}
