//! Event listings as served by the calendar feed.
//!
//! The feed is a spreadsheet exported through a script endpoint, so every column
//! arrives loosely typed. `RawEvent` accepts anything; `decode_events` keeps only
//! records whose `eventDate` resolves to a calendar date.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A single dance-event listing. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    /// Canonical sort and filter key.
    pub event_date: NaiveDate,
    /// Display date exactly as entered in the sheet (e.g. "2025/3/8(土)").
    pub date: String,
    pub prefecture: String,
    pub venue: String,
    pub region: String,
    pub main_content: Option<String>,
    pub sub_content: Option<String>,
    /// Link to the organiser's announcement.
    pub twitter: Option<String>,
}

impl Event {
    /// Main and sub content joined by a space, used for keyword classification.
    pub fn combined_content(&self) -> String {
        format!(
            "{} {}",
            self.main_content.as_deref().unwrap_or(""),
            self.sub_content.as_deref().unwrap_or("")
        )
    }
}

/// Top-level feed payload.
#[derive(Debug, Default, Deserialize)]
pub struct EventFeed {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// Feed record before validation. Columns may be strings, numbers or null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    pub id: Value,
    pub name: Value,
    pub event_date: Value,
    pub date: Value,
    pub prefecture: Value,
    pub venue: Value,
    pub region: Value,
    pub main_content: Value,
    pub sub_content: Value,
    pub twitter: Value,
}

impl RawEvent {
    /// Converts to an `Event`, or `None` when `eventDate` is missing or unparseable.
    pub fn into_event(self, tz: Tz) -> Option<Event> {
        let event_date = value_text(&self.event_date).and_then(|raw| parse_event_date(&raw, tz))?;

        Some(Event {
            id: value_text(&self.id).unwrap_or_default(),
            name: value_text(&self.name).unwrap_or_default(),
            event_date,
            date: value_text(&self.date).unwrap_or_default(),
            prefecture: value_text(&self.prefecture).unwrap_or_default(),
            venue: value_text(&self.venue).unwrap_or_default(),
            region: value_text(&self.region).unwrap_or_default(),
            main_content: value_text(&self.main_content),
            sub_content: value_text(&self.sub_content),
            twitter: value_text(&self.twitter),
        })
    }
}

/// Validates a batch of raw records, dropping the ones without a usable date.
pub fn decode_events(raw: Vec<RawEvent>, tz: Tz) -> Vec<Event> {
    let total = raw.len();
    let events: Vec<Event> = raw
        .into_iter()
        .filter_map(|record| {
            let label = value_text(&record.name).unwrap_or_default();
            let event = record.into_event(tz);
            if event.is_none() {
                debug!(name = %label, "Dropping feed record without a valid eventDate");
            }
            event
        })
        .collect();

    if events.len() < total {
        debug!(
            kept = events.len(),
            dropped = total - events.len(),
            "Feed records filtered by eventDate"
        );
    }
    events
}

/// Parses `YYYY-MM-DD`, `YYYY/MM/DD`, or an RFC 3339 timestamp.
///
/// Timestamps are converted to `tz` before taking the calendar date: the sheet
/// exports midnight JST as the previous day in UTC.
pub fn parse_event_date(raw: &str, tz: Tz) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&tz).date_naive())
}

/// Stringifies a loosely typed column. Blank strings count as absent.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn sample_event(id: &str, name: &str, event_date: NaiveDate) -> Event {
    Event {
        id: id.to_string(),
        name: name.to_string(),
        event_date,
        date: event_date.format("%Y/%m/%d").to_string(),
        prefecture: "東京都".to_string(),
        venue: "渋谷スタジオ".to_string(),
        region: "関東".to_string(),
        main_content: None,
        sub_content: None,
        twitter: None,
    }
}
