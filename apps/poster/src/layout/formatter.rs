//! Event rendering.
//!
//! - `render_line`: the one-line summary used by the weekly thread.
//! - `classify_event_type`: keyword classification for the announcement title.
//! - `render_single_event_post`: the daily announcement, shortened through an
//!   ordered table of truncation tiers until it fits the budget.

use std::sync::OnceLock;

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout::templates::{
    ANNOUNCEMENT_TITLE, CALL_TO_ACTION, ELLIPSIS, LINE_MARKER, MAIN_CONTENT_LABEL, MISSING_URL,
    PREFECTURE_SUFFIXES, SUB_CONTENT_LABEL, WEEKDAYS,
};
use crate::layout::weighted_length::{weighted_length, DEFAULT_POST_BUDGET};
use crate::models::Event;

// ────────────────────────────────────────────────────────────────────────────
// Event lines
// ────────────────────────────────────────────────────────────────────────────

/// Names longer than this many characters are shortened when shortening is on.
pub const SHORTEN_THRESHOLD: usize = 15;
/// Characters kept from a shortened name, before the ellipsis.
pub const SHORTEN_TO: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOptions {
    pub shorten_name: bool,
    pub shorten_threshold: usize,
    pub shorten_to: usize,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            shorten_name: false,
            shorten_threshold: SHORTEN_THRESHOLD,
            shorten_to: SHORTEN_TO,
        }
    }
}

impl LineOptions {
    /// Same thresholds with shortening switched on or off.
    pub fn with_shortening(self, shorten_name: bool) -> Self {
        Self {
            shorten_name,
            ..self
        }
    }
}

/// Renders `📍 {month}/{day}({weekday}) {prefecture} {name}\n`.
pub fn render_line(event: &Event, options: &LineOptions) -> String {
    let date = event.event_date;
    let weekday = WEEKDAYS[date.weekday().num_days_from_sunday() as usize];
    let name = if options.shorten_name {
        shorten_name(&event.name, options.shorten_threshold, options.shorten_to)
    } else {
        event.name.clone()
    };

    format!(
        "{LINE_MARKER} {}/{}({weekday}) {} {name}\n",
        date.month(),
        date.day(),
        prefecture_short(&event.prefecture)
    )
}

/// Drops a trailing 都/府/県. A bare suffix is left alone.
pub fn prefecture_short(prefecture: &str) -> &str {
    match prefecture.strip_suffix(PREFECTURE_SUFFIXES) {
        Some(short) if !short.is_empty() => short,
        _ => prefecture,
    }
}

/// First `keep` characters plus an ellipsis when `name` is longer than `threshold`.
pub fn shorten_name(name: &str, threshold: usize, keep: usize) -> String {
    if name.chars().count() <= threshold {
        return name.to_string();
    }
    let mut short: String = name.chars().take(keep).collect();
    short.push(ELLIPSIS);
    short
}

/// First `max_len - 1` characters plus an ellipsis when `text` is longer than `max_len`.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_len.saturating_sub(1)).collect();
    short.push(ELLIPSIS);
    short
}

// ────────────────────────────────────────────────────────────────────────────
// Event type
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Battle,
    Dj,
    Showcase,
    Unlabeled,
}

impl EventType {
    /// Title prefix; empty for unlabeled events.
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Battle => "バトル",
            EventType::Dj => "DJ",
            EventType::Showcase => "ショウケース",
            EventType::Unlabeled => "",
        }
    }
}

fn type_patterns() -> &'static [(EventType, Regex)] {
    static PATTERNS: OnceLock<Vec<(EventType, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (EventType::Battle, r"(?i)バトル|battle|solo|ソロ|crew|[1-5]on"),
            (EventType::Dj, r"(?i)dj|アニクラ|パーティー|クラブ"),
            (EventType::Showcase, r"(?i)ショウケース|ショーケース|showcase"),
        ]
        .into_iter()
        .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("event type pattern is valid")))
        .collect()
    })
}

/// Classifies by main + sub content. Groups are checked in order; first match wins.
pub fn classify_event_type(event: &Event) -> EventType {
    let combined = event.combined_content();
    type_patterns()
        .iter()
        .find(|(_, pattern)| pattern.is_match(&combined))
        .map(|(kind, _)| *kind)
        .unwrap_or(EventType::Unlabeled)
}

// ────────────────────────────────────────────────────────────────────────────
// Single-event announcement
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostField {
    SubContent,
    MainContent,
    Name,
}

/// Applied cumulatively, in order, until the announcement fits.
const TRUNCATION_TIERS: [(PostField, usize); 3] = [
    (PostField::SubContent, 20),
    (PostField::MainContent, 30),
    (PostField::Name, 20),
];

/// The variable parts of an announcement.
struct Announcement<'a> {
    event: &'a Event,
    event_type: EventType,
    name: String,
    main_content: Option<String>,
    sub_content: Option<String>,
}

impl<'a> Announcement<'a> {
    fn new(event: &'a Event) -> Self {
        Self {
            event,
            event_type: classify_event_type(event),
            name: event.name.clone(),
            main_content: event.main_content.clone(),
            sub_content: event.sub_content.clone(),
        }
    }

    fn field_mut(&mut self, field: PostField) -> Option<&mut String> {
        match field {
            PostField::SubContent => self.sub_content.as_mut(),
            PostField::MainContent => self.main_content.as_mut(),
            PostField::Name => Some(&mut self.name),
        }
    }

    fn compose(&self) -> String {
        let mut content_lines = Vec::new();
        if let Some(main) = &self.main_content {
            content_lines.push(format!("{MAIN_CONTENT_LABEL}: {main}"));
        }
        if let Some(sub) = &self.sub_content {
            content_lines.push(format!("{SUB_CONTENT_LABEL}: {sub}"));
        }
        let content_section = if content_lines.is_empty() {
            String::new()
        } else {
            format!("\n{}\n", content_lines.join("\n"))
        };

        let event = self.event;
        let url = event.twitter.as_deref().unwrap_or(MISSING_URL);
        let text = format!(
            "🎪 {}{ANNOUNCEMENT_TITLE}\n\n📅 {}\n📍 {}・{}\n🎵 {}{content_section}\n\
             {CALL_TO_ACTION}\n{url}",
            self.event_type.label(),
            event.date,
            event.prefecture,
            event.venue,
            self.name,
        );
        text.trim().to_string()
    }
}

/// Announcement for one event within the default budget.
pub fn render_single_event_post(event: &Event) -> String {
    render_single_event_post_within(event, DEFAULT_POST_BUDGET)
}

/// Announcement for one event within `budget`.
///
/// When even the last tier leaves the text over budget it is returned anyway;
/// callers check `weighted_length` and skip.
pub fn render_single_event_post_within(event: &Event, budget: usize) -> String {
    let mut announcement = Announcement::new(event);
    let mut text = announcement.compose();
    let mut length = weighted_length(&text);
    if length <= budget {
        return text;
    }

    debug!(length, budget, "Announcement over budget, applying truncation tiers");

    for (field, max_len) in TRUNCATION_TIERS {
        let Some(value) = announcement.field_mut(field) else {
            continue;
        };
        if value.chars().count() <= max_len {
            continue;
        }
        *value = truncate_text(value, max_len);

        text = announcement.compose();
        length = weighted_length(&text);
        if length <= budget {
            debug!(?field, length, budget, "Announcement fits after truncation");
            return text;
        }
    }

    warn!(
        length,
        budget,
        event = %event.name,
        "Announcement still over budget after every truncation tier"
    );
    text
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
