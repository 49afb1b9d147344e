//! Daily event selection.
//!
//! Tiers run in order and the first non-empty one wins:
//! 1. unposted events in the next 7 days
//! 2. unposted events in the next 14 days
//! 3. the earliest event in the next 14 days, posted or not

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Event, PostedRecord};

use super::dedup::PostedIndex;
use super::window::within_days;

pub const PRIORITY_WINDOW_DAYS: i64 = 7;
pub const STANDARD_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    Priority,
    Standard,
    Repeat,
}

impl SelectionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionTier::Priority => "priority",
            SelectionTier::Standard => "standard",
            SelectionTier::Repeat => "repeat",
        }
    }
}

/// The chosen event and the tier that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub event: &'a Event,
    pub tier: SelectionTier,
    /// Number of eligible events in the winning tier.
    pub candidates: usize,
}

pub fn select_next<'a>(
    events: &'a [Event],
    posted: &[PostedRecord],
    today: NaiveDate,
) -> Option<&'a Event> {
    select_with_tier(events, posted, today).map(|selection| selection.event)
}

pub fn select_with_tier<'a>(
    events: &'a [Event],
    posted: &[PostedRecord],
    today: NaiveDate,
) -> Option<Selection<'a>> {
    let index = PostedIndex::new(posted);

    for (tier, days) in [
        (SelectionTier::Priority, PRIORITY_WINDOW_DAYS),
        (SelectionTier::Standard, STANDARD_WINDOW_DAYS),
    ] {
        let unposted: Vec<&Event> = within_days(events, today, days)
            .into_iter()
            .filter(|event| !index.contains(event))
            .collect();
        if let Some(&event) = unposted.first() {
            info!(
                tier = tier.as_str(),
                candidates = unposted.len(),
                event_id = %event.id,
                "Selected event"
            );
            return Some(Selection {
                event,
                tier,
                candidates: unposted.len(),
            });
        }
    }

    let upcoming = within_days(events, today, STANDARD_WINDOW_DAYS);
    match upcoming.first() {
        Some(&event) => {
            info!(
                tier = SelectionTier::Repeat.as_str(),
                candidates = upcoming.len(),
                event_id = %event.id,
                "Every upcoming event already posted, repeating the earliest"
            );
            Some(Selection {
                event,
                tier: SelectionTier::Repeat,
                candidates: upcoming.len(),
            })
        }
        None => {
            info!(%today, "No events in the next {} days", STANDARD_WINDOW_DAYS);
            None
        }
    }
}
