//! Duplicate detection against the posted-event log.
//!
//! A record matches an event on (id, date) OR on (name, date). The name key keeps
//! matching after sheet edits renumber rows and change ids.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::{Event, PostedRecord};

#[derive(Debug, Clone, Default)]
pub struct PostedIndex {
    ids_by_date: HashMap<NaiveDate, HashSet<String>>,
    names_by_date: HashMap<NaiveDate, HashSet<String>>,
}

impl PostedIndex {
    pub fn new(records: &[PostedRecord]) -> Self {
        let mut index = Self::default();
        for record in records {
            index
                .ids_by_date
                .entry(record.event_date)
                .or_default()
                .insert(record.event_id.clone());
            index
                .names_by_date
                .entry(record.event_date)
                .or_default()
                .insert(record.event_name.clone());
        }
        index
    }

    /// True when either key of `event` appears in the log.
    pub fn contains(&self, event: &Event) -> bool {
        let id_hit = self
            .ids_by_date
            .get(&event.event_date)
            .is_some_and(|ids| ids.contains(event.id.as_str()));
        let name_hit = self
            .names_by_date
            .get(&event.event_date)
            .is_some_and(|names| names.contains(event.name.as_str()));
        id_hit || name_hit
    }
}
