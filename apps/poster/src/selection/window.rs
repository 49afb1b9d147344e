//! Date windows over the event list. `today` is always injected by the caller.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::Event;

/// Events dated in `[today, today + days)`, earliest first.
///
/// The sort is stable, so events sharing a date keep feed order.
pub fn within_days(events: &[Event], today: NaiveDate, days: i64) -> Vec<&Event> {
    let end = today + Duration::days(days);
    let mut selected: Vec<&Event> = events
        .iter()
        .filter(|event| event.event_date >= today && event.event_date < end)
        .collect();
    sort_by_date(&mut selected);
    selected
}

/// Events dated in `[today, today + 1 month]`, earliest first. The end is inclusive.
pub fn within_next_month(events: &[Event], today: NaiveDate) -> Vec<&Event> {
    let end = one_month_later(today);
    let mut selected: Vec<&Event> = events
        .iter()
        .filter(|event| event.event_date >= today && event.event_date <= end)
        .collect();
    sort_by_date(&mut selected);
    selected
}

/// Same day next month. A day the next month lacks overflows into the month
/// after it (Jan 31 → Mar 3), the way the site's calendar counts a month.
fn one_month_later(today: NaiveDate) -> NaiveDate {
    today
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|first| first.checked_add_signed(Duration::days(i64::from(today.day0()))))
        .unwrap_or(NaiveDate::MAX)
}

pub fn sort_by_date(events: &mut [&Event]) {
    events.sort_by_key(|event| event.event_date);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::sample_event;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids<'a>(selected: &[&'a Event]) -> Vec<&'a str> {
        selected.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_within_days_is_half_open() {
        let today = day(2025, 3, 1);
        let events = vec![
            sample_event("past", "past", day(2025, 2, 28)),
            sample_event("today", "today", today),
            sample_event("last", "last", day(2025, 3, 7)),
            sample_event("edge", "edge", day(2025, 3, 8)),
        ];
        assert_eq!(ids(&within_days(&events, today, 7)), vec!["today", "last"]);
    }

    #[test]
    fn test_within_days_sorts_stably() {
        let today = day(2025, 3, 1);
        let events = vec![
            sample_event("b", "b", day(2025, 3, 5)),
            sample_event("a1", "a1", day(2025, 3, 2)),
            sample_event("a2", "a2", day(2025, 3, 2)),
        ];
        assert_eq!(ids(&within_days(&events, today, 14)), vec!["a1", "a2", "b"]);
    }

    #[test]
    fn test_within_next_month_includes_end_date() {
        let today = day(2025, 3, 15);
        let events = vec![
            sample_event("end", "end", day(2025, 4, 15)),
            sample_event("after", "after", day(2025, 4, 16)),
            sample_event("start", "start", today),
        ];
        assert_eq!(ids(&within_next_month(&events, today)), vec!["start", "end"]);
    }

    #[test]
    fn test_within_next_month_overflows_short_months() {
        let today = day(2025, 1, 31);
        let events = vec![
            sample_event("feb28", "feb28", day(2025, 2, 28)),
            sample_event("mar3", "mar3", day(2025, 3, 3)),
            sample_event("mar4", "mar4", day(2025, 3, 4)),
        ];
        assert_eq!(ids(&within_next_month(&events, today)), vec!["feb28", "mar3"]);
    }

    #[test]
    fn test_one_month_later_rolls_missing_days_forward() {
        assert_eq!(one_month_later(day(2025, 3, 15)), day(2025, 4, 15));
        assert_eq!(one_month_later(day(2024, 1, 30)), day(2024, 3, 1));
        assert_eq!(one_month_later(day(2025, 12, 31)), day(2026, 1, 31));
    }
}
