//! Scheduled jobs. Each job takes the shared `AppState` and the current
//! instant; "today" is derived from the configured time zone.

pub mod daily;
pub mod reset;
pub mod weekly;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{error, info};

use crate::clients::compose_fallback;
use crate::state::AppState;

pub use daily::run_daily;
pub use reset::run_reset;
pub use weekly::run_weekly;

/// What a posting job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// No eligible events.
    NothingToPost,
    /// The post stayed over budget after every truncation tier.
    SkippedOverBudget {
        event_id: String,
        length: usize,
        budget: usize,
    },
    /// Dry run: the posts that would have been published.
    Preview { posts: Vec<String> },
    Posted {
        post_ids: Vec<String>,
        first_post_url: Option<String>,
    },
}

/// Calendar date of `now` in `tz`.
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Mails `posts` for manual publishing. Failures are logged, never returned.
async fn mail_fallback(state: &AppState, subject: &str, reason: &str, posts: &[String]) {
    if posts.is_empty() {
        return;
    }
    let body = compose_fallback(reason, posts);
    match state.mailer.send(subject, &body).await {
        Ok(()) => info!(posts = posts.len(), "Unsent posts mailed for manual publishing"),
        Err(e) => error!("Mail fallback failed: {e}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::TimeZone;

    use crate::clients::mail::tests::FakeMailer;
    use crate::clients::x_api::tests::FakeTransport;
    use crate::clients::{MemoryPostedLog, StaticEventSource};
    use crate::config::Config;
    use crate::models::Event;

    /// State wired entirely to in-memory fakes, with no thread delay.
    pub(crate) struct Harness {
        pub(crate) state: AppState,
        pub(crate) transport: Arc<FakeTransport>,
        pub(crate) mailer: Arc<FakeMailer>,
        pub(crate) log: Arc<MemoryPostedLog>,
    }

    impl Harness {
        pub(crate) fn new(events: Vec<Event>) -> Self {
            Self::with_transport(events, FakeTransport::default())
        }

        pub(crate) fn with_transport(events: Vec<Event>, transport: FakeTransport) -> Self {
            let transport = Arc::new(transport);
            let mailer = Arc::new(FakeMailer::default());
            let log = Arc::new(MemoryPostedLog::new());
            let config = Config {
                thread_delay: Duration::ZERO,
                ..Config::default()
            };
            let state = AppState {
                config,
                events: Arc::new(StaticEventSource::new(events)),
                posted_log: log.clone(),
                transport: transport.clone(),
                mailer: mailer.clone(),
            };
            Self {
                state,
                transport,
                mailer,
                log,
            }
        }
    }

    /// 2025-03-01 09:00 in Tokyo.
    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_today_follows_configured_zone() {
        let late_evening_utc = Utc.with_ymd_and_hms(2025, 2, 28, 20, 0, 0).unwrap();
        assert_eq!(today_in(chrono_tz::Asia::Tokyo, late_evening_utc), today());
        assert_eq!(
            today_in(chrono_tz::UTC, late_evening_utc),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
    }

    #[tokio::test]
    async fn test_mail_fallback_skips_empty_post_list() {
        let harness = Harness::new(vec![]);
        mail_fallback(&harness.state, "subject", "reason", &[]).await;
        assert!(harness.mailer.sent.lock().unwrap().is_empty());
    }
}
