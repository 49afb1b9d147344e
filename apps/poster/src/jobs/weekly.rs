//! Weekly job: a thread listing every event in the coming month.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::clients::post_thread;
use crate::errors::AppError;
use crate::layout::templates::{weekly_trailer, WEEKLY_FALLBACK_SUBJECT, WEEKLY_HEADER};
use crate::layout::{pack, weighted_length};
use crate::models::Event;
use crate::selection::within_next_month;
use crate::state::AppState;

use super::{mail_fallback, today_in, JobOutcome};

pub async fn run_weekly(state: &AppState, now: DateTime<Utc>) -> Result<JobOutcome, AppError> {
    let config = &state.config;
    let today = today_in(config.timezone, now);
    info!(%today, dry_run = config.dry_run, "Weekly job started");

    let all_events = state.events.fetch_events().await?;
    let events: Vec<Event> = within_next_month(&all_events, today)
        .into_iter()
        .cloned()
        .collect();
    info!(events = events.len(), "Events in the coming month");

    if events.is_empty() {
        return Ok(JobOutcome::NothingToPost);
    }

    let trailer = weekly_trailer(&config.site_url);
    let posts = pack(&events, WEEKLY_HEADER, &trailer, config.post_budget)?;
    for (i, post) in posts.iter().enumerate() {
        info!(
            "Post {}/{} (weighted length {}):\n{post}",
            i + 1,
            posts.len(),
            weighted_length(post)
        );
    }

    if config.dry_run {
        info!("Dry run, not posting");
        return Ok(JobOutcome::Preview { posts });
    }

    let outcome = post_thread(state.transport.as_ref(), &posts, config.thread_delay).await;
    if !outcome.is_complete() {
        let message = outcome
            .error
            .unwrap_or_else(|| "unknown failure".to_string());
        mail_fallback(
            state,
            WEEKLY_FALLBACK_SUBJECT,
            &message,
            &posts[outcome.succeeded..],
        )
        .await;
        return Err(AppError::ThreadIncomplete {
            succeeded: outcome.succeeded,
            total: posts.len(),
            message,
        });
    }

    Ok(JobOutcome::Posted {
        post_ids: outcome.post_ids,
        first_post_url: outcome.first_post_url,
    })
}
