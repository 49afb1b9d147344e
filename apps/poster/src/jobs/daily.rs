//! Daily job: announce one upcoming event.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clients::x_api::post_url;
use crate::clients::{append_record, load_records_or_empty};
use crate::errors::AppError;
use crate::layout::templates::DAILY_FALLBACK_SUBJECT;
use crate::layout::{render_single_event_post_within, weighted_length};
use crate::models::PostedRecord;
use crate::selection::select_with_tier;
use crate::state::AppState;

use super::{mail_fallback, today_in, JobOutcome};

pub async fn run_daily(state: &AppState, now: DateTime<Utc>) -> Result<JobOutcome, AppError> {
    let config = &state.config;
    let today = today_in(config.timezone, now);
    info!(%today, dry_run = config.dry_run, "Daily job started");

    let events = state.events.fetch_events().await?;
    let posted = load_records_or_empty(state.posted_log.as_ref()).await;

    let Some(selection) = select_with_tier(&events, &posted, today) else {
        info!("Nothing to post today");
        return Ok(JobOutcome::NothingToPost);
    };
    let event = selection.event;

    let text = render_single_event_post_within(event, config.post_budget);
    let length = weighted_length(&text);
    info!(
        event_id = %event.id,
        tier = selection.tier.as_str(),
        length,
        budget = config.post_budget,
        "Post preview:\n{text}"
    );

    if length > config.post_budget {
        warn!(
            event_id = %event.id,
            length,
            budget = config.post_budget,
            "Post still over budget after truncation, skipping"
        );
        return Ok(JobOutcome::SkippedOverBudget {
            event_id: event.id.clone(),
            length,
            budget: config.post_budget,
        });
    }

    if config.dry_run {
        info!("Dry run, not posting");
        return Ok(JobOutcome::Preview { posts: vec![text] });
    }

    let post_id = match state.transport.create_post(&text, None).await {
        Ok(id) => id,
        Err(e) => {
            mail_fallback(state, DAILY_FALLBACK_SUBJECT, &e.to_string(), &[text]).await;
            return Err(e.into());
        }
    };
    info!(post_id = %post_id, event_id = %event.id, "Event announced");

    let record = PostedRecord::for_event(event, now, Some(post_id.clone()));
    if let Err(e) = append_record(state.posted_log.as_ref(), record, now).await {
        warn!("Post succeeded but the posted log was not updated: {e}");
    }

    Ok(JobOutcome::Posted {
        first_post_url: Some(post_url(&post_id)),
        post_ids: vec![post_id],
    })
}
