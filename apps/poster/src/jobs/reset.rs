//! Clears the posted-event log, typically at the start of a month.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::clients::reset;
use crate::errors::AppError;
use crate::state::AppState;

pub async fn run_reset(state: &AppState, now: DateTime<Utc>) -> Result<(), AppError> {
    if state.config.dry_run {
        info!("Dry run, posted log left untouched");
        return Ok(());
    }
    reset(state.posted_log.as_ref(), now).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::tests::{now, today, Harness};
    use crate::models::event::sample_event;
    use crate::models::PostedRecord;

    #[tokio::test]
    async fn test_reset_empties_the_log() {
        let harness = Harness::new(vec![]);
        let record = PostedRecord::for_event(&sample_event("1", "Jam", today()), now(), None);
        crate::clients::append_record(harness.state.posted_log.as_ref(), record, now())
            .await
            .unwrap();

        run_reset(&harness.state, now()).await.unwrap();

        let log = harness.log.snapshot().await.unwrap();
        assert!(log.posted_events.is_empty());
        assert_eq!(log.reset_date, today());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_log_alone() {
        let mut harness = Harness::new(vec![]);
        harness.state.config.dry_run = true;
        run_reset(&harness.state, now()).await.unwrap();
        assert!(harness.log.snapshot().await.is_none());
    }
}
