use thiserror::Error;

use crate::clients::{FeedError, StoreError, TransportError};
use crate::layout::LayoutError;

/// Job-level error type. Each collaborator keeps its own error enum; jobs
/// return `Result<T, AppError>` and `main` reports it and exits non-zero.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Event feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Posted log error: {0}")]
    Store(#[from] StoreError),

    #[error("Posting failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Thread stopped after {succeeded} of {total} posts: {message}")]
    ThreadIncomplete {
        succeeded: usize,
        total: usize,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
