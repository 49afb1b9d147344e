use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::{
    DisabledMailer, EventSource, FilePostedLog, GistPostedLog, HttpEventFeed, HttpMailer,
    MailTransport, MemoryPostedLog, PostTransport, PostedLogStore, UnconfiguredTransport,
    XApiClient,
};
use crate::config::Config;

/// Collaborators shared by every job. Each seam is a trait object so tests can
/// swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub events: Arc<dyn EventSource>,
    pub posted_log: Arc<dyn PostedLogStore>,
    pub transport: Arc<dyn PostTransport>,
    pub mailer: Arc<dyn MailTransport>,
}

impl AppState {
    /// Wires the HTTP-backed collaborators described by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let events: Arc<dyn EventSource> = Arc::new(
            HttpEventFeed::new(config.events_api_url.clone(), config.timezone)
                .context("Failed to build event feed client")?,
        );

        let posted_log: Arc<dyn PostedLogStore> = match (&config.gist, &config.posted_log_path) {
            (Some(gist), _) => {
                info!(gist_id = %gist.gist_id, "Posted log backed by gist");
                Arc::new(
                    GistPostedLog::new(gist.gist_id.clone(), gist.token.clone(), config.timezone)
                        .context("Failed to build gist client")?,
                )
            }
            (None, Some(path)) => {
                info!(path = %path.display(), "Posted log backed by local file");
                Arc::new(FilePostedLog::new(path.clone(), config.timezone))
            }
            (None, None) => {
                warn!("No posted log configured; posts will not be remembered between runs");
                Arc::new(MemoryPostedLog::new())
            }
        };

        let transport: Arc<dyn PostTransport> = match &config.x_credentials {
            Some(credentials) => Arc::new(
                XApiClient::new(credentials.clone()).context("Failed to build X API client")?,
            ),
            None => Arc::new(UnconfiguredTransport),
        };

        let mailer: Arc<dyn MailTransport> = match &config.mail {
            Some(mail) => Arc::new(
                HttpMailer::new(
                    mail.api_url.clone(),
                    mail.api_key.clone(),
                    mail.from.clone(),
                    mail.to.clone(),
                )
                .context("Failed to build mail client")?,
            ),
            None => Arc::new(DisabledMailer),
        };

        Ok(AppState {
            config,
            events,
            posted_log,
            transport,
            mailer,
        })
    }
}
