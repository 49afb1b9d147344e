//! External collaborators: event feed, posted-event log, posting API, mail.

pub mod feed;
pub mod mail;
pub mod oauth1;
pub mod posted_log;
pub mod x_api;

pub use feed::{EventSource, FeedError, HttpEventFeed, StaticEventSource};
pub use oauth1::OAuth1Credentials;
pub use mail::{compose_fallback, DisabledMailer, HttpMailer, MailError, MailTransport};
pub use posted_log::{
    append_record, load_records_or_empty, reset, FilePostedLog, GistPostedLog, MemoryPostedLog,
    PostedLogStore, StoreError,
};
pub use x_api::{
    post_thread, PostTransport, ThreadOutcome, TransportError, UnconfiguredTransport, XApiClient,
};
