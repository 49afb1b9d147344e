//! Storage backends for the posted-event log.
//!
//! The daily job reads the log to skip events it has already announced and
//! appends one record after each successful post. Three backends share the
//! `PostedLogStore` trait: a GitHub gist, a local JSON file, and an in-memory
//! document for dry runs and tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::{PostedLogDocument, PostedRecord};

pub const GIST_FILE_NAME: &str = "apop-posted-events.json";
const GITHUB_API_URL: &str = "https://api.github.com";
const GIST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait PostedLogStore: Send + Sync {
    async fn load(&self) -> Result<PostedLogDocument, StoreError>;
    async fn save(&self, document: &PostedLogDocument) -> Result<(), StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers shared by the jobs
// ────────────────────────────────────────────────────────────────────────────

/// Records in the log, or none when it cannot be read.
pub async fn load_records_or_empty(store: &dyn PostedLogStore) -> Vec<PostedRecord> {
    match store.load().await {
        Ok(document) => {
            info!(records = document.posted_events.len(), "Loaded posted log");
            document.posted_events
        }
        Err(e) => {
            warn!("Posted log unavailable, treating it as empty: {e}");
            Vec::new()
        }
    }
}

/// Appends `record` and writes the log back.
///
/// A failed read is returned as an error rather than overwriting the stored
/// log with a single record.
pub async fn append_record(
    store: &dyn PostedLogStore,
    record: PostedRecord,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut document = store.load().await?;
    document.push(record, now);
    store.save(&document).await?;
    info!(records = document.posted_events.len(), "Posted log updated");
    Ok(())
}

/// Clears the log.
pub async fn reset(store: &dyn PostedLogStore, now: DateTime<Utc>) -> Result<(), StoreError> {
    store.save(&PostedLogDocument::empty(now)).await?;
    info!("Posted log reset");
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// GistPostedLog
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GistResponse {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct GistUpdate<'a> {
    files: HashMap<&'a str, GistFileUpdate<'a>>,
}

#[derive(Debug, Serialize)]
struct GistFileUpdate<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct GithubError {
    message: String,
}

/// Log stored as one file of a GitHub gist.
#[derive(Clone)]
pub struct GistPostedLog {
    client: Client,
    gist_id: String,
    token: String,
    tz: Tz,
}

impl GistPostedLog {
    /// `tz` resolves timestamped `eventDate` entries to calendar dates.
    pub fn new(
        gist_id: impl Into<String>,
        token: impl Into<String>,
        tz: Tz,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::builder()
                .timeout(GIST_TIMEOUT)
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()?,
            gist_id: gist_id.into(),
            token: token.into(),
            tz,
        })
    }

    fn gist_url(&self) -> String {
        format!("{GITHUB_API_URL}/gists/{}", self.gist_id)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GithubError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PostedLogStore for GistPostedLog {
    async fn load(&self) -> Result<PostedLogDocument, StoreError> {
        let response = self
            .client
            .get(self.gist_url())
            .bearer_auth(&self.token)
            .header("accept", "application/vnd.github+json")
            .send()
            .await?;
        let gist: GistResponse = Self::check(response).await?.json().await?;
        parse_gist(gist, Utc::now(), self.tz)
    }

    async fn save(&self, document: &PostedLogDocument) -> Result<(), StoreError> {
        let content = document.to_json_pretty()?;
        let body = GistUpdate {
            files: HashMap::from([(GIST_FILE_NAME, GistFileUpdate { content: &content })]),
        };
        let response = self
            .client
            .patch(self.gist_url())
            .bearer_auth(&self.token)
            .header("accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(gist_id = %self.gist_id, "Gist updated");
        Ok(())
    }
}

fn parse_gist(
    gist: GistResponse,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<PostedLogDocument, StoreError> {
    match gist.files.get(GIST_FILE_NAME).and_then(|f| f.content.as_deref()) {
        Some(content) => Ok(PostedLogDocument::from_json(content, now, tz)?),
        None => {
            warn!("Gist has no {GIST_FILE_NAME}, starting an empty log");
            Ok(PostedLogDocument::empty(now))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FilePostedLog
// ────────────────────────────────────────────────────────────────────────────

/// Log stored as a local JSON file. Writes go through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FilePostedLog {
    path: PathBuf,
    tz: Tz,
}

impl FilePostedLog {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        Self {
            path: path.into(),
            tz,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PostedLogStore for FilePostedLog {
    async fn load(&self) -> Result<PostedLogDocument, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(PostedLogDocument::from_json(&text, Utc::now(), self.tz)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No posted log file yet");
                Ok(PostedLogDocument::empty(Utc::now()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document: &PostedLogDocument) -> Result<(), StoreError> {
        let content = document.to_json_pretty()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }
}

fn write_atomically(path: &Path, content: &str) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryPostedLog
// ────────────────────────────────────────────────────────────────────────────

/// Log held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPostedLog {
    document: Mutex<Option<PostedLogDocument>>,
}

impl MemoryPostedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<PostedRecord>, now: DateTime<Utc>) -> Self {
        let mut document = PostedLogDocument::empty(now);
        document.posted_events = records;
        Self {
            document: Mutex::new(Some(document)),
        }
    }

    pub async fn snapshot(&self) -> Option<PostedLogDocument> {
        self.document.lock().await.clone()
    }
}

#[async_trait]
impl PostedLogStore for MemoryPostedLog {
    async fn load(&self) -> Result<PostedLogDocument, StoreError> {
        let guard = self.document.lock().await;
        Ok(guard
            .clone()
            .unwrap_or_else(|| PostedLogDocument::empty(Utc::now())))
    }

    async fn save(&self, document: &PostedLogDocument) -> Result<(), StoreError> {
        *self.document.lock().await = Some(document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::sample_event;
    use crate::selection::PostedIndex;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    fn tokyo() -> Tz {
        chrono_tz::Asia::Tokyo
    }

    fn record(id: &str) -> PostedRecord {
        let event = sample_event(id, "Cypher", NaiveDate::from_ymd_opt(2025, 3, 20).unwrap());
        PostedRecord::for_event(&event, now(), Some(format!("post-{id}")))
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePostedLog::new(dir.path().join("posted.json"), tokyo());
        let document = store.load().await.unwrap();
        assert!(document.posted_events.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_append_persists_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("posted.json");
        let store = FilePostedLog::new(&path, tokyo());

        append_record(&store, record("1"), now()).await.unwrap();
        append_record(&store, record("2"), now()).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"postedEvents\""));
        assert!(text.contains("\"resetDate\": \"2025-03-01\""));

        let records = load_records_or_empty(&store).await;
        let ids: Vec<&str> = records.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_file_store_reset_clears_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePostedLog::new(dir.path().join("posted.json"), tokyo());
        append_record(&store, record("1"), now()).await.unwrap();

        reset(&store, now()).await.unwrap();
        assert!(store.load().await.unwrap().posted_events.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_loads_as_empty_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FilePostedLog::new(&path, tokyo());

        assert!(store.load().await.is_err());
        assert!(load_records_or_empty(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_append_does_not_overwrite_unreadable_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FilePostedLog::new(&path, tokyo());

        assert!(append_record(&store, record("1"), now()).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[tokio::test]
    async fn test_append_keeps_entries_written_with_feed_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted.json");
        std::fs::write(
            &path,
            r#"{
                "lastUpdated": "2025-03-01T00:00:00.000Z",
                "postedEvents": [
                    {"eventId": 7, "eventName": "Cypher", "eventDate": "2025-03-07T15:00:00.000Z",
                     "postedAt": "2025-03-01T00:00:00.000Z", "tweetId": "1890"},
                    {"eventId": "8", "eventName": "Mystery", "eventDate": "TBD",
                     "postedAt": "2025-03-01T00:00:00.000Z"}
                ],
                "resetDate": "2025-03-01"
            }"#,
        )
        .unwrap();
        let store = FilePostedLog::new(&path, tokyo());

        let records = load_records_or_empty(&store).await;
        assert_eq!(records.len(), 1);
        let index = PostedIndex::new(&records);
        let march_8 = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        assert!(index.contains(&sample_event("7", "Cypher", march_8)));

        append_record(&store, record("1"), now()).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entries = written["postedEvents"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().any(|e| e["eventName"] == "Mystery" && e["eventDate"] == "TBD"));
        assert!(entries
            .iter()
            .any(|e| e["eventName"] == "Cypher" && e["eventDate"] == "2025-03-08"));

        let reloaded = load_records_or_empty(&store).await;
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryPostedLog::new();
        assert!(store.snapshot().await.is_none());
        append_record(&store, record("9"), now()).await.unwrap();
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.posted_events, vec![record("9")]);
        assert_eq!(snapshot.last_updated, now());
    }

    #[test]
    fn test_parse_gist_without_log_file_is_empty() {
        let gist: GistResponse =
            serde_json::from_str(r#"{"files": {"other.md": {"content": "hi"}}}"#).unwrap();
        let document = parse_gist(gist, now(), tokyo()).unwrap();
        assert!(document.posted_events.is_empty());
        assert_eq!(document.last_updated, now());
    }

    #[test]
    fn test_parse_gist_reads_log_file() {
        let content = serde_json::to_string(&serde_json::json!({
            "lastUpdated": "2025-03-02T00:00:00Z",
            "postedEvents": [{
                "eventId": "4", "eventName": "Jam", "eventDate": "2025-03-09",
                "postedAt": "2025-03-02T00:00:00Z"
            }],
            "resetDate": "2025-03-01"
        }))
        .unwrap();
        let body = serde_json::json!({ "files": { GIST_FILE_NAME: { "content": content } } });
        let gist: GistResponse = serde_json::from_value(body).unwrap();
        let document = parse_gist(gist, now(), tokyo()).unwrap();
        assert_eq!(document.posted_events.len(), 1);
        assert_eq!(document.posted_events[0].event_name, "Jam");
    }
}
