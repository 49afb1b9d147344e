//! Mail fallback. When posting fails, the unsent post bodies are mailed so
//! they can be published by hand.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::layout::templates::MAIL_POST_SEPARATOR;

pub const DEFAULT_MAIL_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const MAIL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Mail fallback is not configured (set MAIL_API_KEY, MAIL_FROM and MAIL_TO)")]
    NotConfigured,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Builds the fallback mail body: the failure reason followed by each post.
pub fn compose_fallback(reason: &str, posts: &[String]) -> String {
    let mut body = format!("投稿に失敗しました: {reason}\n以下の内容を手動で投稿してください。");
    for (i, post) in posts.iter().enumerate() {
        body.push_str(MAIL_POST_SEPARATOR);
        if posts.len() > 1 {
            body.push_str(&format!("({}/{})\n", i + 1, posts.len()));
        }
        body.push_str(post);
    }
    body
}

// SendGrid v3 message shape.

#[derive(Debug, Serialize)]
struct MailMessage<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
    to: String,
}

impl HttpMailer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, MailError> {
        Ok(Self {
            client: Client::builder().timeout(MAIL_TIMEOUT).build()?,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
            to: to.into(),
        })
    }

    fn message<'a>(&'a self, subject: &'a str, body: &'a str) -> MailMessage<'a> {
        MailMessage {
            personalizations: [Personalization {
                to: [Address { email: &self.to }],
            }],
            from: Address { email: &self.from },
            subject,
            content: [Content {
                content_type: "text/plain",
                value: body,
            }],
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.message(subject, body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        info!(to = %self.to, "Fallback mail sent");
        Ok(())
    }
}

/// Used when no mail relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMailer;

#[async_trait]
impl MailTransport for DisabledMailer {
    async fn send(&self, _subject: &str, _body: &str) -> Result<(), MailError> {
        Err(MailError::NotConfigured)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every message; fails when `fail` is set.
    #[derive(Default)]
    pub(crate) struct FakeMailer {
        pub(crate) sent: Mutex<Vec<(String, String)>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl MailTransport for FakeMailer {
        async fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Api {
                    status: 500,
                    message: "down".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_compose_single_post() {
        let body = compose_fallback("rate limited", &["hello".to_string()]);
        assert!(body.starts_with("投稿に失敗しました: rate limited"));
        assert!(body.ends_with("\n\n---\n\nhello"));
        assert!(!body.contains("(1/1)"));
    }

    #[test]
    fn test_compose_numbers_thread_posts() {
        let body = compose_fallback("x", &["a".to_string(), "b".to_string()]);
        assert!(body.contains("(1/2)\na"));
        assert!(body.contains("(2/2)\nb"));
    }

    #[test]
    fn test_message_shape() {
        let mailer = HttpMailer::new(
            DEFAULT_MAIL_API_URL,
            "key",
            "bot@example.com",
            "me@example.com",
        )
        .unwrap();
        let json = serde_json::to_value(mailer.message("subj", "body")).unwrap();
        assert_eq!(json["personalizations"][0]["to"][0]["email"], "me@example.com");
        assert_eq!(json["from"]["email"], "bot@example.com");
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][0]["value"], "body");
    }

    #[tokio::test]
    async fn test_disabled_mailer_reports_not_configured() {
        let err = DisabledMailer.send("s", "b").await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
