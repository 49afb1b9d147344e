use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;

use crate::clients::mail::DEFAULT_MAIL_API_URL;
use crate::clients::OAuth1Credentials;
use crate::layout::templates::DEFAULT_SITE_URL;
use crate::layout::DEFAULT_POST_BUDGET;

pub const DEFAULT_EVENTS_API_URL: &str = "https://script.google.com/macros/s/AKfycbzfgpo0Yp6rgYVvaxdoDGh9BcD2LPV5g616VkN1kbBbhlYcOdn3TiPMFFhPG5UsIea8/exec";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;
const DEFAULT_THREAD_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct GistConfig {
    pub gist_id: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub to: String,
}

/// Runtime configuration loaded from environment variables.
/// Optional integrations stay `None` when their variables are unset.
#[derive(Debug, Clone)]
pub struct Config {
    pub events_api_url: String,
    pub site_url: String,
    pub post_budget: usize,
    pub timezone: Tz,
    pub dry_run: bool,
    pub thread_delay: Duration,
    pub x_credentials: Option<OAuth1Credentials>,
    pub gist: Option<GistConfig>,
    pub posted_log_path: Option<PathBuf>,
    pub mail: Option<MailConfig>,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            events_api_url: DEFAULT_EVENTS_API_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            post_budget: DEFAULT_POST_BUDGET,
            timezone: DEFAULT_TIMEZONE,
            dry_run: false,
            thread_delay: Duration::from_millis(DEFAULT_THREAD_DELAY_MS),
            x_credentials: None,
            gist: None,
            posted_log_path: None,
            mail: None,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let post_budget = match get("POST_BUDGET") {
            Some(raw) => parse_budget(&raw).context("POST_BUDGET must be a positive integer")?,
            None => defaults.post_budget,
        };

        let timezone = match get("POSTER_TIMEZONE") {
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .map_err(|e| anyhow!("POSTER_TIMEZONE '{raw}' is not a known time zone: {e}"))?,
            None => defaults.timezone,
        };

        let dry_run = match get("DRY_RUN") {
            Some(raw) => parse_flag(&raw).context("DRY_RUN must be true/false or 1/0")?,
            None => false,
        };

        let thread_delay = match get("THREAD_DELAY_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .context("THREAD_DELAY_MS must be a number of milliseconds")?,
            ),
            None => defaults.thread_delay,
        };

        let x_credentials = match (
            get("X_CLIENT_ID"),
            get("X_CLIENT_SECRET"),
            get("X_ACCESS_TOKEN"),
            get("X_ACCESS_TOKEN_SECRET"),
        ) {
            (
                Some(consumer_key),
                Some(consumer_secret),
                Some(access_token),
                Some(access_token_secret),
            ) => Some(OAuth1Credentials {
                consumer_key,
                consumer_secret,
                access_token,
                access_token_secret,
            }),
            (None, None, None, None) => None,
            _ => bail!(
                "X_CLIENT_ID, X_CLIENT_SECRET, X_ACCESS_TOKEN and X_ACCESS_TOKEN_SECRET \
                 must be set together"
            ),
        };

        let gist = match (get("GIST_ID"), get("GIST_TOKEN")) {
            (Some(gist_id), Some(token)) => Some(GistConfig { gist_id, token }),
            (None, None) => None,
            _ => bail!("GIST_ID and GIST_TOKEN must be set together"),
        };

        let mail = match (get("MAIL_API_KEY"), get("MAIL_FROM"), get("MAIL_TO")) {
            (Some(api_key), Some(from), Some(to)) => Some(MailConfig {
                api_url: get("MAIL_API_URL").unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
                api_key,
                from,
                to,
            }),
            (None, None, None) => None,
            _ => bail!("MAIL_API_KEY, MAIL_FROM and MAIL_TO must be set together"),
        };

        Ok(Config {
            events_api_url: get("EVENTS_API_URL").unwrap_or(defaults.events_api_url),
            site_url: get("SITE_URL").unwrap_or(defaults.site_url),
            post_budget,
            timezone,
            dry_run,
            thread_delay,
            x_credentials,
            gist,
            posted_log_path: get("POSTED_LOG_PATH").map(PathBuf::from),
            mail,
            rust_log: get("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}

fn parse_budget(raw: &str) -> Result<usize> {
    let budget = raw.trim().parse::<usize>()?;
    if budget == 0 {
        bail!("budget must be greater than zero");
    }
    Ok(budget)
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => bail!("unrecognized flag value '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.post_budget, 280);
        assert_eq!(config.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.site_url, "https://apop-dance.netlify.app");
        assert_eq!(config.thread_delay, Duration::from_secs(2));
        assert!(!config.dry_run);
        assert!(config.x_credentials.is_none());
        assert!(config.gist.is_none());
        assert!(config.mail.is_none());
    }

    #[test]
    fn test_reads_overrides() {
        let config = config_from(&[
            ("POST_BUDGET", "140"),
            ("POSTER_TIMEZONE", "Europe/Berlin"),
            ("DRY_RUN", "TRUE"),
            ("THREAD_DELAY_MS", "0"),
            ("X_CLIENT_ID", "ck"),
            ("X_CLIENT_SECRET", "cs"),
            ("X_ACCESS_TOKEN", "tok"),
            ("X_ACCESS_TOKEN_SECRET", "ts"),
            ("GIST_ID", "abc"),
            ("GIST_TOKEN", "ghp"),
            ("POSTED_LOG_PATH", "/tmp/posted.json"),
        ])
        .unwrap();
        assert_eq!(config.post_budget, 140);
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert!(config.dry_run);
        assert_eq!(config.thread_delay, Duration::ZERO);
        let credentials = config.x_credentials.unwrap();
        assert_eq!(credentials.consumer_key, "ck");
        assert_eq!(credentials.access_token_secret, "ts");
        assert_eq!(config.gist.unwrap().gist_id, "abc");
        assert_eq!(config.posted_log_path, Some(PathBuf::from("/tmp/posted.json")));
    }

    #[test]
    fn test_mail_requires_all_three() {
        let config = config_from(&[
            ("MAIL_API_KEY", "k"),
            ("MAIL_FROM", "bot@example.com"),
            ("MAIL_TO", "me@example.com"),
        ])
        .unwrap();
        let mail = config.mail.unwrap();
        assert_eq!(mail.api_url, DEFAULT_MAIL_API_URL);
        assert_eq!(mail.to, "me@example.com");

        assert!(config_from(&[("MAIL_API_KEY", "k")]).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config_from(&[("POST_BUDGET", "0")]).is_err());
        assert!(config_from(&[("POST_BUDGET", "lots")]).is_err());
        assert!(config_from(&[("POSTER_TIMEZONE", "Mars/Base")]).is_err());
        assert!(config_from(&[("DRY_RUN", "maybe")]).is_err());
        assert!(config_from(&[("GIST_ID", "abc")]).is_err());
        assert!(config_from(&[("X_ACCESS_TOKEN", "tok")]).is_err());
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("GIST_ID", "  "), ("DRY_RUN", "")]).unwrap();
        assert!(config.gist.is_none());
        assert!(!config.dry_run);
    }
}
