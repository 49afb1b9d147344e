//! Fixed text fragments for generated posts and fallback mail.
//!
//! Labels are Japanese only; the calendar has no other audience.

// ────────────────────────────────────────────────────────────────────────────
// Weekly thread
// ────────────────────────────────────────────────────────────────────────────

pub const WEEKLY_HEADER: &str = "【今後1ヶ月のイベント】\n\n";

pub const DEFAULT_SITE_URL: &str = "https://apop-dance.netlify.app";

/// Link block closing the last post of a thread.
pub fn weekly_trailer(site_url: &str) -> String {
    format!("\n詳細👇\n{site_url}")
}

// ────────────────────────────────────────────────────────────────────────────
// Event lines
// ────────────────────────────────────────────────────────────────────────────

pub const LINE_MARKER: &str = "📍";

/// Indexed by `Weekday::num_days_from_sunday()`.
pub const WEEKDAYS: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

pub const ELLIPSIS: char = '…';

/// Administrative-division suffixes dropped from prefecture names in event lines.
pub const PREFECTURE_SUFFIXES: &[char] = &['都', '府', '県'];

// ────────────────────────────────────────────────────────────────────────────
// Single-event announcement
// ────────────────────────────────────────────────────────────────────────────

pub const ANNOUNCEMENT_TITLE: &str = "イベント紹介";
pub const MAIN_CONTENT_LABEL: &str = "メインコンテンツ";
pub const SUB_CONTENT_LABEL: &str = "サブコンテンツ";
pub const CALL_TO_ACTION: &str = "詳細はこちら👇";
pub const MISSING_URL: &str = "URL未登録";

// ────────────────────────────────────────────────────────────────────────────
// Mail fallback
// ────────────────────────────────────────────────────────────────────────────

pub const DAILY_FALLBACK_SUBJECT: &str = "[APOP] 個別イベント投稿に失敗しました";
pub const WEEKLY_FALLBACK_SUBJECT: &str = "[APOP] 週次イベント投稿に失敗しました";

/// Separator between post bodies in a fallback mail.
pub const MAIL_POST_SEPARATOR: &str = "\n\n---\n\n";
