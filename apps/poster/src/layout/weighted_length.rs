//! Weighted post length under the platform's counting rules.
//!
//! Code points in the narrow ranges weigh 1 and every other code point weighs 2.
//! A link occupies a fixed 23-unit slot no matter how long it is, because the
//! platform rewrites every URL to its shortener before counting.
//!
//! Emoji count once per visible glyph: presentation selectors, skin-tone
//! modifiers and zero-width-joined continuations add nothing.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// Budget of a single post on the default transport.
pub const DEFAULT_POST_BUDGET: usize = 280;

/// Fixed cost of one link, regardless of its length.
pub const URL_WEIGHT: usize = 23;

const NARROW_WEIGHT: usize = 1;
const WIDE_WEIGHT: usize = 2;

/// Inclusive code point ranges that weigh 1.
const NARROW_RANGES: [(u32, u32); 4] = [
    (0x0000, 0x10FF),
    (0x2000, 0x200D),
    (0x2010, 0x201F),
    (0x2032, 0x2037),
];

const ZERO_WIDTH_JOINER: char = '\u{200D}';

/// Punctuation that ends a sentence rather than a link.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', ';', '!', '?', ')', ']', '\'', '"'];

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    // Printable ASCII only, so a link never swallows adjacent Japanese text.
    URL.get_or_init(|| Regex::new(r"(?i)https?://[!-~]+").expect("URL pattern is valid"))
}

/// Byte ranges of every link in `text`, in order.
pub fn url_spans(text: &str) -> Vec<Range<usize>> {
    url_pattern()
        .find_iter(text)
        .filter_map(|m| {
            let matched = m.as_str();
            let trimmed = matched.trim_end_matches(TRAILING_PUNCTUATION);
            let scheme_len = matched.find("://").map(|i| i + 3).unwrap_or(0);
            (trimmed.len() > scheme_len).then(|| m.start()..m.start() + trimmed.len())
        })
        .collect()
}

/// Weighted length of `text`. Empty input weighs 0.
pub fn weighted_length(text: &str) -> usize {
    let mut total = 0;
    let mut cursor = 0;

    for span in url_spans(text) {
        total += run_weight(&text[cursor..span.start]);
        total += URL_WEIGHT;
        cursor = span.end;
    }

    total + run_weight(&text[cursor..])
}

/// True when `text` fits in `budget` weighted units.
pub fn fits_within(text: &str, budget: usize) -> bool {
    weighted_length(text) <= budget
}

fn run_weight(run: &str) -> usize {
    let mut total = 0;
    let mut chars = run.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ZERO_WIDTH_JOINER {
            // A joined emoji continues the glyph before it; anything else counts.
            if chars.peek().copied().is_some_and(is_emoji) {
                chars.next();
            }
            continue;
        }
        if is_emoji_modifier(c) {
            continue;
        }
        total += char_weight(c);
    }
    total
}

fn char_weight(c: char) -> usize {
    let code = c as u32;
    if NARROW_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&code))
    {
        NARROW_WEIGHT
    } else {
        WIDE_WEIGHT
    }
}

fn is_emoji(c: char) -> bool {
    matches!(
        c,
        '\u{2600}'..='\u{27BF}' | '\u{2B00}'..='\u{2BFF}' | '\u{1F000}'..='\u{1FAFF}'
    )
}

fn is_emoji_modifier(c: char) -> bool {
    matches!(c, '\u{FE0E}' | '\u{FE0F}' | '\u{1F3FB}'..='\u{1F3FF}')
}
