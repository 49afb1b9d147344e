//! Post packing. Splits an ordered event list into a thread of posts that each
//! fit the weighted-length budget.
//!
//! # Algorithm
//! 1. Fast path: everything in one post with header and trailer, names unshortened.
//! 2. Greedy forward fill. At each cursor, first try to close the thread with all
//!    remaining events plus the trailer (unshortened, then shortened). Otherwise
//!    grow a trailer-less chunk one event at a time, each size tried unshortened
//!    then shortened, until the next event no longer fits. A chunk that cannot
//!    hold even one event takes exactly one anyway, shortened, so the loop
//!    always advances.
//! 3. Trailer repair. If the fill ended on a trailer-less chunk, the final event
//!    moves into a new closing chunk with the trailer. When that is impossible
//!    (single-event chunk, or event plus trailer over budget) the trailer gets a
//!    post of its own.
//! 4. Each chunk renders as header (first only) + event lines + trailer (last only).
//!
//! Shortening is per chunk, never per event. The output is deterministic.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::layout::formatter::{render_line, LineOptions};
use crate::layout::weighted_length::weighted_length;
use crate::models::Event;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("post budget must be greater than zero")]
    InvalidBudget,
}

/// A contiguous slice `[start, end)` of the input destined for one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostChunk {
    pub start: usize,
    pub end: usize,
    pub include_header: bool,
    pub include_trailer: bool,
    pub shorten_names: bool,
}

impl PostChunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Packing inputs shared by every candidate chunk.
#[derive(Debug, Clone)]
pub struct PostPacker<'a> {
    events: &'a [Event],
    header: &'a str,
    trailer: &'a str,
    budget: usize,
    line_options: LineOptions,
}

impl<'a> PostPacker<'a> {
    pub fn new(
        events: &'a [Event],
        header: &'a str,
        trailer: &'a str,
        budget: usize,
    ) -> Result<Self, LayoutError> {
        if budget == 0 {
            return Err(LayoutError::InvalidBudget);
        }
        Ok(Self {
            events,
            header,
            trailer,
            budget,
            line_options: LineOptions::default(),
        })
    }

    /// Overrides the name-shortening thresholds used by shortened chunks.
    pub fn with_line_options(mut self, line_options: LineOptions) -> Self {
        self.line_options = line_options;
        self
    }

    /// Plans and renders the thread.
    pub fn pack(&self) -> Vec<String> {
        let chunks = self.plan();
        let posts: Vec<String> = chunks.iter().map(|chunk| self.render(chunk)).collect();

        for (chunk, post) in chunks.iter().zip(&posts) {
            let length = weighted_length(post);
            if length > self.budget {
                warn!(
                    start = chunk.start,
                    length,
                    budget = self.budget,
                    "Post exceeds budget: single event too long even when shortened"
                );
            }
        }
        posts
    }

    /// Renders one chunk into a post body.
    pub fn render(&self, chunk: &PostChunk) -> String {
        let options = self.line_options.with_shortening(chunk.shorten_names);
        let mut body = String::new();
        if chunk.include_header {
            body.push_str(self.header);
        }
        for event in &self.events[chunk.start..chunk.end] {
            body.push_str(&render_line(event, &options));
        }
        if chunk.include_trailer {
            body.push_str(self.trailer);
        }
        body
    }

    /// Splits the events into chunks. Empty input yields no chunks.
    pub fn plan(&self) -> Vec<PostChunk> {
        let total = self.events.len();
        if total == 0 {
            return Vec::new();
        }

        let whole = PostChunk {
            start: 0,
            end: total,
            include_header: true,
            include_trailer: true,
            shorten_names: false,
        };
        if self.fits(&whole) {
            debug!(events = total, "All events fit in a single post");
            return vec![whole];
        }

        let mut chunks: Vec<PostChunk> = Vec::new();
        let mut cursor = 0;
        while cursor < total {
            let include_header = chunks.is_empty();

            if let Some(closing) = self.fit_either(cursor, total, include_header, true) {
                chunks.push(closing);
                break;
            }

            let chunk = self.grow(cursor, include_header);
            cursor = chunk.end;
            chunks.push(chunk);
        }

        self.repair_trailer(&mut chunks);

        debug!(events = total, posts = chunks.len(), "Packed events into a thread");
        chunks
    }

    fn fits(&self, chunk: &PostChunk) -> bool {
        weighted_length(&self.render(chunk)) <= self.budget
    }

    /// `[start, end)` unshortened if it fits, else shortened if that fits.
    fn fit_either(
        &self,
        start: usize,
        end: usize,
        include_header: bool,
        include_trailer: bool,
    ) -> Option<PostChunk> {
        [false, true]
            .into_iter()
            .map(|shorten_names| PostChunk {
                start,
                end,
                include_header,
                include_trailer,
                shorten_names,
            })
            .find(|chunk| self.fits(chunk))
    }

    /// Largest trailer-less chunk starting at `start`; at least one event.
    fn grow(&self, start: usize, include_header: bool) -> PostChunk {
        let mut best = None;
        for end in start + 1..=self.events.len() {
            match self.fit_either(start, end, include_header, false) {
                Some(chunk) => best = Some(chunk),
                None => break,
            }
        }

        best.unwrap_or_else(|| {
            warn!(
                index = start,
                budget = self.budget,
                "Event does not fit in an empty post; forcing it in shortened"
            );
            PostChunk {
                start,
                end: start + 1,
                include_header,
                include_trailer: false,
                shorten_names: true,
            }
        })
    }

    fn repair_trailer(&self, chunks: &mut Vec<PostChunk>) {
        let Some(last) = chunks.last().copied() else {
            return;
        };
        if last.include_trailer {
            return;
        }

        let with_trailer = PostChunk {
            include_trailer: true,
            ..last
        };
        if self.fits(&with_trailer) {
            if let Some(slot) = chunks.last_mut() {
                *slot = with_trailer;
            }
            return;
        }

        // Shrinking below one event would leave an empty post behind.
        if last.len() > 1 {
            if let Some(closing) = self.fit_either(last.end - 1, last.end, false, true) {
                if let Some(shrunk) = chunks.last_mut() {
                    shrunk.end -= 1;
                }
                chunks.push(closing);
                return;
            }
        }

        debug!("Trailer placed in a post of its own");
        chunks.push(PostChunk {
            start: last.end,
            end: last.end,
            include_header: false,
            include_trailer: true,
            shorten_names: false,
        });
    }
}

/// Packs `events` into post bodies of at most `budget` weighted units each.
///
/// The only post allowed over budget is one holding a single event whose line
/// cannot fit even shortened; it is returned rather than dropped.
pub fn pack(
    events: &[Event],
    header: &str,
    trailer: &str,
    budget: usize,
) -> Result<Vec<String>, LayoutError> {
    Ok(PostPacker::new(events, header, trailer, budget)?.pack())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
