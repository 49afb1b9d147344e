// Post layout: weighted length, event rendering, and thread packing.
// Pure functions only. No I/O, no clock, no environment.

pub mod formatter;
pub mod packer;
pub mod templates;
pub mod weighted_length;

// Re-export the API consumed by the jobs.
pub use formatter::{
    classify_event_type, render_line, render_single_event_post, render_single_event_post_within,
    EventType, LineOptions,
};
pub use packer::{pack, LayoutError, PostChunk, PostPacker};
pub use weighted_length::{fits_within, weighted_length, DEFAULT_POST_BUDGET, URL_WEIGHT};
