//! Choosing which events to announce.

pub mod dedup;
pub mod selector;
pub mod window;

pub use dedup::PostedIndex;
pub use selector::{select_next, select_with_tier, Selection, SelectionTier};
pub use window::{within_days, within_next_month};
