pub mod event;
pub mod posted;

pub use event::{decode_events, Event, EventFeed};
pub use posted::{PostedLogDocument, PostedRecord};
