//! Activity events as stored and served.

pub mod describe;
pub mod model;

pub use describe::{describe, matches_description};
pub use model::{
    event_type_for_action, strip_event_suffix, Event, EventPayload, PullRequestPayload,
    PushPayload,
};
