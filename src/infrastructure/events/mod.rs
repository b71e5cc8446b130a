//! Events - 实时通知

mod publisher;

pub use publisher::{EventPublisher, WsEvent, DEFAULT_EVENT_BUFFER};
